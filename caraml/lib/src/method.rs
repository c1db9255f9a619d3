//! HTTP verbs a RAML method can declare.

use strum::{Display, EnumIter, EnumString};

/// HTTP methods a RAML resource can declare.
///
/// Every verb parses from its lowercase RAML key and displays in uppercase.
/// Only the verbs for which [`RestMethod::aliases`] is non-empty can be
/// bound into a callable method.
///
/// ## Examples
///
/// ```rust
/// use caraml_lib::RestMethod;
///
/// let method: RestMethod = "patch".parse().unwrap();
/// assert_eq!(method, RestMethod::Patch);
/// assert_eq!(method.to_string(), "PATCH");
/// assert!(method.has_body());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RestMethod {
    /// HTTP GET - Retrieve a resource.
    Get,
    /// HTTP POST - Create a resource or trigger an action.
    Post,
    /// HTTP PUT - Replace a resource entirely.
    Put,
    /// HTTP PATCH - Partially update a resource.
    Patch,
    /// HTTP DELETE - Remove a resource.
    Delete,
    /// HTTP HEAD - Retrieve headers only.
    Head,
    /// HTTP OPTIONS - Query supported methods.
    Options,
}

impl RestMethod {
    /// Property names a bound method is installed under.
    ///
    /// Empty for verbs that cannot be bound.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Get => &["get", "find"],
            Self::Post => &["post", "create"],
            Self::Put => &["put", "update"],
            Self::Patch => &["patch"],
            Self::Delete => &["delete", "remove"],
            Self::Head => &["head"],
            Self::Options => &[],
        }
    }

    /// Returns `true` if a method with this verb can be bound.
    pub fn is_bindable(self) -> bool {
        !self.aliases().is_empty()
    }

    /// Returns `true` if this method carries a request body.
    ///
    /// POST, PUT, and PATCH take `(body, query, headers)`; every other
    /// bindable verb takes `(query, headers)`.
    pub fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Converts to the equivalent `reqwest::Method`.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl From<RestMethod> for reqwest::Method {
    fn from(method: RestMethod) -> Self {
        method.to_reqwest()
    }
}
