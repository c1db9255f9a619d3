//! Accumulated URI parameter bindings.

use std::collections::BTreeMap;

use serde_json::Value;

/// Parameter name to bound value, threaded down the resource tree.
///
/// Bindings are immutable once a resource captures them: [`overlay`] and
/// [`with_defaults`] both return a fresh value, so a dispatch never alters
/// the bindings of its parent or siblings.
///
/// [`overlay`]: UriBindings::overlay
/// [`with_defaults`]: UriBindings::with_defaults
///
/// ## Examples
///
/// ```
/// use caraml_lib::UriBindings;
/// use serde_json::json;
///
/// let inherited: UriBindings = [("region".to_string(), json!("se01"))].into_iter().collect();
/// let child = inherited.overlay([("id".to_string(), json!(5))]);
///
/// assert_eq!(child.get("region"), Some(&json!("se01")));
/// assert_eq!(child.get("id"), Some(&json!(5)));
/// assert!(inherited.get("id").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UriBindings(BTreeMap<String, Value>);

impl UriBindings {
    /// Creates an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns `true` if `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns new bindings where `values` take precedence over `self`.
    pub fn overlay(&self, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut merged = self.0.clone();
        merged.extend(values);
        Self(merged)
    }

    /// Returns these bindings with `defaults` filled in where nothing is bound.
    pub fn with_defaults(mut self, defaults: impl IntoIterator<Item = (String, Value)>) -> Self {
        for (name, value) in defaults {
            self.0.entry(name).or_insert(value);
        }
        self
    }
}

impl FromIterator<(String, Value)> for UriBindings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for UriBindings {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
