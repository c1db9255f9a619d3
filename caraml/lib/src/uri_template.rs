//! RFC 6570 URI template expansion.
//!
//! Supports the level 3 operators (`+ # . / ; ? &`) plus the explode (`*`)
//! and prefix (`:n`) modifiers. Unbound and `null` variables expand to
//! nothing.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use thiserror::Error;

use crate::bindings::UriBindings;

/// Characters left alone by simple expansion.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters left alone by reserved (`+`, `#`) expansion.
const UNRESERVED_AND_RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Errors in URI template syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `{` has no matching `}`.
    #[error("unclosed expression starting at byte {position}")]
    Unclosed {
        /// Byte offset of the opening brace.
        position: usize,
    },

    /// A `}` appears outside an expression.
    #[error("unmatched '}}' at byte {position}")]
    Unmatched {
        /// Byte offset of the closing brace.
        position: usize,
    },

    /// An expression names no variable.
    #[error("empty expression at byte {position}")]
    EmptyExpression {
        /// Byte offset of the opening brace.
        position: usize,
    },

    /// A variable name or modifier is malformed.
    #[error("invalid variable '{name}'")]
    InvalidVariable {
        /// The variable spec as written.
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Simple,
    Reserved,
    Fragment,
    Label,
    Path,
    PathParam,
    Query,
    QueryContinuation,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Reserved),
            '#' => Some(Self::Fragment),
            '.' => Some(Self::Label),
            '/' => Some(Self::Path),
            ';' => Some(Self::PathParam),
            '?' => Some(Self::Query),
            '&' => Some(Self::QueryContinuation),
            _ => None,
        }
    }

    fn first(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query => "?",
            Self::QueryContinuation => "&",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query | Self::QueryContinuation => "&",
        }
    }

    fn named(self) -> bool {
        matches!(self, Self::PathParam | Self::Query | Self::QueryContinuation)
    }

    fn if_empty(self) -> &'static str {
        match self {
            Self::Query | Self::QueryContinuation => "=",
            _ => "",
        }
    }

    fn allow_reserved(self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSpec {
    name: String,
    explode: bool,
    prefix: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression {
        operator: Operator,
        variables: Vec<VarSpec>,
    },
}

/// A parsed URI template.
///
/// ## Examples
///
/// ```
/// use caraml_lib::{UriBindings, UriTemplate};
/// use serde_json::json;
///
/// let template = UriTemplate::parse("https://{region}.api.example.com/{version}/users/{id}").unwrap();
/// let bindings: UriBindings = [
///     ("region".to_string(), json!("se01")),
///     ("version".to_string(), json!("v1")),
///     ("id".to_string(), json!(5)),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(template.expand(&bindings), "https://se01.api.example.com/v1/users/5");
/// assert_eq!(template.variables(), vec!["region", "version", "id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    /// Parses a template.
    ///
    /// ## Errors
    ///
    /// Returns an error for unbalanced braces, empty expressions, or
    /// malformed variable specs.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = source.char_indices();

        while let Some((position, c)) = rest.next() {
            match c {
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, inner) in rest.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed { position });
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(parse_expression(&body, position)?);
                }
                '}' => return Err(TemplateError::Unmatched { position }),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            parts,
        })
    }

    /// Returns the template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Variable names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for part in &self.parts {
            if let Part::Expression { variables, .. } = part {
                for var in variables {
                    if !names.contains(&var.name.as_str()) {
                        names.push(&var.name);
                    }
                }
            }
        }
        names
    }

    /// Expands the template against `bindings`.
    pub fn expand(&self, bindings: &UriBindings) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expression {
                    operator,
                    variables,
                } => expand_expression(&mut out, *operator, variables, bindings),
            }
        }
        out
    }
}

impl FromStr for UriTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_expression(body: &str, position: usize) -> Result<Part, TemplateError> {
    let (operator, list) = match body.chars().next().and_then(Operator::from_char) {
        Some(op) => (op, &body[1..]),
        None => (Operator::Simple, body),
    };

    if list.trim().is_empty() {
        return Err(TemplateError::EmptyExpression { position });
    }

    let variables = list
        .split(',')
        .map(|spec| parse_varspec(spec.trim()))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Part::Expression {
        operator,
        variables,
    })
}

fn parse_varspec(spec: &str) -> Result<VarSpec, TemplateError> {
    let invalid = || TemplateError::InvalidVariable {
        name: spec.to_string(),
    };

    let (name, explode, prefix) = if let Some(name) = spec.strip_suffix('*') {
        (name, true, None)
    } else if let Some((name, len)) = spec.split_once(':') {
        let len = len.parse::<usize>().map_err(|_| invalid())?;
        (name, false, Some(len))
    } else {
        (spec, false, None)
    };

    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '%'));
    if !valid {
        return Err(invalid());
    }

    Ok(VarSpec {
        name: name.to_string(),
        explode,
        prefix,
    })
}

fn encode(s: &str, allow_reserved: bool) -> String {
    let set = if allow_reserved {
        UNRESERVED_AND_RESERVED
    } else {
        UNRESERVED
    };
    utf8_percent_encode(s, set).to_string()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn expand_expression(
    out: &mut String,
    operator: Operator,
    variables: &[VarSpec],
    bindings: &UriBindings,
) {
    let allow = operator.allow_reserved();
    let mut first = true;

    for var in variables {
        let Some(value) = bindings.get(&var.name) else {
            continue;
        };

        let expanded = match value {
            Value::Null => None,
            Value::Array(items) => expand_list(operator, var, items, allow),
            Value::Object(map) => expand_map(operator, var, map, allow),
            scalar => scalar_text(scalar).map(|text| {
                let text = match var.prefix {
                    Some(len) => text.chars().take(len).collect(),
                    None => text,
                };
                named_value(operator, &var.name, &encode(&text, allow))
            }),
        };

        let Some(expanded) = expanded else {
            continue;
        };

        out.push_str(if first {
            operator.first()
        } else {
            operator.separator()
        });
        first = false;
        out.push_str(&expanded);
    }
}

fn named_value(operator: Operator, name: &str, encoded: &str) -> String {
    if !operator.named() {
        return encoded.to_string();
    }
    if encoded.is_empty() {
        format!("{name}{}", operator.if_empty())
    } else {
        format!("{name}={encoded}")
    }
}

fn expand_list(operator: Operator, var: &VarSpec, items: &[Value], allow: bool) -> Option<String> {
    let encoded: Vec<String> = items
        .iter()
        .filter_map(scalar_text)
        .map(|text| encode(&text, allow))
        .collect();
    if encoded.is_empty() {
        return None;
    }

    if var.explode {
        let parts: Vec<String> = encoded
            .iter()
            .map(|item| named_value(operator, &var.name, item))
            .collect();
        Some(parts.join(operator.separator()))
    } else {
        Some(named_value(operator, &var.name, &encoded.join(",")))
    }
}

fn expand_map(
    operator: Operator,
    var: &VarSpec,
    map: &serde_json::Map<String, Value>,
    allow: bool,
) -> Option<String> {
    let pairs: Vec<(String, String)> = map
        .iter()
        .filter_map(|(k, v)| scalar_text(v).map(|text| (encode(k, allow), encode(&text, allow))))
        .collect();
    if pairs.is_empty() {
        return None;
    }

    if var.explode {
        let parts: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        Some(parts.join(operator.separator()))
    } else {
        let flat: Vec<String> = pairs.into_iter().flat_map(|(k, v)| [k, v]).collect();
        Some(named_value(operator, &var.name, &flat.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings(pairs: &[(&str, Value)]) -> UriBindings {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn expand(template: &str, pairs: &[(&str, Value)]) -> String {
        UriTemplate::parse(template)
            .unwrap()
            .expand(&bindings(pairs))
    }

    #[test]
    fn literal_only() {
        assert_eq!(expand("/users", &[]), "/users");
    }

    #[test]
    fn simple_substitution() {
        assert_eq!(expand("/users/{id}", &[("id", json!(42))]), "/users/42");
        assert_eq!(
            expand("/users/{username}", &[("username", json!("aladdin"))]),
            "/users/aladdin"
        );
    }

    #[test]
    fn unbound_variable_expands_to_nothing() {
        assert_eq!(expand("/users/{id}", &[]), "/users/");
        assert_eq!(expand("/users/{id}", &[("id", Value::Null)]), "/users/");
    }

    #[test]
    fn simple_expansion_encodes_reserved_characters() {
        assert_eq!(
            expand("/search/{term}", &[("term", json!("a b/c"))]),
            "/search/a%20b%2Fc"
        );
    }

    #[test]
    fn reserved_expansion_keeps_reserved_characters() {
        assert_eq!(
            expand("{+base}/users", &[("base", json!("https://x.io/v1"))]),
            "https://x.io/v1/users"
        );
    }

    #[test]
    fn multiple_variables_in_one_expression() {
        assert_eq!(
            expand("/map/{x,y}", &[("x", json!(1)), ("y", json!(2))]),
            "/map/1,2"
        );
    }

    #[test]
    fn query_operator() {
        assert_eq!(
            expand("/users{?page,limit}", &[("page", json!(2)), ("limit", json!(""))]),
            "/users?page=2&limit="
        );
        assert_eq!(expand("/users{?page}", &[]), "/users");
    }

    #[test]
    fn path_and_label_operators() {
        assert_eq!(expand("{/a,b}", &[("a", json!("x")), ("b", json!("y"))]), "/x/y");
        assert_eq!(expand("host{.tld}", &[("tld", json!("com"))]), "host.com");
    }

    #[test]
    fn lists_and_explode() {
        assert_eq!(expand("/tags/{tags}", &[("tags", json!(["a", "b"]))]), "/tags/a,b");
        assert_eq!(
            expand("/find{?tag*}", &[("tag", json!(["a", "b"]))]),
            "/find?tag=a&tag=b"
        );
    }

    #[test]
    fn prefix_modifier() {
        assert_eq!(expand("/{name:3}", &[("name", json!("aladdin"))]), "/ala");
    }

    #[test]
    fn variables_are_deduplicated() {
        let template = UriTemplate::parse("/users/{id}/messages/{id}").unwrap();
        assert_eq!(template.variables(), vec!["id"]);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            UriTemplate::parse("/users/{id"),
            Err(TemplateError::Unclosed { position: 7 })
        );
        assert_eq!(
            UriTemplate::parse("/users/id}"),
            Err(TemplateError::Unmatched { position: 9 })
        );
        assert_eq!(
            UriTemplate::parse("/users/{}"),
            Err(TemplateError::EmptyExpression { position: 7 })
        );
        assert!(matches!(
            UriTemplate::parse("/users/{a b}"),
            Err(TemplateError::InvalidVariable { .. })
        ));
    }

    #[test]
    fn display_round_trips_source() {
        let template: UriTemplate = "/users/{id}".parse().unwrap();
        assert_eq!(template.to_string(), "/users/{id}");
        assert_eq!(template.as_str(), "/users/{id}");
    }
}
