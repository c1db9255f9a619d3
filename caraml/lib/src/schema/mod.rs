//! Declared-type validation.
//!
//! RAML type declarations are parsed into [`TypeShape`] trees and kept in a
//! [`TypeRegistry`]. A [`Schema`] pairs one shape with the registry its
//! references resolve against and validates JSON values, reporting every
//! [`Violation`] it finds.

mod expr;
mod registry;
mod shape;
mod validate;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

pub use expr::parse_type_expression;
pub use registry::{TypeDefinition, TypeRegistry};
pub use shape::{
    ArrayShape, DateKind, NumberFacets, ObjectShape, Property, Scope, StringFacets, TypeShape,
};
pub(crate) use shape::yaml_to_json;

/// One way in which a value fails its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted location of the offending value (empty for the root).
    pub path: String,
    /// What is wrong with it.
    pub message: String,
}

impl Violation {
    /// Creates a violation at `path`.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A type shape bound to the registry its references resolve against.
///
/// Cloning is cheap; both halves are reference counted.
#[derive(Debug, Clone)]
pub struct Schema {
    shape: Arc<TypeShape>,
    registry: Arc<TypeRegistry>,
}

impl Schema {
    /// Binds `shape` to `registry`.
    pub fn new(shape: TypeShape, registry: Arc<TypeRegistry>) -> Self {
        Self {
            shape: Arc::new(shape),
            registry,
        }
    }

    /// A schema that accepts every value.
    pub fn any() -> Self {
        Self::new(TypeShape::Any, Arc::new(TypeRegistry::default()))
    }

    /// Returns the declared shape.
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Validates `value`, reporting violations relative to the root.
    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        self.validate_at(value, "")
    }

    /// Validates `value`, prefixing every violation path with `path`.
    pub fn validate_at(&self, value: &Value, path: &str) -> Vec<Violation> {
        validate::validate(&self.shape, &self.registry, value, path)
    }

    /// Returns `true` if `value` has no violations.
    pub fn accepts(&self, value: &Value) -> bool {
        self.validate(value).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn violation_display() {
        assert_eq!(Violation::new("id", "must be >= 1").to_string(), "id: must be >= 1");
        assert_eq!(Violation::new("", "expected string").to_string(), "expected string");
    }

    #[test]
    fn any_accepts_everything() {
        let schema = Schema::any();
        assert!(schema.accepts(&json!(null)));
        assert!(schema.accepts(&json!({ "a": [1, 2] })));
    }

    #[test]
    fn validate_at_prefixes_paths() {
        let schema = Schema::new(
            TypeShape::Number(NumberFacets::integer()),
            Arc::new(TypeRegistry::default()),
        );
        let violations = schema.validate_at(&json!("x"), "id");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "id");
    }
}
