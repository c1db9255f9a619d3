//! Interface document loading errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::uri_template::TemplateError;

/// Errors raised while loading and expanding an interface document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A document or included file could not be read.
    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        /// Path of the file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document or included file is not valid YAML.
    #[error("YAML parse error in '{}': {source}", .path.display())]
    Yaml {
        /// Path of the file (`<inline>` for in-memory sources).
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An included `.json` file is not valid JSON.
    #[error("JSON parse error in '{}': {source}", .path.display())]
    Json {
        /// Path of the file.
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A node does not have the shape RAML requires.
    #[error("Invalid document at '{context}': {message}")]
    InvalidStructure {
        /// Dotted location of the node.
        context: String,
        /// What was expected.
        message: String,
    },

    /// A type expression could not be parsed.
    #[error("Invalid type expression '{expression}': {message}")]
    InvalidTypeExpression {
        /// The expression as written.
        expression: String,
        /// Why it failed.
        message: String,
    },

    /// A type reference names no declared type.
    #[error("Unknown type '{name}' referenced from '{context}'")]
    UnknownType {
        /// The referenced name.
        name: String,
        /// Where the reference appears.
        context: String,
    },

    /// An `is:` entry names no declared trait.
    #[error("Unknown trait '{name}' applied to '{context}'")]
    UnknownTrait {
        /// The trait name.
        name: String,
        /// The resource or method it was applied to.
        context: String,
    },

    /// A `type:` entry names no declared resource type.
    #[error("Unknown resource type '{name}' applied to '{context}'")]
    UnknownResourceType {
        /// The resource type name.
        name: String,
        /// The resource it was applied to.
        context: String,
    },

    /// A URI template in the document is malformed.
    #[error("Invalid URI template '{uri}': {source}")]
    Template {
        /// The template as written.
        uri: String,
        #[source]
        source: TemplateError,
    },
}

impl DocumentError {
    /// Creates an invalid structure error.
    pub fn invalid(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            context: context.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_structure() {
        let err = DocumentError::invalid("/users.get.responses", "expected a mapping");
        assert_eq!(
            err.to_string(),
            "Invalid document at '/users.get.responses': expected a mapping"
        );
    }

    #[test]
    fn test_unknown_trait() {
        let err = DocumentError::UnknownTrait {
            name: "paged".to_string(),
            context: "/users".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown trait 'paged' applied to '/users'");
    }

    #[test]
    fn test_read_error_mentions_path() {
        let err = DocumentError::Read {
            path: PathBuf::from("api.raml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().starts_with("Failed to read 'api.raml'"));
    }
}
