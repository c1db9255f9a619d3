//! Compile-time configuration errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::method::RestMethod;

/// Errors in compiler configuration or in what the document asks the
/// compiler to support.
///
/// These are raised once, while compiling, and abort the whole compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document never advertises a JSON media type.
    #[error("Only supports JSON APIs (declared media types: {})", display_list(.media_types))]
    NonJsonApi {
        /// The media types the document does declare.
        media_types: Vec<String>,
    },

    /// A declared HTTP method has no binder.
    #[error("Unsupported method '{verb}' on '{resource}': only GET, HEAD, POST, PUT, PATCH and DELETE are supported")]
    UnsupportedMethod {
        /// The offending verb.
        verb: RestMethod,
        /// Absolute URI template of the resource declaring it.
        resource: String,
    },

    /// A configured or per-call header has an invalid name or value.
    #[error("Invalid header '{name}': {message}")]
    InvalidHeader {
        /// The header name as configured.
        name: String,
        /// What was wrong with it.
        message: String,
    },

    /// The config file could not be read.
    #[error("Failed to read config file '{}': {source}", .path.display())]
    ReadFile {
        /// Path of the config file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`CompileConfig`](crate::CompileConfig).
    #[error("Invalid config file '{}': {source}", .path.display())]
    ParseFile {
        /// Path of the config file.
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A required configuration field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: &'static str,
    },
}

impl ConfigError {
    /// Creates a missing field error.
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            message: message.to_string(),
        }
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
