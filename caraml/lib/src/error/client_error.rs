//! HTTP transport errors.

use thiserror::Error;

/// Errors from the transport layer.
///
/// [`ClientError::Http`] is the structured error for responses the
/// transport flagged as failed; the other variants cover requests that
/// never produced a response.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed due to network or protocol error.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The expanded URI is not a valid absolute URL.
    #[error("Invalid request URI '{uri}': {source}")]
    InvalidUri {
        /// The expanded URI.
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// The server answered with an error status.
    #[error("HTTP {status}: {}", describe(.description))]
    Http {
        /// The HTTP status code returned.
        status: u16,
        /// Description of the matching declared response, if one was declared.
        description: Option<String>,
        /// The raw response body.
        body: serde_json::Value,
    },

    /// A transport implementation failed for a reason of its own.
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl ClientError {
    /// Returns the HTTP status code if this is an HTTP status error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns the response body carried by an HTTP status error.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

fn describe(description: &Option<String>) -> &str {
    description.as_deref().unwrap_or("undeclared response")
}
