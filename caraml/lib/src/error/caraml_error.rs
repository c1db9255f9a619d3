//! Top-level error type.

use super::{ClientError, ConfigError, DispatchError, DocumentError, ValidationError};
use thiserror::Error;

/// Top-level error type for all caraml operations.
///
/// This enum aggregates every error category so callers can propagate a
/// single type with `?` while still matching on the specific failure.
///
/// ## Examples
///
/// ```rust,ignore
/// use caraml_lib::CaramlError;
///
/// fn report(err: CaramlError) {
///     match err {
///         CaramlError::Config(e) => eprintln!("refusing to compile: {e}"),
///         CaramlError::Document(e) => eprintln!("bad interface document: {e}"),
///         CaramlError::Dispatch(e) => eprintln!("bad resource call: {e}"),
///         CaramlError::Validation(e) => eprintln!("rejected before sending: {e}"),
///         CaramlError::Client(e) => eprintln!("request failed: {e}"),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum CaramlError {
    /// Fatal configuration errors raised while compiling.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The interface document could not be loaded or resolved.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A resource was called with arguments that select no single child.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Input rejected by a declared schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Transport failure or declared HTTP error response.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl CaramlError {
    /// Returns the HTTP status if this error came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Client(e) => e.status(),
            _ => None,
        }
    }
}
