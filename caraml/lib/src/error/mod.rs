//! Layered error types for the caraml compiler.
//!
//! The error hierarchy follows the phase in which a failure surfaces:
//! - [`CaramlError`] - Top-level error type returned by every public operation
//! - [`ConfigError`] - Compile-time configuration problems (fatal)
//! - [`DocumentError`] - Loading and resolving the interface document
//! - [`DispatchError`] - Calling a resource as a function with unusable arguments
//! - [`ValidationError`] - URI parameters, query, or body rejected by a declared schema
//! - [`ClientError`] - Transport failures and declared HTTP error responses

mod caraml_error;
mod client_error;
mod config_error;
mod dispatch_error;
mod document_error;
mod validation_error;

pub use caraml_error::CaramlError;
pub use client_error::ClientError;
pub use config_error::ConfigError;
pub use dispatch_error::DispatchError;
pub use document_error::DocumentError;
pub use validation_error::ValidationError;
