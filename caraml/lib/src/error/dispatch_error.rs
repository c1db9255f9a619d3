//! Errors from calling a resource as a function.

use thiserror::Error;

/// Errors raised when a resource is called to select a parametrized child.
///
/// Dispatch never guesses: every argument shape that does not select
/// exactly one child ends up here.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The resource has no parametrized children to dispatch to.
    #[error("Resource '{resource}' does not have any parametrized nested resources")]
    NotParametrized {
        /// Name of the called resource.
        resource: String,
    },

    /// No parametrized child declares exactly the supplied key set.
    #[error("Cannot call on '{resource}' with keys [{}]", join_keys(.keys))]
    NoMatchingKeys {
        /// Name of the called resource.
        resource: String,
        /// The sorted keys that were supplied.
        keys: Vec<String>,
    },

    /// A scalar argument was accepted by zero or several single-parameter children.
    #[error("Resource '{resource}' called with ambiguous parameter: {value} ({candidates} matching children)")]
    AmbiguousParameter {
        /// Name of the called resource.
        resource: String,
        /// The supplied scalar, rendered as JSON.
        value: String,
        /// How many children accepted the value.
        candidates: usize,
    },
}

impl DispatchError {
    /// Returns the name of the resource that was called.
    pub fn resource(&self) -> &str {
        match self {
            Self::NotParametrized { resource }
            | Self::NoMatchingKeys { resource, .. }
            | Self::AmbiguousParameter { resource, .. } => resource,
        }
    }
}

fn join_keys(keys: &[String]) -> String {
    keys.join(", ")
}
