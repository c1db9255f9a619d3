//! Schema validation errors.

use thiserror::Error;

use crate::method::RestMethod;
use crate::schema::Violation;

/// Input rejected by a declared schema before any request is sent.
///
/// Every variant carries all violations found, never just the first one.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Values supplied when calling a resource failed their URI parameter schemas.
    #[error("Invalid parameters in call to '{resource}': {}", join(.violations))]
    UriParameters {
        /// Name of the called resource.
        resource: String,
        /// Every violated field.
        violations: Vec<Violation>,
    },

    /// Query and/or body failed the method's declared schemas.
    #[error("Invalid request in '{verb}' to '{resource}': {}", describe_request(.query, .body))]
    Request {
        /// The HTTP verb of the bound method.
        verb: RestMethod,
        /// Name of the resource the method is bound to.
        resource: String,
        /// Query violations (unknown keys included).
        query: Vec<Violation>,
        /// Body violations.
        body: Vec<Violation>,
    },

    /// A body was supplied to a verb that does not carry one.
    #[error("'{verb}' to '{resource}' does not accept a request body")]
    BodyNotAllowed {
        /// The HTTP verb of the bound method.
        verb: RestMethod,
        /// Name of the resource the method is bound to.
        resource: String,
    },
}

impl ValidationError {
    /// Returns every violation carried by this error.
    pub fn violations(&self) -> Vec<&Violation> {
        match self {
            Self::UriParameters { violations, .. } => violations.iter().collect(),
            Self::Request { query, body, .. } => query.iter().chain(body).collect(),
            Self::BodyNotAllowed { .. } => Vec::new(),
        }
    }
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_request(query: &[Violation], body: &[Violation]) -> String {
    match (query.is_empty(), body.is_empty()) {
        (false, true) => format!("query: {}", join(query)),
        (true, false) => format!("body: {}", join(body)),
        _ => format!("query: {}; body: {}", join(query), join(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(path: &str, message: &str) -> Violation {
        Violation::new(path, message)
    }

    #[test]
    fn test_uri_parameters_lists_every_violation() {
        let err = ValidationError::UriParameters {
            resource: "users".to_string(),
            violations: vec![
                violation("id", "expected integer, got string"),
                violation("page", "must be >= 1"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameters in call to 'users': id: expected integer, got string, page: must be >= 1"
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_request_with_query_only() {
        let err = ValidationError::Request {
            verb: RestMethod::Get,
            resource: "users".to_string(),
            query: vec![violation("query.sort", "unknown query parameter")],
            body: vec![],
        };
        assert_eq!(
            err.to_string(),
            "Invalid request in 'GET' to 'users': query: query.sort: unknown query parameter"
        );
    }

    #[test]
    fn test_request_with_query_and_body() {
        let err = ValidationError::Request {
            verb: RestMethod::Post,
            resource: "users".to_string(),
            query: vec![violation("query.page", "must be >= 1")],
            body: vec![violation("body.name", "required property is missing")],
        };
        let display = err.to_string();
        assert!(display.contains("query: query.page: must be >= 1"));
        assert!(display.contains("body: body.name: required property is missing"));
        assert_eq!(err.violations().len(), 2);
    }
}
