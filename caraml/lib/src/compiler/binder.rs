//! Bound methods: validation, header merging, and response handling.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::Context;
use crate::document::{MethodDefinition, QuerySchema};
use crate::error::{CaramlError, ClientError, ConfigError, ValidationError};
use crate::method::RestMethod;
use crate::schema::Violation;
use crate::transport::HttpRequest;

/// Arguments of one method invocation.
///
/// Bodyless verbs (GET, HEAD, DELETE) take query and headers only;
/// POST, PUT and PATCH also take a body. A `null` body counts as no body,
/// and the query is only checked against the declaration when one is given.
///
/// ## Examples
///
/// ```
/// use caraml_lib::MethodArgs;
/// use serde_json::json;
///
/// let args = MethodArgs::new()
///     .body(json!({ "text": "hello" }))
///     .query("notify", true)
///     .header("X-Request-Id", "42");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodArgs {
    body: Option<Value>,
    query: Option<Map<String, Value>>,
    headers: BTreeMap<String, String>,
}

impl MethodArgs {
    /// Creates empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Adds a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Replaces the query parameters.
    pub fn query_map(mut self, query: Map<String, Value>) -> Self {
        self.query = Some(query);
        self
    }

    /// Adds a header; it overrides any default header of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// One declared method bound to a resource's expanded URI.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    definition: Arc<MethodDefinition>,
    resource: String,
    uri: String,
    context: Arc<Context>,
}

impl BoundMethod {
    pub(crate) fn new(
        definition: Arc<MethodDefinition>,
        resource: &str,
        uri: &str,
        context: Arc<Context>,
    ) -> Self {
        Self {
            definition,
            resource: resource.to_string(),
            uri: uri.to_string(),
            context,
        }
    }

    /// The HTTP verb.
    pub fn verb(&self) -> RestMethod {
        self.definition.verb
    }

    /// The URI requests are sent to.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Name of the resource this method belongs to.
    pub fn resource_name(&self) -> &str {
        &self.resource
    }

    /// The method's declaration.
    pub fn definition(&self) -> &MethodDefinition {
        &self.definition
    }

    /// Validates `args`, sends the request, and interprets the response.
    ///
    /// Returns the raw response body on success.
    ///
    /// ## Errors
    ///
    /// - [`ValidationError`] if the body or query break the declared
    ///   schemas; nothing is sent.
    /// - [`ConfigError::InvalidHeader`] for a malformed call header.
    /// - [`ClientError::Http`] if the transport flags the response as an
    ///   error, carrying the status, the matching declared description and
    ///   the body.
    /// - Any other [`ClientError`] the transport raises.
    #[instrument(
        name = "bound_method",
        skip_all,
        fields(verb = %self.definition.verb, resource = %self.resource)
    )]
    pub async fn send(&self, args: MethodArgs) -> Result<Value, CaramlError> {
        let MethodArgs {
            body,
            query,
            headers,
        } = args;
        let body = body.filter(|body| !body.is_null());
        self.validate(query.as_ref(), body.as_ref())?;

        let request = HttpRequest {
            method: self.verb(),
            uri: self.uri.clone(),
            headers: self.merge_headers(&headers)?,
            query: query.unwrap_or_default(),
            body,
        };
        debug!(uri = %request.uri, "sending request");

        let response = self.context.transport.send(request).await?;
        let declared = self.definition.response(response.status);

        if response.error {
            return Err(ClientError::Http {
                status: response.status,
                description: declared.and_then(|r| r.description.clone()),
                body: response.body,
            }
            .into());
        }
        Ok(response.body)
    }

    /// Checks query and body against the declaration, collecting every
    /// violation before failing.
    fn validate(
        &self,
        query: Option<&Map<String, Value>>,
        body: Option<&Value>,
    ) -> Result<(), ValidationError> {
        let verb = self.verb();
        if body.is_some() && !verb.has_body() {
            return Err(ValidationError::BodyNotAllowed {
                verb,
                resource: self.resource.clone(),
            });
        }

        let query_violations = match (query, &self.definition.query) {
            (None, _) | (_, QuerySchema::Undeclared) => Vec::new(),
            (Some(query), QuerySchema::QueryString(schema)) => {
                schema.validate(&Value::Object(query.clone()))
            }
            (Some(query), QuerySchema::Parameters(parameters)) => query
                .iter()
                .flat_map(|(name, value)| match parameters.iter().find(|p| &p.name == name) {
                    Some(parameter) => parameter.validate(value),
                    None => vec![Violation::new(
                        name.as_str(),
                        format!("No query parameter with name '{name}'"),
                    )],
                })
                .collect(),
        };

        let body_violations = match (body, &self.definition.body) {
            (Some(body), Some(schema)) => schema.validate(body),
            _ => Vec::new(),
        };

        if query_violations.is_empty() && body_violations.is_empty() {
            return Ok(());
        }
        Err(ValidationError::Request {
            verb,
            resource: self.resource.clone(),
            query: query_violations,
            body: body_violations,
        })
    }

    /// Call headers over default headers over `Accept: application/json`.
    fn merge_headers(&self, call: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &self.context.default_headers {
            headers.insert(name.clone(), value.clone());
        }
        for (name, value) in call {
            let header_name = HeaderName::try_from(name.as_str())
                .map_err(|e| ConfigError::invalid_header(name, e))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|e| ConfigError::invalid_header(name, e))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}
