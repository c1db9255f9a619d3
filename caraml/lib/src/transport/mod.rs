//! The HTTP transport seam.
//!
//! Bound methods never talk to the network themselves: they build an
//! [`HttpRequest`] and hand it to a [`Transport`]. [`ReqwestTransport`] is
//! the default; tests and embedders can supply their own.

mod http;

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

pub use http::{ReqwestTransport, ReqwestTransportBuilder};

use crate::error::ClientError;
use crate::method::RestMethod;

/// A fully prepared request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP verb.
    pub method: RestMethod,
    /// Expanded absolute URI.
    pub uri: String,
    /// Merged request headers.
    pub headers: HeaderMap,
    /// Query parameters; arrays repeat the key, nulls are skipped.
    pub query: Map<String, Value>,
    /// JSON body for POST, PUT, and PATCH.
    pub body: Option<Value>,
}

/// A response as seen by the method binder.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body, a JSON string for non-JSON payloads, `null` if empty.
    pub body: Value,
    /// `true` if the transport considers the response a failure.
    pub error: bool,
}

impl HttpResponse {
    /// A response whose error flag follows the status class (4xx and 5xx).
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            error: status >= 400,
        }
    }
}

/// Issues requests on behalf of bound methods.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Sends `request` and returns the response, error-flagged or not.
    ///
    /// ## Errors
    ///
    /// Returns a [`ClientError`] only when no response was obtained.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Flattens a JSON query mapping into key/value pairs.
///
/// Arrays become repeated keys, `null` values (and `null` array items) are
/// skipped, strings are used verbatim and everything else uses its JSON
/// text.
pub fn flatten_query(query: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = query_text(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = query_text(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn query_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
