//! `reqwest`-backed transport with tracing instrumentation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{Span, instrument};
use url::Url;

use super::{HttpRequest, HttpResponse, Transport, flatten_query};
use crate::error::ClientError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Builder for configuring a [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
}

impl ReqwestTransportBuilder {
    fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the transport.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<ReqwestTransport, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ClientError::Request)?;
        Ok(ReqwestTransport { client })
    }
}

/// The default transport: one shared `reqwest::Client`.
///
/// ## Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use caraml_lib::ReqwestTransport;
///
/// let transport = ReqwestTransport::builder()
///     .timeout(Duration::from_secs(5))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a new builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Creates a transport with default settings.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, ClientError> {
        Self::builder().build()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(
        name = "api_request",
        skip(self, request),
        fields(
            http.method = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        Span::current().record("http.method", request.method.to_string().as_str());

        let url = Url::parse(&request.uri).map_err(|source| ClientError::InvalidUri {
            uri: request.uri.clone(),
            source,
        })?;
        Span::current().record("http.url", url.as_str());

        let mut builder = self
            .client
            .request(request.method.to_reqwest(), url)
            .headers(request.headers);

        let pairs = flatten_query(&request.query);
        if !pairs.is_empty() {
            builder = builder.query(&pairs);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ClientError::Request)?;
        let status = response.status();
        let status_code = status.as_u16();
        Span::current().record("http.status_code", status_code);

        let otel_status = if status.is_server_error() {
            "ERROR"
        } else if status.is_client_error() {
            "UNSET"
        } else {
            "OK"
        };
        Span::current().record("otel.status_code", otel_status);

        let text = response.text().await.map_err(ClientError::Request)?;
        Ok(HttpResponse::new(status_code, parse_body(&text)))
    }
}

/// JSON when it parses, the raw text otherwise, `null` when empty.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
