//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use caraml_lib::{
    ClientError, CompileConfig, CompiledApi, Compiler, HttpRequest, HttpResponse, Transport,
};
use serde_json::Value;

pub const AUTHORIZATION: &str = "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==";

pub fn fixture_path(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(file)
}

/// Records every request and answers with a fixed response.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    response: HttpResponse,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl RecordingTransport {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            response: HttpResponse::new(status, body),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        self.requests.lock().unwrap().push(request);
        Ok(self.response.clone())
    }
}

pub fn config() -> CompileConfig {
    CompileConfig::new(fixture_path("api.raml"))
        .base_uri_parameter("region", "se01")
        .default_header("Authorization", AUTHORIZATION)
}

/// Compiles the fixture API against `transport`.
pub fn compile_with(transport: RecordingTransport) -> CompiledApi {
    Compiler::new(config())
        .with_transport(transport)
        .compile()
        .unwrap()
}

pub fn compile() -> CompiledApi {
    compile_with(RecordingTransport::new(200, Value::Null))
}
