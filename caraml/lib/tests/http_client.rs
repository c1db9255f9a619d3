//! End-to-end tests against a mock server through the default transport.

use caraml_lib::{ApiDocument, CaramlError, ClientError, CompileConfig, Compiler, MethodArgs};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCUMENT: &str = r#"
title: Mocked
mediaType: application/json
baseUri: "{+server}/api"
/users:
  get:
    queryParameters:
      tag?: string[]
  post:
    body:
      application/json:
        properties:
          name: string
  /{id}:
    uriParameters:
      id: integer
    get:
      responses:
        404:
          description: No such user
    /avatar:
      get:
"#;

fn compiler(server: &MockServer) -> Compiler {
    Compiler::new(
        CompileConfig::default()
            .base_uri_parameter("server", server.uri())
            .default_header("Authorization", "Bearer secret"),
    )
}

fn document() -> ApiDocument {
    ApiDocument::parse(DOCUMENT, ".").unwrap()
}

#[tokio::test]
async fn get_sends_query_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("tag", "admin"))
        .and(header("authorization", "Bearer secret"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = compiler(&mock_server).compile_document(&document()).unwrap();
    let users = api.resource("users").unwrap();
    let body = users
        .method("find")
        .unwrap()
        .send(MethodArgs::new().query("tag", json!(["admin"])))
        .await
        .unwrap();

    assert_eq!(body, json!([{ "id": 1 }]));
}

#[tokio::test]
async fn post_sends_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(body_json(json!({ "name": "aladdin" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = compiler(&mock_server).compile_document(&document()).unwrap();
    let created = api.resources["users"]
        .method("create")
        .unwrap()
        .send(MethodArgs::new().body(json!({ "name": "aladdin" })))
        .await
        .unwrap();

    assert_eq!(created, json!({ "id": 7 }));
}

#[tokio::test]
async fn error_status_maps_to_declared_description() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "gone" })))
        .mount(&mock_server)
        .await;

    let api = compiler(&mock_server).compile_document(&document()).unwrap();
    let err = api.resources["users"]
        .call(9)
        .unwrap()
        .method("get")
        .unwrap()
        .send(MethodArgs::new())
        .await
        .unwrap_err();

    match err {
        CaramlError::Client(ClientError::Http {
            status,
            description,
            body,
        }) => {
            assert_eq!(status, 404);
            assert_eq!(description.as_deref(), Some("No such user"));
            assert_eq!(body, json!({ "message": "gone" }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_json_payload_is_returned_as_text() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/3/avatar"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let api = compiler(&mock_server).compile_document(&document()).unwrap();
    let body = api.resources["users"]
        .call(3)
        .unwrap()
        .resource("avatar")
        .unwrap()
        .method("get")
        .unwrap()
        .send(MethodArgs::new())
        .await
        .unwrap();

    assert_eq!(body, json!("not json"));
}

#[tokio::test]
async fn server_errors_without_declaration() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let api = compiler(&mock_server).compile_document(&document()).unwrap();
    let err = api.resources["users"]
        .method("get")
        .unwrap()
        .send(MethodArgs::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "HTTP 503: undeclared response");
}
