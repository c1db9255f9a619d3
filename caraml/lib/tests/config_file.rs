mod common;

use std::fs;

use caraml_lib::{CaramlError, CompileConfig, ConfigError, DocumentError, compile};

#[test]
fn relative_api_path_resolves_against_config_file() {
    let config = CompileConfig::from_toml_file(common::fixture_path("caraml.toml")).unwrap();
    assert_eq!(config.api_path, Some(common::fixture_path("api.raml")));
    assert_eq!(config.override_prefix, "_");

    let api = compile(config).unwrap();
    let users = &api.resources["users"];
    assert_eq!(users.uri(), "https://us02.api.example.com/v1/users");

    let aladdin = users.call("aladdin").unwrap();
    assert!(aladdin.resource("_get").is_some());
}

#[test]
fn camel_case_keys_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("caraml.toml");
    let api = common::fixture_path("api.raml");
    fs::write(
        &path,
        format!(
            "apiPath = {:?}\n\n[baseUriParameters]\nregion = \"ap03\"\n",
            api.display().to_string()
        ),
    )
    .unwrap();

    let config = CompileConfig::from_toml_file(&path).unwrap();
    let api = compile(config).unwrap();
    assert_eq!(api.resources["users"].uri(), "https://ap03.api.example.com/v1/users");
}

#[test]
fn declared_default_applies_without_config() {
    let api = compile(CompileConfig::new(common::fixture_path("api.raml"))).unwrap();
    assert_eq!(api.resources["users"].uri(), "https://eu01.api.example.com/v1/users");
}

#[test]
fn malformed_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("caraml.toml");
    fs::write(&path, "api_path = [1, 2]\n").unwrap();

    let err = CompileConfig::from_toml_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ParseFile { .. }));
}

#[test]
fn missing_document() {
    let err = compile(CompileConfig::new(common::fixture_path("missing.raml"))).unwrap_err();
    assert!(matches!(err, CaramlError::Document(DocumentError::Read { .. })));
}

#[test]
fn non_json_document_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("xml.raml");
    fs::write(&path, "#%RAML 1.0\ntitle: Legacy\nmediaType: application/xml\n/things:\n  get:\n").unwrap();

    let err = compile(CompileConfig::new(&path)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Only supports JSON APIs (declared media types: application/xml)"
    );
}
