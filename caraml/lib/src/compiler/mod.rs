//! Compiles an [`ApiDocument`] into a navigable resource tree.
//!
//! The compiler runs once. It refuses documents that never advertise JSON,
//! and it refuses methods no binder exists for. It then builds one
//! [`Resource`] per top-level resource, recursively binding methods and
//! attaching nested children. Parametrized children are compiled on demand
//! by [`Resource::call`], each call producing a fresh resource that owns its
//! own frozen URI bindings.

mod binder;
mod resource;
mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, instrument};

pub use binder::{BoundMethod, MethodArgs};
pub use resource::{DispatchArgs, Member, Resource};
pub use types::TypeStub;

use crate::bindings::UriBindings;
use crate::config::CompileConfig;
use crate::document::{ApiDocument, ResourceDefinition};
use crate::error::{CaramlError, ConfigError};
use crate::naming::upper_camel_case;
use crate::transport::{ReqwestTransport, Transport};

/// Read-only state shared by every resource and method of one compilation.
#[derive(Debug)]
pub(crate) struct Context {
    pub default_headers: HeaderMap,
    pub override_prefix: String,
    pub transport: Arc<dyn Transport>,
}

/// The result of a compilation.
#[derive(Debug, Clone)]
pub struct CompiledApi {
    /// Top-level resources by lower-camel-case name.
    pub resources: BTreeMap<String, Resource>,
    /// Type stubs by upper-camel-case name.
    pub types: BTreeMap<String, TypeStub>,
}

impl CompiledApi {
    /// Looks up a top-level resource.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Looks up a type stub by its generated name.
    pub fn type_stub(&self, name: &str) -> Option<&TypeStub> {
        self.types.get(name)
    }
}

/// Compiles documents with one configuration and transport.
///
/// ## Examples
///
/// ```rust,ignore
/// use caraml_lib::{CompileConfig, Compiler};
///
/// let api = Compiler::new(CompileConfig::new("api.raml").base_uri_parameter("region", "se01"))
///     .compile()?;
/// let users = api.resource("users").unwrap();
/// let messages = users.call(5)?.resource("messages").unwrap().call(3)?;
/// println!("{}", messages.uri());
/// ```
#[derive(Debug)]
pub struct Compiler {
    config: CompileConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl Compiler {
    /// Creates a compiler using the default `reqwest` transport.
    pub fn new(config: CompileConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Replaces the transport bound methods send requests through.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Loads the configured document and compiles it.
    ///
    /// ## Errors
    ///
    /// Returns an error if no document path is configured, the document
    /// cannot be loaded, or compilation fails.
    pub fn compile(&self) -> Result<CompiledApi, CaramlError> {
        let path = self.config.require_api_path()?;
        let document = ApiDocument::load(path)?;
        self.compile_document(&document)
    }

    /// Compiles an already loaded document.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::NonJsonApi`] if the document never declares a
    /// JSON media type, [`ConfigError::UnsupportedMethod`] if any resource
    /// declares a verb without a binder, and [`ConfigError::InvalidHeader`]
    /// for malformed default headers.
    #[instrument(name = "compile", skip_all, fields(title = document.title.as_deref().unwrap_or("")))]
    pub fn compile_document(&self, document: &ApiDocument) -> Result<CompiledApi, CaramlError> {
        if !document.is_json() {
            return Err(ConfigError::NonJsonApi {
                media_types: document.media_types.clone(),
            }
            .into());
        }
        check_methods(&document.resources)?;

        let transport = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(ReqwestTransport::new()?),
        };
        let context = Arc::new(Context {
            default_headers: self.config.header_map()?,
            override_prefix: self.config.override_prefix.clone(),
            transport,
        });

        let bindings = self.base_bindings(document);
        let base_uri = document
            .base_uri
            .as_ref()
            .map(|template| template.expand(&bindings))
            .unwrap_or_default();
        let base_uri = base_uri.trim_end_matches('/');
        debug!(base_uri, "expanded base URI");

        let mut resources = BTreeMap::new();
        for definition in &document.resources {
            let resource = Resource::compile(
                Arc::clone(definition),
                base_uri,
                bindings.clone(),
                Arc::clone(&context),
            );
            resources.insert(resource.name().to_string(), resource);
        }

        let types = document
            .types
            .iter()
            .map(|definition| {
                let stub = TypeStub::new(upper_camel_case(&definition.name), definition.clone());
                (stub.name().to_string(), stub)
            })
            .collect::<BTreeMap<_, _>>();

        debug!(
            resources = resources.len(),
            types = types.len(),
            "compiled interface"
        );
        Ok(CompiledApi { resources, types })
    }

    /// Configured values, then the document version, then declared defaults.
    fn base_bindings(&self, document: &ApiDocument) -> UriBindings {
        let version = document
            .version
            .iter()
            .map(|v| ("version".to_string(), Value::String(v.clone())));
        let declared = document
            .base_uri_parameters
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)));

        UriBindings::from(self.config.base_uri_parameters.clone())
            .with_defaults(version)
            .with_defaults(declared)
    }
}

/// Compiles the document named by `config` with the default transport.
///
/// ## Errors
///
/// See [`Compiler::compile`].
pub fn compile(config: CompileConfig) -> Result<CompiledApi, CaramlError> {
    Compiler::new(config).compile()
}

/// Rejects the whole document if any resource declares an unbindable verb.
fn check_methods(resources: &[Arc<ResourceDefinition>]) -> Result<(), ConfigError> {
    for resource in resources {
        if let Some(method) = resource.methods.iter().find(|m| !m.verb.is_bindable()) {
            return Err(ConfigError::UnsupportedMethod {
                verb: method.verb,
                resource: resource.absolute_uri.clone(),
            });
        }
        check_methods(&resource.resources)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use serde_json::json;

    fn document(source: &str) -> ApiDocument {
        ApiDocument::parse(source, ".").unwrap()
    }

    fn compiler() -> Compiler {
        Compiler::new(CompileConfig::default())
    }

    #[test]
    fn rejects_non_json_documents() {
        let err = compiler()
            .compile_document(&document("mediaType: application/xml\n/a:\n  get:\n"))
            .unwrap_err();
        assert!(matches!(
            err,
            CaramlError::Config(ConfigError::NonJsonApi { ref media_types }) if media_types == &["application/xml"]
        ));
    }

    #[test]
    fn rejects_documents_without_media_type() {
        let err = compiler().compile_document(&document("/a:\n  get:\n")).unwrap_err();
        assert!(matches!(err, CaramlError::Config(ConfigError::NonJsonApi { .. })));
    }

    #[test]
    fn rejects_unsupported_methods_anywhere_in_the_tree() {
        let source = "mediaType: application/json\n/a:\n  /{id}:\n    options:\n";
        let err = compiler().compile_document(&document(source)).unwrap_err();
        assert!(matches!(
            err,
            CaramlError::Config(ConfigError::UnsupportedMethod { verb: crate::RestMethod::Options, .. })
        ));
    }

    #[test]
    fn base_binding_precedence() {
        let source = "\
mediaType: application/json
version: v1
baseUri: https://{region}.example.com/{version}/{tier}
baseUriParameters:
  region:
    default: eu01
  tier:
    default: free
/ping:
  get:
";
        let doc = document(source);
        let compiler = Compiler::new(
            CompileConfig::default()
                .base_uri_parameter("region", "se01")
                .base_uri_parameter("tier", json!("pro")),
        );
        let api = compiler.compile_document(&doc).unwrap();
        assert_eq!(
            api.resource("ping").unwrap().uri(),
            "https://se01.example.com/v1/pro/ping"
        );

        let api = Compiler::new(CompileConfig::default()).compile_document(&doc).unwrap();
        assert_eq!(
            api.resource("ping").unwrap().uri(),
            "https://eu01.example.com/v1/free/ping"
        );
    }

    #[test]
    fn trailing_slash_in_base_uri() {
        let source = "mediaType: application/json\nbaseUri: https://api.example.com/\n/ping:\n";
        let api = compiler().compile_document(&document(source)).unwrap();
        assert_eq!(api.resource("ping").unwrap().uri(), "https://api.example.com/ping");
    }

    #[test]
    fn type_stubs_are_upper_camel_case() {
        let source = "mediaType: application/json\ntypes:\n  url: string\n  poke:\n    properties:\n      at: datetime\n";
        let api = compiler().compile_document(&document(source)).unwrap();
        let names: Vec<&str> = api.types.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Poke", "Url"]);
        assert_eq!(api.type_stub("Url").unwrap().declared_name(), "url");
    }

    #[test]
    fn invalid_default_header_is_fatal() {
        let source = "mediaType: application/json\n/ping:\n";
        let err = Compiler::new(CompileConfig::default().default_header("bad header", "x"))
            .compile_document(&document(source))
            .unwrap_err();
        assert!(matches!(err, CaramlError::Config(ConfigError::InvalidHeader { .. })));
    }

    #[test]
    fn missing_api_path() {
        let err = compiler().compile().unwrap_err();
        assert!(matches!(err, CaramlError::Config(ConfigError::MissingField { .. })));
    }
}
