//! RAML document loading.
//!
//! [`ApiDocument::load`] reads a RAML file and produces the expanded model:
//! includes inlined, libraries registered under their namespace, resource
//! types and traits merged into the resources and methods that use them.
//! Every type reference is checked before the model is returned.

mod expand;
mod include;
mod model;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value as Yaml};
use tracing::debug;

pub use model::{MethodDefinition, Parameter, QuerySchema, ResourceDefinition, ResponseSpec};

use crate::error::DocumentError;
use crate::method::RestMethod;
use crate::schema::{Schema, Scope, TypeDefinition, TypeRegistry, TypeShape, yaml_to_json};
use crate::uri_template::UriTemplate;
use expand::Templates;

/// A loaded interface document.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    /// `title:` text.
    pub title: Option<String>,
    /// `version:` as text.
    pub version: Option<String>,
    /// `baseUri:` template.
    pub base_uri: Option<UriTemplate>,
    /// Declared `baseUriParameters:`.
    pub base_uri_parameters: Vec<Parameter>,
    /// Declared default media types (`mediaType:`).
    pub media_types: Vec<String>,
    /// Every declared type, including library types.
    pub types: Arc<TypeRegistry>,
    /// Top-level resources in document order.
    pub resources: Vec<Arc<ResourceDefinition>>,
}

impl ApiDocument {
    /// Loads and expands the RAML document at `path`.
    ///
    /// ## Errors
    ///
    /// Returns a [`DocumentError`] if the file or any include cannot be read
    /// or the document is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading interface document");
        let root = include::load_yaml_file(path, 0)?;
        Self::from_value(root, &include::parent_dir(path))
    }

    /// Parses and expands a RAML document held in memory.
    ///
    /// Includes and libraries resolve relative to `base_dir`.
    ///
    /// ## Errors
    ///
    /// Returns a [`DocumentError`] if the source or any include is malformed.
    pub fn parse(source: &str, base_dir: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let base_dir = base_dir.as_ref();
        let root: Yaml = serde_yaml::from_str(source).map_err(|source| DocumentError::Yaml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        let root = include::resolve_includes(root, base_dir, 0)?;
        Self::from_value(root, base_dir)
    }

    /// Returns `true` if any declared media type is JSON.
    ///
    /// A document without a `mediaType:` declaration is not JSON.
    pub fn is_json(&self) -> bool {
        self.media_types.iter().any(|m| is_json_media_type(m))
    }

    fn from_value(root: Yaml, base_dir: &Path) -> Result<Self, DocumentError> {
        let root = match root {
            Yaml::Mapping(map) => map,
            _ => return Err(DocumentError::invalid("(root)", "the document root must be a mapping")),
        };

        let mut declarations = Declarations::default();
        declarations.collect(&root, None, base_dir, 0)?;
        let types = Arc::new(declarations.build_registry()?);

        let base_uri_text = string_field(&root, "baseUri").unwrap_or_default();
        let base_uri = if base_uri_text.is_empty() {
            None
        } else {
            Some(
                UriTemplate::parse(&base_uri_text).map_err(|source| DocumentError::Template {
                    uri: base_uri_text.clone(),
                    source,
                })?,
            )
        };

        let builder = Builder {
            templates: declarations.templates,
            types: Arc::clone(&types),
            base_uri: base_uri_text,
        };

        let base_uri_parameters = match root.get("baseUriParameters") {
            Some(declared) => builder.parameters(declared, true, "baseUriParameters")?,
            None => Vec::new(),
        };

        let mut resources = Vec::new();
        for (key, value) in &root {
            if let Some(relative_uri) = key.as_str().filter(|k| k.starts_with('/')) {
                resources.push(builder.resource(relative_uri, value, "")?);
            }
        }

        let document = Self {
            title: string_field(&root, "title"),
            version: scalar_field(&root, "version"),
            base_uri,
            base_uri_parameters,
            media_types: media_types(&root)?,
            types,
            resources,
        };
        debug!(
            resources = document.resources.len(),
            types = document.types.len(),
            "interface document loaded"
        );
        Ok(document)
    }
}

/// `application/json` or any `+json` structured syntax suffix.
pub(crate) fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn string_field(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(Yaml::as_str).map(str::to_string)
}

fn scalar_field(map: &Mapping, key: &str) -> Option<String> {
    match map.get(key)? {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn media_types(root: &Mapping) -> Result<Vec<String>, DocumentError> {
    match root.get("mediaType") {
        None | Some(Yaml::Null) => Ok(Vec::new()),
        Some(Yaml::String(single)) => Ok(vec![single.clone()]),
        Some(Yaml::Sequence(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| DocumentError::invalid("mediaType", "media types must be strings"))
            })
            .collect(),
        Some(_) => Err(DocumentError::invalid(
            "mediaType",
            "expected a media type or a list of media types",
        )),
    }
}

/// A type declaration waiting to be resolved.
struct TypeSource {
    name: String,
    declaration: Yaml,
    namespace: Option<String>,
    siblings: Arc<BTreeSet<String>>,
}

#[derive(Default)]
struct Declarations {
    types: Vec<TypeSource>,
    templates: Templates,
}

impl Declarations {
    /// Gathers types, traits, and resource types from `map` and its `uses:`.
    fn collect(
        &mut self,
        map: &Mapping,
        namespace: Option<&str>,
        base_dir: &Path,
        depth: usize,
    ) -> Result<(), DocumentError> {
        if depth > 8 {
            return Err(DocumentError::invalid("uses", "libraries are nested too deeply"));
        }

        if let Some(uses) = map.get("uses") {
            let Yaml::Mapping(uses) = uses else {
                return Err(DocumentError::invalid("uses", "expected a mapping of namespaces"));
            };
            for (alias, target) in uses {
                let (Some(alias), Some(target)) = (alias.as_str(), target.as_str()) else {
                    return Err(DocumentError::invalid("uses", "each library needs a name and a path"));
                };
                let qualified = qualify(namespace, alias);
                let path = base_dir.join(target);
                debug!(namespace = %qualified, path = %path.display(), "loading library");

                let library = include::load_yaml_file(&path, 0)?;
                let Yaml::Mapping(library) = library else {
                    return Err(DocumentError::invalid(qualified, "a library must be a mapping"));
                };
                self.collect(&library, Some(&qualified), &include::parent_dir(&path), depth + 1)?;
            }
        }

        let mut local = BTreeSet::new();
        let mut pending = Vec::new();
        for section in ["types", "schemas"] {
            for (name, declaration) in entries(map.get(section), section)? {
                local.insert(name.clone());
                pending.push((name, declaration));
            }
        }
        let siblings = Arc::new(local);
        for (name, declaration) in pending {
            self.types.push(TypeSource {
                name: qualify(namespace, &name),
                declaration,
                namespace: namespace.map(str::to_string),
                siblings: Arc::clone(&siblings),
            });
        }

        for (name, body) in entries(map.get("traits"), "traits")? {
            self.templates.traits.insert(qualify(namespace, &name), body);
        }
        for (name, body) in entries(map.get("resourceTypes"), "resourceTypes")? {
            self.templates.resource_types.insert(qualify(namespace, &name), body);
        }
        Ok(())
    }

    fn build_registry(&self) -> Result<TypeRegistry, DocumentError> {
        let mut registry = TypeRegistry::new();
        for source in &self.types {
            let scope = match &source.namespace {
                Some(namespace) => Scope::library(namespace, &source.siblings),
                None => Scope::root(),
            };
            let shape = TypeShape::from_declaration(&source.declaration, &scope, &source.name)?;
            registry.insert(TypeDefinition {
                name: source.name.clone(),
                description: source
                    .declaration
                    .get("description")
                    .and_then(Yaml::as_str)
                    .map(str::to_string),
                shape,
            });
        }
        registry.check_all()?;
        Ok(registry)
    }
}

fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(namespace) => format!("{namespace}.{name}"),
        None => name.to_string(),
    }
}

/// Named entries of a declaration section.
///
/// Accepts the RAML 1.0 mapping form and the list-of-mappings form.
fn entries(section: Option<&Yaml>, context: &str) -> Result<Vec<(String, Yaml)>, DocumentError> {
    let mut out = Vec::new();
    let mut push_mapping = |map: &Mapping| -> Result<(), DocumentError> {
        for (name, value) in map {
            let Some(name) = name.as_str() else {
                return Err(DocumentError::invalid(context, "declaration names must be strings"));
            };
            out.push((name.to_string(), value.clone()));
        }
        Ok(())
    };

    match section {
        None | Some(Yaml::Null) => {}
        Some(Yaml::Mapping(map)) => push_mapping(map)?,
        Some(Yaml::Sequence(items)) => {
            for item in items {
                let Yaml::Mapping(map) = item else {
                    return Err(DocumentError::invalid(context, "list entries must be mappings"));
                };
                push_mapping(map)?;
            }
        }
        Some(_) => return Err(DocumentError::invalid(context, "expected a mapping")),
    }
    Ok(out)
}

/// Builds the resource model once declarations are resolved.
struct Builder {
    templates: Templates,
    types: Arc<TypeRegistry>,
    base_uri: String,
}

impl Builder {
    fn resource(
        &self,
        relative_uri: &str,
        value: &Yaml,
        parent_path: &str,
    ) -> Result<Arc<ResourceDefinition>, DocumentError> {
        let resource_path = format!("{parent_path}{relative_uri}");
        let own = match value {
            Yaml::Mapping(map) => map.clone(),
            Yaml::Null => Mapping::new(),
            _ => return Err(DocumentError::invalid(&resource_path, "a resource must be a mapping")),
        };
        let map = self.templates.apply_resource_type(own, &resource_path)?;

        let relative_template =
            UriTemplate::parse(relative_uri).map_err(|source| DocumentError::Template {
                uri: relative_uri.to_string(),
                source,
            })?;

        let declared = match map.get("uriParameters") {
            Some(Yaml::Mapping(declared)) => declared.clone(),
            Some(Yaml::Null) | None => Mapping::new(),
            Some(_) => {
                return Err(DocumentError::invalid(
                    format!("{resource_path}.uriParameters"),
                    "expected a mapping",
                ));
            }
        };
        let uri_parameters = relative_template
            .variables()
            .into_iter()
            .map(|variable| {
                let declaration = declared.get(variable).cloned().unwrap_or(Yaml::Null);
                let context = format!("{resource_path}.uriParameters.{variable}");
                self.parameter(variable, &declaration, true, &context)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let resource_is = map.get("is").cloned();
        let mut methods = Vec::new();
        let mut resources = Vec::new();

        for (key, value) in &map {
            let Some(key) = key.as_str() else { continue };

            if key.starts_with('/') {
                resources.push(self.resource(key, value, &resource_path)?);
                continue;
            }

            let Ok(verb) = key.parse::<RestMethod>() else { continue };
            let own = match value {
                Yaml::Mapping(map) => map.clone(),
                Yaml::Null => Mapping::new(),
                _ => {
                    return Err(DocumentError::invalid(
                        format!("{resource_path}.{key}"),
                        "a method must be a mapping",
                    ));
                }
            };
            let expanded = self
                .templates
                .apply_traits(own, verb, resource_is.as_ref(), &resource_path)?;
            methods.push(Arc::new(self.method(verb, &expanded, &format!("{resource_path}.{key}"))?));
        }

        Ok(Arc::new(ResourceDefinition {
            relative_uri: relative_uri.to_string(),
            relative_template,
            absolute_uri: format!("{}{resource_path}", self.base_uri),
            display_name: string_field(&map, "displayName"),
            description: string_field(&map, "description"),
            methods,
            uri_parameters,
            resources,
        }))
    }

    fn method(
        &self,
        verb: RestMethod,
        map: &Mapping,
        context: &str,
    ) -> Result<MethodDefinition, DocumentError> {
        let query = if let Some(declaration) = map.get("queryString") {
            QuerySchema::QueryString(self.schema(declaration, &format!("{context}.queryString"))?)
        } else if let Some(declared) = map.get("queryParameters") {
            QuerySchema::Parameters(self.parameters(
                declared,
                false,
                &format!("{context}.queryParameters"),
            )?)
        } else {
            QuerySchema::Undeclared
        };

        let body = match map.get("body") {
            Some(body) => self.body(body, &format!("{context}.body"))?,
            None => None,
        };

        let mut responses = Vec::new();
        match map.get("responses") {
            Some(Yaml::Mapping(declared)) => {
                for (code, response) in declared {
                    let code = status_code(code).ok_or_else(|| {
                        DocumentError::invalid(
                            format!("{context}.responses"),
                            "response keys must be HTTP status codes",
                        )
                    })?;
                    let response_context = format!("{context}.responses.{code}");
                    let body = match response.get("body") {
                        Some(body) => self.body(body, &format!("{response_context}.body"))?,
                        None => None,
                    };
                    responses.push(ResponseSpec {
                        code,
                        description: response
                            .get("description")
                            .and_then(Yaml::as_str)
                            .map(str::to_string),
                        body,
                    });
                }
            }
            Some(Yaml::Null) | None => {}
            Some(_) => {
                return Err(DocumentError::invalid(
                    format!("{context}.responses"),
                    "expected a mapping of status codes",
                ));
            }
        }

        Ok(MethodDefinition {
            verb,
            description: string_field(map, "description"),
            query,
            body,
            responses,
        })
    }

    /// Resolves a `body:` node to its JSON schema.
    ///
    /// Bodies keyed by media type use the JSON entry and yield `None` when
    /// only non-JSON media types are declared.
    fn body(&self, body: &Yaml, context: &str) -> Result<Option<Schema>, DocumentError> {
        if let Yaml::Mapping(map) = body {
            let media_keyed = map.keys().any(|k| k.as_str().is_some_and(|k| k.contains('/')));
            if media_keyed {
                let json = map
                    .iter()
                    .find(|(k, _)| k.as_str().is_some_and(is_json_media_type));
                return match json {
                    Some((_, declaration)) => Ok(Some(self.body_schema(declaration, context)?)),
                    None => Ok(None),
                };
            }
        }
        Ok(Some(self.body_schema(body, context)?))
    }

    /// Body declarations default to `any` rather than `string`.
    fn body_schema(&self, declaration: &Yaml, context: &str) -> Result<Schema, DocumentError> {
        let untyped = match declaration {
            Yaml::Null => true,
            Yaml::Mapping(map) => !["type", "schema", "properties", "items", "enum"]
                .iter()
                .any(|key| map.contains_key(*key)),
            _ => false,
        };
        if untyped {
            return Ok(Schema::new(TypeShape::Any, Arc::clone(&self.types)));
        }
        self.schema(declaration, context)
    }

    fn schema(&self, declaration: &Yaml, context: &str) -> Result<Schema, DocumentError> {
        let shape = TypeShape::from_declaration(declaration, &Scope::root(), context)?;
        self.types.check_references(&shape, context)?;
        Ok(Schema::new(shape, Arc::clone(&self.types)))
    }

    fn parameters(
        &self,
        declared: &Yaml,
        required_by_default: bool,
        context: &str,
    ) -> Result<Vec<Parameter>, DocumentError> {
        let Yaml::Mapping(declared) = declared else {
            if declared.is_null() {
                return Ok(Vec::new());
            }
            return Err(DocumentError::invalid(context, "expected a mapping of parameters"));
        };

        let mut parameters = Vec::new();
        for (name, declaration) in declared {
            let Some(name) = name.as_str() else {
                return Err(DocumentError::invalid(context, "parameter names must be strings"));
            };
            let (name, required) = match name.strip_suffix('?') {
                Some(plain) => (plain, false),
                None => (name, required_by_default),
            };
            parameters.push(self.parameter(name, declaration, required, &format!("{context}.{name}"))?);
        }
        Ok(parameters)
    }

    fn parameter(
        &self,
        name: &str,
        declaration: &Yaml,
        required_by_default: bool,
        context: &str,
    ) -> Result<Parameter, DocumentError> {
        let required = match declaration.get("required") {
            Some(flag) => flag
                .as_bool()
                .ok_or_else(|| DocumentError::invalid(context, "'required' must be a boolean"))?,
            None => required_by_default,
        };
        let default = match declaration.get("default") {
            Some(value) => Some(yaml_to_json(value, context)?),
            None => None,
        };

        Ok(Parameter {
            name: name.to_string(),
            required,
            default,
            schema: self.schema(declaration, context)?,
        })
    }
}

fn status_code(key: &Yaml) -> Option<u16> {
    match key {
        Yaml::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Yaml::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DOCUMENT: &str = r#"
#%RAML 1.0
title: Example
version: v1
baseUri: https://{region}.api.example.com/{version}
baseUriParameters:
  region:
    type: string
    default: eu01
mediaType: application/json
types:
  User:
    properties:
      name: string
traits:
  paged:
    queryParameters:
      page?: integer
/users:
  is: [paged]
  get:
    responses:
      200:
        body:
          application/json:
            type: User[]
  post:
    body:
      application/json: User
  /{id}:
    uriParameters:
      id:
        type: integer
        minimum: 1
    delete:
/test-it:
"#;

    fn document() -> ApiDocument {
        ApiDocument::parse(DOCUMENT, ".").unwrap()
    }

    #[test]
    fn header_fields() {
        let doc = document();
        assert_eq!(doc.title.as_deref(), Some("Example"));
        assert_eq!(doc.version.as_deref(), Some("v1"));
        assert_eq!(doc.media_types, vec!["application/json"]);
        assert!(doc.is_json());
        assert_eq!(doc.base_uri_parameters[0].default, Some(json!("eu01")));
        assert_eq!(
            doc.base_uri.as_ref().map(UriTemplate::as_str),
            Some("https://{region}.api.example.com/{version}")
        );
    }

    #[test]
    fn resource_tree() {
        let doc = document();
        let names: Vec<String> = doc.resources.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["users", "testIt"]);

        let users = &doc.resources[0];
        assert!(!users.is_parametrized());
        assert_eq!(users.methods.len(), 2);

        let by_id = &users.resources[0];
        assert!(by_id.is_parametrized());
        assert_eq!(by_id.parameter_names(), vec!["id"]);
        assert_eq!(by_id.absolute_uri, "https://{region}.api.example.com/{version}/users/{id}");
        assert!(by_id.uri_parameter("id").unwrap().validate(&json!(0))[0]
            .message
            .contains(">= 1"));
    }

    #[test]
    fn traits_and_bodies() {
        let doc = document();
        let users = &doc.resources[0];
        let get = &users.methods[0];
        let QuerySchema::Parameters(params) = &get.query else {
            panic!("expected query parameters from the trait");
        };
        assert_eq!(params[0].name, "page");
        assert!(!params[0].required);

        let response = get.response(200).unwrap();
        assert!(response.body.as_ref().unwrap().accepts(&json!([{ "name": "a" }])));

        let post = &users.methods[1];
        assert!(!post.body.as_ref().unwrap().accepts(&json!({})));
    }

    #[test]
    fn undeclared_uri_parameters_are_strings() {
        let doc = ApiDocument::parse("mediaType: application/json\n/items/{slug}:\n  get:\n", ".").unwrap();
        let items = &doc.resources[0];
        assert!(items.uri_parameters[0].schema.accepts(&json!("a-b")));
        assert!(!items.uri_parameters[0].schema.accepts(&json!(3)));
    }

    #[test]
    fn unknown_type_reference_is_rejected() {
        let err = ApiDocument::parse("/a:\n  post:\n    body:\n      application/json: Ghost\n", ".")
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnknownType { ref name, .. } if name == "Ghost"));
    }

    #[test]
    fn unknown_trait_is_rejected() {
        let err = ApiDocument::parse("/a:\n  get:\n    is: [nope]\n", ".").unwrap_err();
        assert!(matches!(err, DocumentError::UnknownTrait { .. }));
    }

    #[test]
    fn media_type_detection() {
        assert!(is_json_media_type("application/json"));
        assert!(is_json_media_type("application/vnd.api+json; charset=utf-8"));
        assert!(!is_json_media_type("application/xml"));

        let doc = ApiDocument::parse("mediaType: [application/xml]\n", ".").unwrap();
        assert!(!doc.is_json());
        let doc = ApiDocument::parse("title: none\n", ".").unwrap();
        assert!(!doc.is_json());
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        let err = ApiDocument::parse("- a\n- b\n", ".").unwrap_err();
        assert!(err.to_string().contains("root must be a mapping"));
    }
}
