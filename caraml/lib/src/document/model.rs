//! The expanded, read-only interface model.

use std::sync::Arc;

use serde_json::Value;

use crate::method::RestMethod;
use crate::naming::resource_name;
use crate::schema::{Schema, Violation};
use crate::uri_template::UriTemplate;

/// A named, typed parameter (URI, base URI, or query).
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Whether the parameter must be supplied.
    pub required: bool,
    /// Declared `default:` value.
    pub default: Option<Value>,
    /// Schema every supplied value must satisfy.
    pub schema: Schema,
}

impl Parameter {
    /// Validates `value`, reporting violations under the parameter's name.
    pub fn validate(&self, value: &Value) -> Vec<Violation> {
        self.schema.validate_at(value, &self.name)
    }
}

/// How a method declares its query string.
#[derive(Debug, Clone, Default)]
pub enum QuerySchema {
    /// Nothing declared: any query is accepted.
    #[default]
    Undeclared,
    /// `queryString:` one schema for the whole query mapping.
    QueryString(Schema),
    /// `queryParameters:` one schema per named parameter.
    Parameters(Vec<Parameter>),
}

/// A declared response.
#[derive(Debug, Clone)]
pub struct ResponseSpec {
    /// HTTP status code.
    pub code: u16,
    /// `description:` text.
    pub description: Option<String>,
    /// JSON body schema, if declared.
    pub body: Option<Schema>,
}

/// One HTTP operation of a resource.
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// The HTTP verb.
    pub verb: RestMethod,
    /// `description:` text.
    pub description: Option<String>,
    /// Declared query parameters.
    pub query: QuerySchema,
    /// JSON request body schema, if declared.
    pub body: Option<Schema>,
    /// Declared responses in document order.
    pub responses: Vec<ResponseSpec>,
}

impl MethodDefinition {
    /// The response declared for `status`, if any.
    pub fn response(&self, status: u16) -> Option<&ResponseSpec> {
        self.responses.iter().find(|r| r.code == status)
    }
}

/// A node of the resource tree.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    /// Path segment(s) relative to the parent, e.g. `/{id}`.
    pub relative_uri: String,
    /// `relative_uri` parsed as a URI template.
    pub relative_template: UriTemplate,
    /// Base URI and every ancestor's relative URI joined, unexpanded.
    pub absolute_uri: String,
    /// `displayName:` text.
    pub display_name: Option<String>,
    /// `description:` text.
    pub description: Option<String>,
    /// Declared methods in document order.
    pub methods: Vec<Arc<MethodDefinition>>,
    /// One parameter per variable of `relative_template`, in order.
    pub uri_parameters: Vec<Parameter>,
    /// Child resources in document order.
    pub resources: Vec<Arc<ResourceDefinition>>,
}

impl ResourceDefinition {
    /// Returns `true` if the relative URI declares at least one variable.
    pub fn is_parametrized(&self) -> bool {
        !self.uri_parameters.is_empty()
    }

    /// The property name this resource is installed under.
    pub fn name(&self) -> String {
        resource_name(&self.relative_uri)
    }

    /// Looks up a URI parameter by name.
    pub fn uri_parameter(&self, name: &str) -> Option<&Parameter> {
        self.uri_parameters.iter().find(|p| p.name == name)
    }

    /// URI parameter names, sorted.
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.uri_parameters.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}
