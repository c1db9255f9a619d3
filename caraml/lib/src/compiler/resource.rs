//! Compiled resources and parametrized dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::Context;
use super::binder::BoundMethod;
use crate::bindings::UriBindings;
use crate::document::ResourceDefinition;
use crate::error::{CaramlError, DispatchError, ValidationError};
use crate::schema::Violation;

/// Arguments for calling a resource to select a parametrized child.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchArgs {
    /// Parameter name to value; selects the child with exactly these names.
    Keyed(Map<String, Value>),
    /// A bare value; selects the only single-parameter child accepting it.
    Scalar(Value),
}

impl From<Value> for DispatchArgs {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Keyed(map),
            other => Self::Scalar(other),
        }
    }
}

impl From<Map<String, Value>> for DispatchArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self::Keyed(map)
    }
}

macro_rules! scalar_dispatch {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for DispatchArgs {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Value::from(value))
                }
            }
        )*
    };
}

scalar_dispatch!(i32, i64, u32, u64, f64, bool, &str, String);

/// A property of a compiled resource.
#[derive(Debug, Clone)]
pub enum Member {
    /// A bound HTTP method, installed once per verb alias.
    Method(BoundMethod),
    /// A nested (non-parametrized) child resource.
    Resource(Resource),
}

/// A compiled node of the resource tree.
///
/// Holds its fully expanded URI, its bound methods under every alias, and
/// its nested children. Parametrized children are not members; they are
/// reached with [`Resource::call`].
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    uri: String,
    definition: Arc<ResourceDefinition>,
    bindings: UriBindings,
    members: BTreeMap<String, Member>,
    parametrized: Vec<Arc<ResourceDefinition>>,
    context: Arc<Context>,
}

impl Resource {
    /// Compiles `definition` below `parent_uri` with `bindings` in effect.
    pub(crate) fn compile(
        definition: Arc<ResourceDefinition>,
        parent_uri: &str,
        bindings: UriBindings,
        context: Arc<Context>,
    ) -> Self {
        let name = definition.name();
        let uri = format!("{parent_uri}{}", definition.relative_template.expand(&bindings));

        let (parametrized, nested): (Vec<_>, Vec<_>) = definition
            .resources
            .iter()
            .cloned()
            .partition(|child| child.is_parametrized());

        let mut members = BTreeMap::new();
        for method in &definition.methods {
            let bound = BoundMethod::new(Arc::clone(method), &name, &uri, Arc::clone(&context));
            for alias in method.verb.aliases() {
                members.insert((*alias).to_string(), Member::Method(bound.clone()));
            }
        }

        for child in nested {
            let child = Self::compile(child, &uri, bindings.clone(), Arc::clone(&context));
            let key = if members.contains_key(child.name()) {
                let prefixed = format!("{}{}", context.override_prefix, child.name());
                debug!(
                    resource = %name,
                    property = child.name(),
                    prefixed = %prefixed,
                    "nested resource collides with a method alias"
                );
                prefixed
            } else {
                child.name().to_string()
            };
            members.insert(key, Member::Resource(child));
        }

        Self {
            name,
            uri,
            definition,
            bindings,
            members,
            parametrized,
            context,
        }
    }

    /// The property name this resource is installed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully expanded URI for the current bindings.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The definition this resource was compiled from.
    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    /// The URI parameter values in effect.
    pub fn bindings(&self) -> &UriBindings {
        &self.bindings
    }

    /// Property names in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        self.members.keys().map(String::as_str).collect()
    }

    /// Iterates properties in name order.
    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks up a property.
    pub fn get(&self, key: &str) -> Option<&Member> {
        self.members.get(key)
    }

    /// Looks up a bound method by alias (`get`, `find`, `create`, ...).
    pub fn method(&self, alias: &str) -> Option<&BoundMethod> {
        match self.members.get(alias)? {
            Member::Method(method) => Some(method),
            Member::Resource(_) => None,
        }
    }

    /// Looks up a nested resource by property name (prefixed if it collided).
    pub fn resource(&self, key: &str) -> Option<&Resource> {
        match self.members.get(key)? {
            Member::Resource(resource) => Some(resource),
            Member::Method(_) => None,
        }
    }

    /// Returns `true` if calling this resource can succeed.
    pub fn is_callable(&self) -> bool {
        !self.parametrized.is_empty()
    }

    /// Sorted parameter names of each parametrized child.
    pub fn parameter_sets(&self) -> Vec<Vec<&str>> {
        self.parametrized.iter().map(|c| c.parameter_names()).collect()
    }

    /// Selects a parametrized child and compiles it with the supplied values.
    ///
    /// A keyed argument selects the child whose URI parameter names equal
    /// its keys, then validates every value. A scalar selects the single
    /// one-parameter child whose schema accepts it.
    ///
    /// The returned resource owns its bindings: `self` is never modified.
    ///
    /// ## Errors
    ///
    /// - [`DispatchError::NotParametrized`] if there is nothing to select.
    /// - [`DispatchError::NoMatchingKeys`] if no child has exactly the keys.
    /// - [`ValidationError::UriParameters`] listing every rejected value.
    /// - [`DispatchError::AmbiguousParameter`] if zero or several children
    ///   accept a scalar.
    pub fn call(&self, args: impl Into<DispatchArgs>) -> Result<Resource, CaramlError> {
        if self.parametrized.is_empty() {
            return Err(DispatchError::NotParametrized {
                resource: self.name.clone(),
            }
            .into());
        }

        let (child, values) = match args.into() {
            DispatchArgs::Keyed(values) => (self.select_by_keys(&values)?, values),
            DispatchArgs::Scalar(value) => self.select_by_value(value)?,
        };

        debug!(
            resource = %self.name,
            child = %child.relative_uri,
            "dispatching to parametrized child"
        );
        let bindings = self.bindings.overlay(values);
        Ok(Self::compile(
            Arc::clone(child),
            &self.uri,
            bindings,
            Arc::clone(&self.context),
        ))
    }

    fn select_by_keys(
        &self,
        values: &Map<String, Value>,
    ) -> Result<&Arc<ResourceDefinition>, CaramlError> {
        let mut keys: Vec<&str> = values.keys().map(String::as_str).collect();
        keys.sort_unstable();

        let Some(child) = self
            .parametrized
            .iter()
            .find(|child| child.parameter_names() == keys)
        else {
            return Err(DispatchError::NoMatchingKeys {
                resource: self.name.clone(),
                keys: keys.into_iter().map(str::to_string).collect(),
            }
            .into());
        };

        let violations: Vec<Violation> = child
            .uri_parameters
            .iter()
            .flat_map(|parameter| match values.get(&parameter.name) {
                Some(value) => parameter.validate(value),
                None => Vec::new(),
            })
            .collect();
        if !violations.is_empty() {
            return Err(ValidationError::UriParameters {
                resource: self.name.clone(),
                violations,
            }
            .into());
        }

        Ok(child)
    }

    fn select_by_value(
        &self,
        value: Value,
    ) -> Result<(&Arc<ResourceDefinition>, Map<String, Value>), CaramlError> {
        let candidates: Vec<_> = self
            .parametrized
            .iter()
            .filter_map(|child| match child.uri_parameters.as_slice() {
                [parameter] if parameter.validate(&value).is_empty() => Some((child, parameter)),
                _ => None,
            })
            .collect();

        match candidates.as_slice() {
            [(child, parameter)] => {
                let mut values = Map::new();
                values.insert(parameter.name.clone(), value);
                Ok((*child, values))
            }
            _ => Err(DispatchError::AmbiguousParameter {
                resource: self.name.clone(),
                value: value.to_string(),
                candidates: candidates.len(),
            }
            .into()),
        }
    }
}
