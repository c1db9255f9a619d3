//! Type shapes and their construction from RAML declarations.

use std::collections::BTreeSet;

use regex::Regex;
use serde_json::Value;
use serde_yaml::{Mapping, Value as Yaml};

use super::expr::parse_type_expression;
use crate::error::DocumentError;

/// Facets of a `string` type.
#[derive(Debug, Clone, Default)]
pub struct StringFacets {
    /// Minimum length in characters.
    pub min_length: Option<usize>,
    /// Maximum length in characters.
    pub max_length: Option<usize>,
    /// Regular expression the whole value must match.
    pub pattern: Option<Regex>,
}

/// Facets of a `number` or `integer` type.
#[derive(Debug, Clone, Default)]
pub struct NumberFacets {
    /// Rejects values with a fractional part.
    pub integer: bool,
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
    /// Value must be an integral multiple of this.
    pub multiple_of: Option<f64>,
}

impl NumberFacets {
    /// An unconstrained `integer`.
    pub fn integer() -> Self {
        Self {
            integer: true,
            ..Self::default()
        }
    }
}

/// An `array` type.
#[derive(Debug, Clone)]
pub struct ArrayShape {
    /// Shape every item must satisfy.
    pub items: Box<TypeShape>,
    /// Minimum number of items.
    pub min_items: Option<usize>,
    /// Maximum number of items.
    pub max_items: Option<usize>,
    /// Items must be pairwise distinct.
    pub unique_items: bool,
}

impl Default for ArrayShape {
    fn default() -> Self {
        Self {
            items: Box::new(TypeShape::Any),
            min_items: None,
            max_items: None,
            unique_items: false,
        }
    }
}

/// A declared object property.
#[derive(Debug, Clone)]
pub struct Property {
    /// Property name (without any `?` marker).
    pub name: String,
    /// Whether the property must be present.
    pub required: bool,
    /// Shape of the property's value.
    pub shape: TypeShape,
}

/// An `object` type.
#[derive(Debug, Clone)]
pub struct ObjectShape {
    /// Declared properties in declaration order.
    pub properties: Vec<Property>,
    /// Whether undeclared properties are allowed.
    pub additional_properties: bool,
}

impl Default for ObjectShape {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            additional_properties: true,
        }
    }
}

/// The RAML date and time built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    /// `date-only`, e.g. `2015-05-23`.
    DateOnly,
    /// `time-only`, e.g. `12:30:00`.
    TimeOnly,
    /// `datetime-only`, e.g. `2015-07-04T21:00:00`.
    DateTimeOnly,
    /// `datetime` (RFC 3339), e.g. `2016-02-28T16:41:41.090Z`.
    DateTime,
    /// `datetime` with `format: rfc2616`, e.g. `Sun, 28 Feb 2016 16:41:41 GMT`.
    HttpDate,
}

/// A resolved RAML type.
#[derive(Debug, Clone)]
pub enum TypeShape {
    /// `any`: accepts every value.
    Any,
    /// `nil`: only `null`.
    Nil,
    /// `boolean`.
    Boolean,
    /// `string` with facets.
    String(StringFacets),
    /// `number` or `integer` with facets.
    Number(NumberFacets),
    /// One of the date/time built-ins, carried as a string.
    Date(DateKind),
    /// `file`: opaque, accepts every value.
    File,
    /// `array` or `T[]`.
    Array(ArrayShape),
    /// `object` with properties.
    Object(ObjectShape),
    /// `A | B`: at least one alternative must accept.
    Union(Vec<TypeShape>),
    /// Inheritance: every member must accept.
    All(Vec<TypeShape>),
    /// A base shape restricted to listed values.
    Enum {
        /// The unrestricted shape.
        base: Box<TypeShape>,
        /// Allowed values.
        values: Vec<Value>,
    },
    /// A named, user-declared type.
    Reference(String),
}

impl TypeShape {
    /// Short human-readable form used in violation messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any".to_string(),
            Self::Nil => "nil".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::String(_) => "string".to_string(),
            Self::Number(facets) if facets.integer => "integer".to_string(),
            Self::Number(_) => "number".to_string(),
            Self::Date(DateKind::DateOnly) => "date-only".to_string(),
            Self::Date(DateKind::TimeOnly) => "time-only".to_string(),
            Self::Date(DateKind::DateTimeOnly) => "datetime-only".to_string(),
            Self::Date(DateKind::DateTime) => "datetime".to_string(),
            Self::Date(DateKind::HttpDate) => "datetime (rfc2616)".to_string(),
            Self::File => "file".to_string(),
            Self::Array(array) => format!("{}[]", array.items.describe()),
            Self::Object(_) => "object".to_string(),
            Self::Union(members) => join_described(members, " | "),
            Self::All(members) => join_described(members, " & "),
            Self::Enum { base, .. } => base.describe(),
            Self::Reference(name) => name.clone(),
        }
    }

    /// Every type name this shape refers to, directly or nested.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Reference(name) => names.push(name),
            Self::Array(array) => array.items.collect_references(names),
            Self::Object(object) => {
                for property in &object.properties {
                    property.shape.collect_references(names);
                }
            }
            Self::Union(members) | Self::All(members) => {
                for member in members {
                    member.collect_references(names);
                }
            }
            Self::Enum { base, .. } => base.collect_references(names),
            _ => {}
        }
    }

    /// Builds a shape from a RAML type declaration.
    ///
    /// `declaration` may be a type expression string, a mapping with `type`
    /// (or `schema`) and facets, or null (which RAML reads as `string`).
    ///
    /// ## Errors
    ///
    /// Returns an error for malformed expressions, facets, or patterns.
    pub fn from_declaration(
        declaration: &Yaml,
        scope: &Scope<'_>,
        context: &str,
    ) -> Result<Self, DocumentError> {
        match declaration {
            Yaml::Null => Ok(Self::String(StringFacets::default())),
            Yaml::String(expression) => parse_base_expression(expression, scope),
            Yaml::Mapping(map) => from_mapping(map, scope, context),
            _ => Err(DocumentError::invalid(
                context,
                "a type declaration must be a type expression or a mapping",
            )),
        }
    }
}

fn join_described(members: &[TypeShape], separator: &str) -> String {
    members
        .iter()
        .map(TypeShape::describe)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Where a declaration lives, for resolving unqualified type names.
///
/// Declarations inside a `uses:` library see their sibling declarations
/// under the library's namespace.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    namespace: Option<&'a str>,
    local: Option<&'a BTreeSet<String>>,
}

impl<'a> Scope<'a> {
    /// The root document scope: names are used as written.
    pub fn root() -> Self {
        Self {
            namespace: None,
            local: None,
        }
    }

    /// A library scope: names in `local` are qualified with `namespace`.
    pub fn library(namespace: &'a str, local: &'a BTreeSet<String>) -> Self {
        Self {
            namespace: Some(namespace),
            local: Some(local),
        }
    }

    /// Qualifies `name` if it refers to a declaration of this scope.
    pub fn qualify(&self, name: &str) -> String {
        match (self.namespace, self.local) {
            (Some(namespace), Some(local)) if local.contains(name) => {
                format!("{namespace}.{name}")
            }
            _ => name.to_string(),
        }
    }
}

fn is_inline_json_schema(expression: &str) -> bool {
    let trimmed = expression.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('<')
}

fn parse_base_expression(expression: &str, scope: &Scope<'_>) -> Result<TypeShape, DocumentError> {
    if is_inline_json_schema(expression) {
        tracing::debug!("inline JSON/XML schema is accepted without validation");
        return Ok(TypeShape::Any);
    }
    parse_type_expression(expression, scope)
}

fn from_mapping(map: &Mapping, scope: &Scope<'_>, context: &str) -> Result<TypeShape, DocumentError> {
    let declared = map.get("type").or_else(|| map.get("schema"));

    let base = match declared {
        Some(Yaml::String(expression)) => parse_base_expression(expression, scope)?,
        Some(Yaml::Sequence(parents)) => {
            let members = parents
                .iter()
                .map(|parent| TypeShape::from_declaration(parent, scope, context))
                .collect::<Result<Vec<_>, _>>()?;
            TypeShape::All(members)
        }
        Some(inline @ Yaml::Mapping(_)) => TypeShape::from_declaration(inline, scope, context)?,
        Some(Yaml::Null) | None => {
            if map.contains_key("properties") {
                TypeShape::Object(ObjectShape::default())
            } else if map.contains_key("items") {
                TypeShape::Array(ArrayShape::default())
            } else {
                TypeShape::String(StringFacets::default())
            }
        }
        Some(_) => {
            return Err(DocumentError::invalid(
                context,
                "'type' must be a type expression, a list, or a mapping",
            ));
        }
    };

    let refined = refine(base, map, scope, context)?;

    match map.get("enum") {
        Some(Yaml::Sequence(values)) => {
            let values = values
                .iter()
                .map(|v| yaml_to_json(v, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeShape::Enum {
                base: Box::new(refined),
                values,
            })
        }
        Some(_) => Err(DocumentError::invalid(context, "'enum' must be a list")),
        None => Ok(refined),
    }
}

/// Applies the facets in `map` to `base`.
///
/// Built-in bases absorb their facets directly; named or composite bases
/// are intersected with a shape carrying the facets.
fn refine(
    base: TypeShape,
    map: &Mapping,
    scope: &Scope<'_>,
    context: &str,
) -> Result<TypeShape, DocumentError> {
    match base {
        TypeShape::String(mut facets) => {
            apply_string_facets(&mut facets, map, context)?;
            Ok(TypeShape::String(facets))
        }
        TypeShape::Number(mut facets) => {
            apply_number_facets(&mut facets, map, context)?;
            Ok(TypeShape::Number(facets))
        }
        TypeShape::Array(mut array) => {
            apply_array_facets(&mut array, map, scope, context)?;
            Ok(TypeShape::Array(array))
        }
        TypeShape::Object(mut object) => {
            apply_object_facets(&mut object, map, scope, context)?;
            Ok(TypeShape::Object(object))
        }
        TypeShape::Date(DateKind::DateTime) => match map.get("format").and_then(Yaml::as_str) {
            None | Some("rfc3339") => Ok(TypeShape::Date(DateKind::DateTime)),
            Some("rfc2616") => Ok(TypeShape::Date(DateKind::HttpDate)),
            Some(format) => Err(DocumentError::invalid(
                context,
                format!("unsupported datetime format '{format}'"),
            )),
        },
        other => {
            let mut members = vec![other];

            if has_any(map, &["properties", "additionalProperties"]) {
                let mut object = ObjectShape::default();
                apply_object_facets(&mut object, map, scope, context)?;
                members.push(TypeShape::Object(object));
            }
            if has_any(map, &["minLength", "maxLength", "pattern"]) {
                let mut facets = StringFacets::default();
                apply_string_facets(&mut facets, map, context)?;
                members.push(TypeShape::String(facets));
            }
            if has_any(map, &["minimum", "maximum", "multipleOf"]) {
                let mut facets = NumberFacets::default();
                apply_number_facets(&mut facets, map, context)?;
                members.push(TypeShape::Number(facets));
            }
            if has_any(map, &["items", "minItems", "maxItems", "uniqueItems"]) {
                let mut array = ArrayShape::default();
                apply_array_facets(&mut array, map, scope, context)?;
                members.push(TypeShape::Array(array));
            }

            if members.len() == 1 {
                Ok(members.remove(0))
            } else {
                Ok(TypeShape::All(members))
            }
        }
    }
}

fn has_any(map: &Mapping, keys: &[&str]) -> bool {
    keys.iter().any(|key| map.contains_key(*key))
}

fn apply_string_facets(
    facets: &mut StringFacets,
    map: &Mapping,
    context: &str,
) -> Result<(), DocumentError> {
    if let Some(min) = usize_facet(map, "minLength", context)? {
        facets.min_length = Some(min);
    }
    if let Some(max) = usize_facet(map, "maxLength", context)? {
        facets.max_length = Some(max);
    }
    if let Some(pattern) = map.get("pattern") {
        let Some(pattern) = pattern.as_str() else {
            return Err(DocumentError::invalid(context, "'pattern' must be a string"));
        };
        let anchored = anchor(pattern);
        let regex = Regex::new(&anchored).map_err(|e| {
            DocumentError::invalid(context, format!("invalid pattern '{pattern}': {e}"))
        })?;
        facets.pattern = Some(regex);
    }
    Ok(())
}

/// RAML patterns must match the whole value unless they anchor themselves.
fn anchor(pattern: &str) -> String {
    let start = if pattern.starts_with('^') { "" } else { "^(?:" };
    let end = if pattern.starts_with('^') {
        ""
    } else if pattern.ends_with('$') {
        ")"
    } else {
        ")$"
    };
    format!("{start}{pattern}{end}")
}

fn apply_number_facets(
    facets: &mut NumberFacets,
    map: &Mapping,
    context: &str,
) -> Result<(), DocumentError> {
    if let Some(min) = f64_facet(map, "minimum", context)? {
        facets.minimum = Some(min);
    }
    if let Some(max) = f64_facet(map, "maximum", context)? {
        facets.maximum = Some(max);
    }
    if let Some(step) = f64_facet(map, "multipleOf", context)? {
        if step <= 0.0 {
            return Err(DocumentError::invalid(context, "'multipleOf' must be positive"));
        }
        facets.multiple_of = Some(step);
    }
    if let Some(Yaml::String(format)) = map.get("format") {
        if format.starts_with("int") || format == "long" {
            facets.integer = true;
        }
    }
    Ok(())
}

fn apply_array_facets(
    array: &mut ArrayShape,
    map: &Mapping,
    scope: &Scope<'_>,
    context: &str,
) -> Result<(), DocumentError> {
    if let Some(items) = map.get("items") {
        let items_context = format!("{context}.items");
        array.items = Box::new(TypeShape::from_declaration(items, scope, &items_context)?);
    }
    if let Some(min) = usize_facet(map, "minItems", context)? {
        array.min_items = Some(min);
    }
    if let Some(max) = usize_facet(map, "maxItems", context)? {
        array.max_items = Some(max);
    }
    if let Some(unique) = map.get("uniqueItems") {
        array.unique_items = unique.as_bool().ok_or_else(|| {
            DocumentError::invalid(context, "'uniqueItems' must be a boolean")
        })?;
    }
    Ok(())
}

fn apply_object_facets(
    object: &mut ObjectShape,
    map: &Mapping,
    scope: &Scope<'_>,
    context: &str,
) -> Result<(), DocumentError> {
    match map.get("properties") {
        Some(Yaml::Mapping(properties)) => {
            for (key, declaration) in properties {
                let Some(raw_name) = key.as_str() else {
                    return Err(DocumentError::invalid(context, "property names must be strings"));
                };
                let (name, optional) = match raw_name.strip_suffix('?') {
                    Some(stripped) => (stripped, true),
                    None => (raw_name, false),
                };
                let property_context = format!("{context}.{name}");
                let required = match declaration.get("required") {
                    Some(flag) => flag.as_bool().ok_or_else(|| {
                        DocumentError::invalid(&property_context, "'required' must be a boolean")
                    })?,
                    None => !optional,
                };
                let shape = TypeShape::from_declaration(declaration, scope, &property_context)?;

                object.properties.retain(|p| p.name != name);
                object.properties.push(Property {
                    name: name.to_string(),
                    required,
                    shape,
                });
            }
        }
        Some(Yaml::Null) | None => {}
        Some(_) => {
            return Err(DocumentError::invalid(context, "'properties' must be a mapping"));
        }
    }

    if let Some(additional) = map.get("additionalProperties") {
        object.additional_properties = additional.as_bool().ok_or_else(|| {
            DocumentError::invalid(context, "'additionalProperties' must be a boolean")
        })?;
    }
    Ok(())
}

fn usize_facet(map: &Mapping, key: &str, context: &str) -> Result<Option<usize>, DocumentError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| DocumentError::invalid(context, format!("'{key}' must be a non-negative integer"))),
    }
}

fn f64_facet(map: &Mapping, key: &str, context: &str) -> Result<Option<f64>, DocumentError> {
    match map.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| DocumentError::invalid(context, format!("'{key}' must be a number"))),
    }
}

/// Converts a YAML scalar or tree into JSON.
pub(crate) fn yaml_to_json(value: &Yaml, context: &str) -> Result<Value, DocumentError> {
    serde_json::to_value(value)
        .map_err(|e| DocumentError::invalid(context, format!("value is not representable as JSON: {e}")))
}
