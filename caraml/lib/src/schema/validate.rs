//! Value validation against type shapes.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use super::registry::TypeRegistry;
use super::shape::{ArrayShape, DateKind, NumberFacets, ObjectShape, StringFacets, TypeShape};
use super::Violation;

/// Guards against self-referential declarations such as `Node: { next: Node }`
/// applied to unbounded input.
const MAX_DEPTH: usize = 64;

/// Collects every violation of `shape` by `value`.
pub(crate) fn validate(
    shape: &TypeShape,
    registry: &TypeRegistry,
    value: &Value,
    path: &str,
) -> Vec<Violation> {
    let mut validator = Validator {
        registry,
        violations: Vec::new(),
    };
    validator.check(shape, value, path, 0);
    validator.violations
}

struct Validator<'a> {
    registry: &'a TypeRegistry,
    violations: Vec<Violation>,
}

impl Validator<'_> {
    fn report(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    fn check(&mut self, shape: &TypeShape, value: &Value, path: &str, depth: usize) {
        if depth > MAX_DEPTH {
            self.report(path, "value nests deeper than its declared types allow");
            return;
        }

        match shape {
            TypeShape::Any | TypeShape::File => {}
            TypeShape::Nil => {
                if !value.is_null() {
                    self.mismatch(shape, value, path);
                }
            }
            TypeShape::Boolean => {
                if !value.is_boolean() {
                    self.mismatch(shape, value, path);
                }
            }
            TypeShape::String(facets) => match value.as_str() {
                Some(s) => self.check_string(facets, s, path),
                None => self.mismatch(shape, value, path),
            },
            TypeShape::Number(facets) => self.check_number(shape, facets, value, path),
            TypeShape::Date(kind) => self.check_date(shape, *kind, value, path),
            TypeShape::Array(array) => match value.as_array() {
                Some(items) => self.check_array(array, items, path, depth),
                None => self.mismatch(shape, value, path),
            },
            TypeShape::Object(object) => match value.as_object() {
                Some(map) => self.check_object(object, map, path, depth),
                None => self.mismatch(shape, value, path),
            },
            TypeShape::Union(members) => {
                let accepted = members
                    .iter()
                    .any(|member| validate_nested(member, self.registry, value, path, depth).is_empty());
                if !accepted {
                    self.report(
                        path,
                        format!("expected {}, got {}", shape.describe(), kind_of(value)),
                    );
                }
            }
            TypeShape::All(members) => {
                for member in members {
                    self.check(member, value, path, depth + 1);
                }
            }
            TypeShape::Enum { base, values } => {
                let before = self.violations.len();
                self.check(base, value, path, depth + 1);
                if self.violations.len() == before && !values.contains(value) {
                    let allowed = values
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.report(path, format!("must be one of [{allowed}]"));
                }
            }
            TypeShape::Reference(name) => match self.registry.get(name) {
                Some(definition) => self.check(&definition.shape, value, path, depth + 1),
                None => self.report(path, format!("unknown type '{name}'")),
            },
        }
    }

    fn mismatch(&mut self, shape: &TypeShape, value: &Value, path: &str) {
        self.report(
            path,
            format!("expected {}, got {}", shape.describe(), kind_of(value)),
        );
    }

    fn check_string(&mut self, facets: &StringFacets, s: &str, path: &str) {
        let length = s.chars().count();
        if let Some(min) = facets.min_length {
            if length < min {
                self.report(path, format!("length must be >= {min}"));
            }
        }
        if let Some(max) = facets.max_length {
            if length > max {
                self.report(path, format!("length must be <= {max}"));
            }
        }
        if let Some(pattern) = &facets.pattern {
            if !pattern.is_match(s) {
                self.report(path, format!("does not match pattern '{}'", pattern.as_str()));
            }
        }
    }

    fn check_number(&mut self, shape: &TypeShape, facets: &NumberFacets, value: &Value, path: &str) {
        let Some(n) = value.as_f64() else {
            self.mismatch(shape, value, path);
            return;
        };
        if facets.integer && n.fract() != 0.0 {
            self.mismatch(shape, value, path);
            return;
        }
        if let Some(min) = facets.minimum {
            if n < min {
                self.report(path, format!("must be >= {}", format_number(min)));
            }
        }
        if let Some(max) = facets.maximum {
            if n > max {
                self.report(path, format!("must be <= {}", format_number(max)));
            }
        }
        if let Some(step) = facets.multiple_of {
            let ratio = n / step;
            if (ratio - ratio.round()).abs() > 1e-9 {
                self.report(path, format!("must be a multiple of {}", format_number(step)));
            }
        }
    }

    fn check_date(&mut self, shape: &TypeShape, kind: DateKind, value: &Value, path: &str) {
        let Some(s) = value.as_str() else {
            self.mismatch(shape, value, path);
            return;
        };
        if !is_valid_date(kind, s) {
            self.report(path, format!("is not a valid {}", shape.describe()));
        }
    }

    fn check_array(&mut self, array: &ArrayShape, items: &[Value], path: &str, depth: usize) {
        if let Some(min) = array.min_items {
            if items.len() < min {
                self.report(path, format!("must have at least {min} items"));
            }
        }
        if let Some(max) = array.max_items {
            if items.len() > max {
                self.report(path, format!("must have at most {max} items"));
            }
        }
        if array.unique_items {
            let duplicated = items
                .iter()
                .enumerate()
                .any(|(i, item)| items[..i].contains(item));
            if duplicated {
                self.report(path, "items must be unique");
            }
        }
        for (i, item) in items.iter().enumerate() {
            self.check(&array.items, item, &format!("{path}[{i}]"), depth + 1);
        }
    }

    fn check_object(
        &mut self,
        object: &ObjectShape,
        map: &serde_json::Map<String, Value>,
        path: &str,
        depth: usize,
    ) {
        for property in &object.properties {
            let property_path = join_path(path, &property.name);
            match map.get(&property.name) {
                Some(value) => self.check(&property.shape, value, &property_path, depth + 1),
                None if property.required => {
                    self.report(&property_path, "required property is missing");
                }
                None => {}
            }
        }
        if !object.additional_properties {
            for key in map.keys() {
                if !object.properties.iter().any(|p| &p.name == key) {
                    self.report(&join_path(path, key), "unexpected property");
                }
            }
        }
    }
}

/// Parses `s` as the given date/time kind, rejecting impossible calendar
/// and clock values.
fn is_valid_date(kind: DateKind, s: &str) -> bool {
    match kind {
        DateKind::DateOnly => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        DateKind::TimeOnly => NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok(),
        DateKind::DateTimeOnly => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok(),
        DateKind::DateTime => DateTime::parse_from_rfc3339(s).is_ok(),
        DateKind::HttpDate => DateTime::parse_from_rfc2822(s).is_ok(),
    }
}

fn validate_nested(
    shape: &TypeShape,
    registry: &TypeRegistry,
    value: &Value,
    path: &str,
    depth: usize,
) -> Vec<Violation> {
    let mut validator = Validator {
        registry,
        violations: Vec::new(),
    };
    validator.check(shape, value, path, depth + 1);
    validator.violations
}

fn join_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
