//! Trait and resource type application.
//!
//! Produces the expanded view of a resource: its resource type (and the
//! resource types that one inherits from) merged underneath it, and every
//! applicable trait merged underneath each method.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value as Yaml};

use crate::error::DocumentError;
use crate::method::RestMethod;
use crate::naming::{lower_camel_case, split_words, upper_camel_case};

const MAX_RESOURCE_TYPE_DEPTH: usize = 16;

static PARAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<<\s*([A-Za-z_][A-Za-z0-9_]*)\s*((?:\|\s*![a-z]+\s*)*)>>")
        .expect("valid parameter regex")
});
static TRANSFORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!([a-z]+)").expect("valid transform regex"));

/// Parameter name to value for one trait or resource type application.
pub(crate) type Parameters = BTreeMap<String, Yaml>;

/// Traits and resource types visible to the document, by (qualified) name.
#[derive(Debug, Default)]
pub(crate) struct Templates {
    pub traits: BTreeMap<String, Yaml>,
    pub resource_types: BTreeMap<String, Yaml>,
}

impl Templates {
    /// Merges the resource's `type:` chain under `resource`.
    ///
    /// `resource_path` is the resource's path relative to the base URI.
    pub fn apply_resource_type(
        &self,
        resource: Mapping,
        resource_path: &str,
    ) -> Result<Mapping, DocumentError> {
        let mut resolved = resource;
        let mut depth = 0;

        while let Some(reference) = take(&mut resolved, "type") {
            depth += 1;
            if depth > MAX_RESOURCE_TYPE_DEPTH {
                return Err(DocumentError::invalid(
                    resource_path,
                    "resource type inheritance is nested too deeply",
                ));
            }

            let (name, mut parameters) = template_reference(&reference, resource_path)?;
            let Some(body) = self.resource_types.get(&name) else {
                return Err(DocumentError::UnknownResourceType {
                    name,
                    context: resource_path.to_string(),
                });
            };
            parameters.extend(reserved_path_parameters(resource_path));

            let body = substitute(body.clone(), &parameters, &format!("resourceTypes.{name}"))?;
            let inherited = match body {
                Yaml::Mapping(map) => map,
                Yaml::Null => Mapping::new(),
                _ => {
                    return Err(DocumentError::invalid(
                        format!("resourceTypes.{name}"),
                        "a resource type must be a mapping",
                    ));
                }
            };
            resolved = merge(resolved, inherited);
        }

        Ok(resolved)
    }

    /// Merges the traits named by `resource_is` and the method's own `is:`
    /// under `method`. Traits listed earlier take precedence.
    pub fn apply_traits(
        &self,
        method: Mapping,
        verb: RestMethod,
        resource_is: Option<&Yaml>,
        resource_path: &str,
    ) -> Result<Mapping, DocumentError> {
        let context = format!("{resource_path}.{}", verb.to_string().to_lowercase());
        let mut references = Vec::new();
        if let Some(own) = method.get("is") {
            references.extend(trait_list(own, &context)?);
        }
        if let Some(inherited) = resource_is {
            references.extend(trait_list(inherited, resource_path)?);
        }

        let mut resolved = method;
        take(&mut resolved, "is");

        for reference in references {
            let (name, mut parameters) = template_reference(&reference, &context)?;
            let Some(body) = self.traits.get(&name) else {
                return Err(DocumentError::UnknownTrait { name, context });
            };
            parameters.extend(reserved_path_parameters(resource_path));
            parameters.insert(
                "methodName".to_string(),
                Yaml::String(verb.to_string().to_lowercase()),
            );

            match substitute(body.clone(), &parameters, &format!("traits.{name}"))? {
                Yaml::Mapping(inherited) => resolved = merge(resolved, inherited),
                Yaml::Null => {}
                _ => {
                    return Err(DocumentError::invalid(
                        format!("traits.{name}"),
                        "a trait must be a mapping",
                    ));
                }
            }
        }

        Ok(resolved)
    }
}

/// Removes `key` from `map`, keeping the order of the remaining entries.
fn take(map: &mut Mapping, key: &str) -> Option<Yaml> {
    let value = map.get(key).cloned()?;
    *map = std::mem::take(map)
        .into_iter()
        .filter(|(k, _)| k.as_str() != Some(key))
        .collect();
    Some(value)
}

fn trait_list(value: &Yaml, context: &str) -> Result<Vec<Yaml>, DocumentError> {
    match value {
        Yaml::Sequence(items) => Ok(items.clone()),
        Yaml::Null => Ok(Vec::new()),
        Yaml::String(_) | Yaml::Mapping(_) => Ok(vec![value.clone()]),
        _ => Err(DocumentError::invalid(context, "'is' must list trait names")),
    }
}

/// Splits `name` or `{ name: { param: value } }` into its parts.
fn template_reference(reference: &Yaml, context: &str) -> Result<(String, Parameters), DocumentError> {
    match reference {
        Yaml::String(name) => Ok((name.clone(), Parameters::new())),
        Yaml::Mapping(map) if map.len() == 1 => {
            let Some((Yaml::String(name), arguments)) = map.iter().next() else {
                return Err(DocumentError::invalid(context, "template name must be a string"));
            };
            let parameters = match arguments {
                Yaml::Mapping(arguments) => arguments
                    .iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v.clone())))
                    .collect(),
                Yaml::Null => Parameters::new(),
                _ => {
                    return Err(DocumentError::invalid(
                        context,
                        format!("parameters of '{name}' must be a mapping"),
                    ));
                }
            };
            Ok((name.clone(), parameters))
        }
        _ => Err(DocumentError::invalid(
            context,
            "expected a template name or a single-entry mapping",
        )),
    }
}

fn reserved_path_parameters(resource_path: &str) -> Parameters {
    let path_name = resource_path
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty() && !segment.contains('{'))
        .unwrap_or_default();

    Parameters::from([
        ("resourcePath".to_string(), Yaml::String(resource_path.to_string())),
        ("resourcePathName".to_string(), Yaml::String(path_name.to_string())),
    ])
}

/// Merges `inherited` underneath `own`.
///
/// Keys `own` declares always win and nested mappings merge recursively.
/// Optional methods (`get?`) only apply where `own` declares the method.
pub(crate) fn merge(mut own: Mapping, inherited: Mapping) -> Mapping {
    for (key, value) in inherited {
        let optional_method = key
            .as_str()
            .and_then(|k| k.strip_suffix('?'))
            .filter(|plain| plain.parse::<RestMethod>().is_ok())
            .map(str::to_string);
        let (key, optional) = match optional_method {
            Some(plain) => (Yaml::String(plain), true),
            None => (key, false),
        };

        match own.get_mut(&key) {
            Some(existing) => {
                let is_trait_list = key.as_str() == Some("is");
                merge_into(existing, value, is_trait_list);
            }
            None if optional => {}
            None => {
                own.insert(key, value);
            }
        }
    }
    own
}

fn merge_into(existing: &mut Yaml, inherited: Yaml, union_sequences: bool) {
    match (existing, inherited) {
        (Yaml::Mapping(own), Yaml::Mapping(inherited)) => {
            let taken = std::mem::take(own);
            *own = merge(taken, inherited);
        }
        (slot, Yaml::Mapping(inherited)) if slot.is_null() => {
            *slot = Yaml::Mapping(inherited);
        }
        (Yaml::Sequence(own), Yaml::Sequence(inherited)) if union_sequences => {
            for item in inherited {
                if !own.contains(&item) {
                    own.push(item);
                }
            }
        }
        _ => {}
    }
}

/// Replaces `<<param>>` placeholders in keys and values.
///
/// A string consisting of a single placeholder without transforms takes the
/// parameter's value as is, so non-string arguments keep their type.
pub(crate) fn substitute(
    value: Yaml,
    parameters: &Parameters,
    context: &str,
) -> Result<Yaml, DocumentError> {
    match value {
        Yaml::String(s) => substitute_string(&s, parameters, context),
        Yaml::Mapping(map) => {
            let mut out = Mapping::with_capacity(map.len());
            for (key, value) in map {
                let key = match key {
                    Yaml::String(k) => substitute_string(&k, parameters, context)?,
                    other => other,
                };
                out.insert(key, substitute(value, parameters, context)?);
            }
            Ok(Yaml::Mapping(out))
        }
        Yaml::Sequence(items) => items
            .into_iter()
            .map(|item| substitute(item, parameters, context))
            .collect::<Result<Vec<_>, _>>()
            .map(Yaml::Sequence),
        other => Ok(other),
    }
}

fn substitute_string(s: &str, parameters: &Parameters, context: &str) -> Result<Yaml, DocumentError> {
    if !s.contains("<<") {
        return Ok(Yaml::String(s.to_string()));
    }

    if let Some(captures) = PARAMETER.captures(s) {
        let whole = captures.get(0).map(|m| m.as_str()) == Some(s);
        let has_transforms = captures.get(2).is_some_and(|m| !m.as_str().trim().is_empty());
        if whole && !has_transforms {
            let name = &captures[1];
            return parameters
                .get(name)
                .cloned()
                .ok_or_else(|| missing_parameter(name, context));
        }
    }

    let mut failure = None;
    let replaced = PARAMETER.replace_all(s, |captures: &Captures<'_>| {
        match render_parameter(captures, parameters, context) {
            Ok(text) => text,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(Yaml::String(replaced.into_owned())),
    }
}

fn render_parameter(
    captures: &Captures<'_>,
    parameters: &Parameters,
    context: &str,
) -> Result<String, DocumentError> {
    let name = &captures[1];
    let value = parameters
        .get(name)
        .ok_or_else(|| missing_parameter(name, context))?;
    let mut text = scalar_text(value).ok_or_else(|| {
        DocumentError::invalid(context, format!("parameter '{name}' must be a scalar to be interpolated"))
    })?;

    if let Some(transforms) = captures.get(2) {
        for transform in TRANSFORM.captures_iter(transforms.as_str()) {
            text = apply_transform(&transform[1], &text, context)?;
        }
    }
    Ok(text)
}

fn missing_parameter(name: &str, context: &str) -> DocumentError {
    DocumentError::invalid(context, format!("no value supplied for parameter '<<{name}>>'"))
}

fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Number(n) => Some(n.to_string()),
        Yaml::Bool(b) => Some(b.to_string()),
        Yaml::Null => Some(String::new()),
        _ => None,
    }
}

fn apply_transform(transform: &str, text: &str, context: &str) -> Result<String, DocumentError> {
    let joined = |separator: &str, upper: bool| {
        split_words(text)
            .iter()
            .map(|w| if upper { w.to_uppercase() } else { w.to_lowercase() })
            .collect::<Vec<_>>()
            .join(separator)
    };

    let out = match transform {
        "singularize" => singularize(text),
        "pluralize" => pluralize(text),
        "uppercase" => text.to_uppercase(),
        "lowercase" => text.to_lowercase(),
        "lowercamelcase" => lower_camel_case(text),
        "uppercamelcase" => upper_camel_case(text),
        "lowerunderscorecase" => joined("_", false),
        "upperunderscorecase" => joined("_", true),
        "lowerhyphencase" => joined("-", false),
        "upperhyphencase" => joined("-", true),
        other => {
            return Err(DocumentError::invalid(
                context,
                format!("unknown parameter transform '!{other}'"),
            ));
        }
    };
    Ok(out)
}

fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = ["sses", "shes", "ches", "xes"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix).map(|s| (s, &suffix[..suffix.len() - 2])))
    {
        format!("{}{}", stem.0, stem.1)
    } else if word.ends_with("ss") {
        word.to_string()
    } else if let Some(stem) = word.strip_suffix('s') {
        stem.to_string()
    } else {
        word.to_string()
    }
}

fn pluralize(word: &str) -> String {
    let consonant_y = word.len() > 1
        && word.ends_with('y')
        && !word[..word.len() - 1].ends_with(['a', 'e', 'i', 'o', 'u']);

    if consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "sh", "ch", "x", "z"].iter().any(|s| word.ends_with(s)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(source: &str) -> Yaml {
        serde_yaml::from_str(source).unwrap()
    }

    fn mapping(source: &str) -> Mapping {
        match yaml(source) {
            Yaml::Mapping(map) => map,
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), Yaml::String((*v).to_string())))
            .collect()
    }

    #[test]
    fn merge_own_keys_win() {
        let merged = merge(
            mapping("description: mine\nget:\n  description: own"),
            mapping("description: theirs\nget:\n  queryParameters:\n    page: integer"),
        );
        assert_eq!(merged["description"].as_str(), Some("mine"));
        assert_eq!(merged["get"]["description"].as_str(), Some("own"));
        assert!(merged["get"]["queryParameters"]["page"].is_string());
    }

    #[test]
    fn optional_keys_apply_only_when_present() {
        let merged = merge(mapping("get: {}"), mapping("get?:\n  description: x\npost?:\n  description: y"));
        assert_eq!(merged["get"]["description"].as_str(), Some("x"));
        assert!(!merged.contains_key("post"));
        assert!(!merged.contains_key("post?"));
    }

    #[test]
    fn null_methods_take_inherited_content() {
        let merged = merge(mapping("get:"), mapping("get:\n  description: x"));
        assert_eq!(merged["get"]["description"].as_str(), Some("x"));
    }

    #[test]
    fn substitution_with_transforms() {
        let out = substitute(
            yaml("description: Get all <<resourcePathName>>, one <<resourcePathName | !singularize | !uppercamelcase>>"),
            &params(&[("resourcePathName", "users")]),
            "test",
        )
        .unwrap();
        assert_eq!(out["description"].as_str(), Some("Get all users, one User"));
    }

    #[test]
    fn whole_placeholder_keeps_value_type() {
        let mut parameters = Parameters::new();
        parameters.insert("max".to_string(), yaml("50"));
        let out = substitute(yaml("maximum: <<max>>"), &parameters, "test").unwrap();
        assert_eq!(out["maximum"].as_u64(), Some(50));
    }

    #[test]
    fn placeholders_in_keys() {
        let out = substitute(yaml("<<item>>Id: integer"), &params(&[("item", "user")]), "test").unwrap();
        assert!(out.get("userId").is_some());
    }

    #[test]
    fn missing_parameter_is_reported() {
        let err = substitute(yaml("x: <<nope>>"), &Parameters::new(), "traits.paged").unwrap_err();
        assert!(err.to_string().contains("<<nope>>"));
    }

    #[test]
    fn unknown_transform_is_reported() {
        let err = substitute(yaml("x: <<a | !shout>>"), &params(&[("a", "b")]), "t").unwrap_err();
        assert!(err.to_string().contains("!shout"));
    }

    #[test]
    fn inflection() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("address"), "address");
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
    }

    #[test]
    fn resource_type_chain() {
        let templates = Templates {
            traits: BTreeMap::new(),
            resource_types: [
                ("base".to_string(), yaml("get?:\n  description: fetch <<resourcePathName>>")),
                ("collection".to_string(), yaml("type: base\npost?:\n  description: add")),
            ]
            .into_iter()
            .collect(),
        };
        let resolved = templates
            .apply_resource_type(mapping("type: collection\nget:\npost:"), "/users")
            .unwrap();
        assert_eq!(resolved["get"]["description"].as_str(), Some("fetch users"));
        assert_eq!(resolved["post"]["description"].as_str(), Some("add"));
        assert!(!resolved.contains_key("type"));
    }

    #[test]
    fn unknown_resource_type() {
        let templates = Templates::default();
        let err = templates
            .apply_resource_type(mapping("type: nope"), "/users")
            .unwrap_err();
        assert!(matches!(err, DocumentError::UnknownResourceType { .. }));
    }

    #[test]
    fn traits_apply_in_precedence_order() {
        let templates = Templates {
            traits: [
                ("first".to_string(), yaml("description: first <<methodName>>")),
                ("second".to_string(), yaml("description: second\nqueryParameters:\n  page: integer")),
            ]
            .into_iter()
            .collect(),
            resource_types: BTreeMap::new(),
        };
        let resource_is = yaml("[second]");
        let resolved = templates
            .apply_traits(mapping("is: [first]"), RestMethod::Get, Some(&resource_is), "/users")
            .unwrap();
        assert_eq!(resolved["description"].as_str(), Some("first get"));
        assert!(resolved["queryParameters"]["page"].is_string());
        assert!(!resolved.contains_key("is"));
    }

    #[test]
    fn parametrized_trait() {
        let templates = Templates {
            traits: [(
                "paged".to_string(),
                yaml("queryParameters:\n  limit:\n    type: integer\n    maximum: <<max>>"),
            )]
            .into_iter()
            .collect(),
            resource_types: BTreeMap::new(),
        };
        let resolved = templates
            .apply_traits(mapping("is: [{ paged: { max: 20 } }]"), RestMethod::Get, None, "/users")
            .unwrap();
        assert_eq!(resolved["queryParameters"]["limit"]["maximum"].as_u64(), Some(20));
    }

    #[test]
    fn reserved_parameters_skip_uri_variables() {
        let params = reserved_path_parameters("/users/{id}");
        assert_eq!(params["resourcePathName"].as_str(), Some("users"));
        assert_eq!(params["resourcePath"].as_str(), Some("/users/{id}"));
    }
}
