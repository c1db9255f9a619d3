//! Text and JSON rendering for compiled trees and type stubs.

use caraml_lib::{BoundMethod, CompiledApi, Member, Resource, TypeStub};
use serde_json::{Value, json};

/// Renders every top-level resource as an indented tree.
pub fn tree_text(api: &CompiledApi) -> String {
    let mut out = String::new();
    for (name, resource) in &api.resources {
        write_resource(&mut out, name, resource, 0);
    }
    out
}

/// Renders a single resource (and everything below it) as a tree.
pub fn resource_text(resource: &Resource) -> String {
    let mut out = String::new();
    write_resource(&mut out, resource.name(), resource, 0);
    out
}

fn write_resource(out: &mut String, key: &str, resource: &Resource, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!("{indent}{key}  {}\n", resource.uri()));

    for (alias, member) in resource.members() {
        if let Member::Method(method) = member {
            out.push_str(&format!("{indent}  .{alias}  {}\n", method.verb()));
        }
    }
    for parameters in resource.parameter_sets() {
        out.push_str(&format!("{indent}  ({})\n", parameters.join(", ")));
    }
    for (key, member) in resource.members() {
        if let Member::Resource(child) = member {
            write_resource(out, key, child, depth + 1);
        }
    }
}

/// JSON form of the whole tree.
pub fn tree_json(api: &CompiledApi) -> Value {
    let resources: serde_json::Map<String, Value> = api
        .resources
        .iter()
        .map(|(name, resource)| (name.clone(), resource_json(resource)))
        .collect();
    Value::Object(resources)
}

/// JSON form of one resource.
pub fn resource_json(resource: &Resource) -> Value {
    let mut methods = serde_json::Map::new();
    let mut children = serde_json::Map::new();
    for (key, member) in resource.members() {
        match member {
            Member::Method(method) => {
                methods.insert(key.to_string(), method_json(method));
            }
            Member::Resource(child) => {
                children.insert(key.to_string(), resource_json(child));
            }
        }
    }

    json!({
        "uri": resource.uri(),
        "methods": methods,
        "parameters": resource.parameter_sets(),
        "resources": children,
    })
}

fn method_json(method: &BoundMethod) -> Value {
    json!({
        "verb": method.verb().to_string(),
        "description": method.definition().description,
    })
}

/// One line per type stub: generated name, declared name, and shape.
pub fn types_text(api: &CompiledApi) -> String {
    api.types
        .values()
        .map(|stub| {
            let mut line = format!("{}  ({})  {}", stub.name(), stub.declared_name(), stub.shape().describe());
            if let Some(description) = stub.description() {
                line.push_str(&format!("  # {description}"));
            }
            line.push('\n');
            line
        })
        .collect()
}

/// JSON form of the type stubs.
pub fn types_json(api: &CompiledApi) -> Value {
    let types: serde_json::Map<String, Value> = api
        .types
        .values()
        .map(|stub| (stub.name().to_string(), type_json(stub)))
        .collect();
    Value::Object(types)
}

fn type_json(stub: &TypeStub) -> Value {
    json!({
        "declaredName": stub.declared_name(),
        "description": stub.description(),
        "shape": stub.shape().describe(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use caraml_lib::{ApiDocument, CompileConfig, Compiler};

    fn api() -> CompiledApi {
        let doc = ApiDocument::parse(
            "mediaType: application/json\nbaseUri: https://api.example.com\ntypes:\n  url: string\n/users:\n  get:\n  /{id}:\n    get:\n  /me:\n    put:\n",
            ".",
        )
        .unwrap();
        Compiler::new(CompileConfig::default()).compile_document(&doc).unwrap()
    }

    #[test]
    fn text_tree_lists_methods_parameters_and_children() {
        let text = tree_text(&api());
        assert_eq!(
            text,
            "users  https://api.example.com/users\n  .find  GET\n  .get  GET\n  (id)\n  me  https://api.example.com/users/me\n    .put  PUT\n    .update  PUT\n"
        );
    }

    #[test]
    fn json_tree() {
        let value = tree_json(&api());
        assert_eq!(value["users"]["uri"], "https://api.example.com/users");
        assert_eq!(value["users"]["parameters"], json!([["id"]]));
        assert_eq!(value["users"]["methods"]["find"]["verb"], "GET");
        assert_eq!(value["users"]["resources"]["me"]["methods"]["update"]["verb"], "PUT");
    }

    #[test]
    fn types_listing() {
        let api = api();
        assert_eq!(types_text(&api), "Url  (url)  string\n");
        assert_eq!(types_json(&api)["Url"]["declaredName"], "url");
    }
}
