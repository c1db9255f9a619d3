//! `!include` resolution.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value as Yaml};
use tracing::debug;

use crate::error::DocumentError;

const MAX_INCLUDE_DEPTH: usize = 32;

/// Reads and parses a YAML file, resolving its includes relative to itself.
pub(crate) fn load_yaml_file(path: &Path, depth: usize) -> Result<Yaml, DocumentError> {
    let source = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Yaml = serde_yaml::from_str(&source).map_err(|source| DocumentError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    resolve_includes(value, &parent_dir(path), depth + 1)
}

/// Replaces every `!include` node under `value` with the included content.
///
/// YAML fragments are parsed (and their own includes resolved relative to
/// the fragment), `.json` files become structured values, and any other
/// file is inlined as a string. Unknown tags are dropped, keeping the
/// tagged value.
pub(crate) fn resolve_includes(
    value: Yaml,
    base_dir: &Path,
    depth: usize,
) -> Result<Yaml, DocumentError> {
    if depth > MAX_INCLUDE_DEPTH {
        return Err(DocumentError::invalid(
            base_dir.display().to_string(),
            "includes are nested too deeply (cyclic include?)",
        ));
    }

    match value {
        Yaml::Tagged(tagged) if tagged.tag == "include" => {
            let Some(target) = tagged.value.as_str() else {
                return Err(DocumentError::invalid(
                    base_dir.display().to_string(),
                    "!include expects a file path",
                ));
            };
            let path = base_dir.join(target.trim());
            debug!(path = %path.display(), "including fragment");
            include_file(&path, depth)
        }
        Yaml::Tagged(tagged) => resolve_includes(tagged.value, base_dir, depth),
        Yaml::Mapping(map) => {
            let mut resolved = Mapping::with_capacity(map.len());
            for (key, value) in map {
                resolved.insert(key, resolve_includes(value, base_dir, depth)?);
            }
            Ok(Yaml::Mapping(resolved))
        }
        Yaml::Sequence(items) => items
            .into_iter()
            .map(|item| resolve_includes(item, base_dir, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Yaml::Sequence),
        scalar => Ok(scalar),
    }
}

fn include_file(path: &Path, depth: usize) -> Result<Yaml, DocumentError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("raml" | "yaml" | "yml") => load_yaml_file(path, depth),
        Some("json") => {
            let source = read(path)?;
            let json: serde_json::Value =
                serde_json::from_str(&source).map_err(|source| DocumentError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            serde_yaml::to_value(json).map_err(|e| {
                DocumentError::invalid(path.display().to_string(), e.to_string())
            })
        }
        _ => Ok(Yaml::String(read(path)?)),
    }
}

fn read(path: &Path) -> Result<String, DocumentError> {
    std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(source: &str, dir: &Path) -> Result<Yaml, DocumentError> {
        let value: Yaml = serde_yaml::from_str(source).unwrap();
        resolve_includes(value, dir, 0)
    }

    #[test]
    fn includes_yaml_fragment() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("user.raml"), "type: object\nproperties:\n  name: string\n").unwrap();

        let value = parse("User: !include user.raml", dir.path()).unwrap();
        assert_eq!(value["User"]["type"].as_str(), Some("object"));
    }

    #[test]
    fn nested_includes_resolve_relative_to_fragment() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("types")).unwrap();
        fs::write(dir.path().join("types/user.raml"), "properties:\n  url: !include url.raml\n").unwrap();
        fs::write(dir.path().join("types/url.raml"), "type: string\n").unwrap();

        let value = parse("User: !include types/user.raml", dir.path()).unwrap();
        assert_eq!(value["User"]["properties"]["url"]["type"].as_str(), Some("string"));
    }

    #[test]
    fn json_and_text_includes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("example.json"), r#"{"id": 1}"#).unwrap();
        fs::write(dir.path().join("notes.md"), "hello").unwrap();

        let value = parse("a: !include example.json\nb: !include notes.md", dir.path()).unwrap();
        assert_eq!(value["a"]["id"].as_u64(), Some(1));
        assert_eq!(value["b"].as_str(), Some("hello"));
    }

    #[test]
    fn missing_include_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let err = parse("a: !include nope.raml", dir.path()).unwrap_err();
        assert!(matches!(err, DocumentError::Read { .. }));
    }

    #[test]
    fn cyclic_include_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("loop.raml"), "again: !include loop.raml\n").unwrap();
        let err = parse("start: !include loop.raml", dir.path()).unwrap_err();
        assert!(err.to_string().contains("nested too deeply"));
    }
}
