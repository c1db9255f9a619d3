//! Accessor paths such as `users(5).messages(3).attachment`.
//!
//! Each dot-separated step names a member of the current resource and may
//! call it with a JSON argument: `users({"username": "aladdin"}).$get`.
//! Arguments that are not valid JSON are taken as a bare string, so
//! `users(aladdin)` works too.

use caraml_lib::{CompiledApi, Resource};
use serde_json::Value;

use crate::CliError;

/// One step of an accessor path.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub calls: Vec<Value>,
}

/// Splits `path` into steps.
pub fn parse_path(path: &str) -> Result<Vec<Step>, CliError> {
    let mut steps = Vec::new();
    for segment in split_top_level(path)? {
        steps.push(parse_step(&segment)?);
    }
    if steps.is_empty() {
        return Err(CliError::Path {
            path: path.to_string(),
            message: "no resource named".to_string(),
        });
    }
    Ok(steps)
}

/// Walks `steps` from the root of `api`.
pub fn resolve(api: &CompiledApi, steps: &[Step]) -> Result<Resource, CliError> {
    let (first, rest) = steps.split_first().ok_or_else(|| CliError::Path {
        path: String::new(),
        message: "no resource named".to_string(),
    })?;

    let root = api.resource(&first.name).ok_or_else(|| CliError::UnknownMember {
        parent: "(root)".to_string(),
        name: first.name.clone(),
        available: api.resources.keys().cloned().collect(),
    })?;
    let mut current = apply_calls(root.clone(), &first.calls)?;

    for step in rest {
        let child = current.resource(&step.name).ok_or_else(|| CliError::UnknownMember {
            parent: current.name().to_string(),
            name: step.name.clone(),
            available: current.keys().into_iter().map(str::to_string).collect(),
        })?;
        current = apply_calls(child.clone(), &step.calls)?;
    }
    Ok(current)
}

fn apply_calls(mut resource: Resource, calls: &[Value]) -> Result<Resource, CliError> {
    for argument in calls {
        resource = resource.call(argument.clone())?;
    }
    Ok(resource)
}

/// Splits on dots outside parentheses, brackets, braces and strings.
fn split_top_level(path: &str) -> Result<Vec<String>, CliError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for c in path.trim().chars() {
        if in_string {
            current.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| unbalanced(path))?;
                current.push(c);
            }
            '.' if depth == 0 => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if depth != 0 || in_string {
        return Err(unbalanced(path));
    }
    if !current.is_empty() {
        segments.push(current);
    }
    Ok(segments)
}

fn unbalanced(path: &str) -> CliError {
    CliError::Path {
        path: path.to_string(),
        message: "unbalanced brackets or quotes".to_string(),
    }
}

fn parse_step(segment: &str) -> Result<Step, CliError> {
    let (name, mut rest) = match segment.find('(') {
        Some(open) => (&segment[..open], &segment[open..]),
        None => (segment, ""),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::Path {
            path: segment.to_string(),
            message: "empty member name".to_string(),
        });
    }

    let mut calls = Vec::new();
    while !rest.is_empty() {
        let close = matching_paren(rest).ok_or_else(|| unbalanced(segment))?;
        let argument = rest[1..close].trim();
        calls.push(serde_json::from_str(argument).unwrap_or_else(|_| Value::String(argument.to_string())));
        rest = rest[close + 1..].trim_start();
        if !rest.is_empty() && !rest.starts_with('(') {
            return Err(CliError::Path {
                path: segment.to_string(),
                message: format!("unexpected '{rest}' after call"),
            });
        }
    }

    Ok(Step {
        name: name.to_string(),
        calls,
    })
}

/// Index of the `)` closing the `(` at the start of `s`.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(name: &str, calls: Vec<Value>) -> Step {
        Step {
            name: name.to_string(),
            calls,
        }
    }

    #[test]
    fn plain_members() {
        assert_eq!(
            parse_path("users.testIt").unwrap(),
            vec![step("users", vec![]), step("testIt", vec![])]
        );
    }

    #[test]
    fn calls_with_json_arguments() {
        assert_eq!(
            parse_path(r#"users({"username": "a.b"}).$get"#).unwrap(),
            vec![
                step("users", vec![json!({ "username": "a.b" })]),
                step("$get", vec![]),
            ]
        );
        assert_eq!(
            parse_path("users(5).messages(3)").unwrap(),
            vec![step("users", vec![json!(5)]), step("messages", vec![json!(3)])]
        );
    }

    #[test]
    fn bare_words_are_strings() {
        assert_eq!(
            parse_path("users(aladdin)").unwrap(),
            vec![step("users", vec![json!("aladdin")])]
        );
    }

    #[test]
    fn unbalanced_paths_are_rejected() {
        assert!(parse_path("users(5").is_err());
        assert!(parse_path("users)").is_err());
        assert!(parse_path(r#"users("x)"#).is_err());
        assert!(parse_path("").is_err());
        assert!(parse_path("users(1)x").is_err());
    }
}
