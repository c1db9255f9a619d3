//! RAML type expressions: `string`, `User[]`, `(A | B)[]`, `string?`.

use super::shape::{ArrayShape, DateKind, NumberFacets, ObjectShape, Scope, StringFacets, TypeShape};
use crate::error::DocumentError;

/// Parses a type expression into a shape.
///
/// Supports unions (`|`), array suffixes (`[]`), grouping with parentheses
/// and a trailing `?` meaning "or nil". Names that are not built-in become
/// references qualified through `scope`.
///
/// ## Errors
///
/// Returns [`DocumentError::InvalidTypeExpression`] for malformed input.
pub fn parse_type_expression(expression: &str, scope: &Scope<'_>) -> Result<TypeShape, DocumentError> {
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        expression,
        tokens,
        pos: 0,
        scope,
    };
    let shape = parser.union()?;
    if parser.pos != parser.tokens.len() {
        return Err(invalid(expression, "unexpected trailing input"));
    }
    Ok(shape)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Pipe,
    Open,
    Close,
    Brackets,
    Question,
}

fn invalid(expression: &str, message: &str) -> DocumentError {
    DocumentError::InvalidTypeExpression {
        expression: expression.to_string(),
        message: message.to_string(),
    }
}

fn tokenize(expression: &str) -> Result<Vec<Token>, DocumentError> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '|' => {
                chars.next();
                tokens.push(Token::Pipe);
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '?' => {
                chars.next();
                tokens.push(Token::Question);
            }
            '[' => {
                chars.next();
                if chars.next() != Some(']') {
                    return Err(invalid(expression, "'[' must be followed by ']'"));
                }
                tokens.push(Token::Brackets);
            }
            c if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            other => {
                return Err(invalid(expression, &format!("unexpected character '{other}'")));
            }
        }
    }

    if tokens.is_empty() {
        return Err(invalid(expression, "empty type expression"));
    }
    Ok(tokens)
}

struct Parser<'a, 's> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    scope: &'a Scope<'s>,
}

impl Parser<'_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn union(&mut self) -> Result<TypeShape, DocumentError> {
        let mut members = vec![self.postfix()?];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            members.push(self.postfix()?);
        }
        if members.len() == 1 {
            Ok(members.remove(0))
        } else {
            Ok(TypeShape::Union(members))
        }
    }

    fn postfix(&mut self) -> Result<TypeShape, DocumentError> {
        let mut shape = self.primary()?;
        loop {
            match self.peek() {
                Some(Token::Brackets) => {
                    self.pos += 1;
                    shape = TypeShape::Array(ArrayShape {
                        items: Box::new(shape),
                        ..ArrayShape::default()
                    });
                }
                Some(Token::Question) => {
                    self.pos += 1;
                    shape = TypeShape::Union(vec![shape, TypeShape::Nil]);
                }
                _ => return Ok(shape),
            }
        }
    }

    fn primary(&mut self) -> Result<TypeShape, DocumentError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Open) => {
                self.pos += 1;
                let inner = self.union()?;
                if self.peek() != Some(&Token::Close) {
                    return Err(invalid(self.expression, "unbalanced parentheses"));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                Ok(builtin(&name).unwrap_or_else(|| TypeShape::Reference(self.scope.qualify(&name))))
            }
            Some(_) => Err(invalid(self.expression, "expected a type name")),
            None => Err(invalid(self.expression, "unexpected end of expression")),
        }
    }
}

fn builtin(name: &str) -> Option<TypeShape> {
    let shape = match name {
        "any" => TypeShape::Any,
        "nil" | "null" => TypeShape::Nil,
        "boolean" => TypeShape::Boolean,
        "string" => TypeShape::String(StringFacets::default()),
        "number" => TypeShape::Number(NumberFacets::default()),
        "integer" => TypeShape::Number(NumberFacets::integer()),
        "date-only" => TypeShape::Date(DateKind::DateOnly),
        "time-only" => TypeShape::Date(DateKind::TimeOnly),
        "datetime-only" => TypeShape::Date(DateKind::DateTimeOnly),
        "datetime" => TypeShape::Date(DateKind::DateTime),
        "file" => TypeShape::File,
        "array" => TypeShape::Array(ArrayShape::default()),
        "object" => TypeShape::Object(ObjectShape::default()),
        _ => return None,
    };
    Some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(expr: &str) -> TypeShape {
        parse_type_expression(expr, &Scope::root()).unwrap()
    }

    #[test]
    fn builtins() {
        assert!(matches!(parse("string"), TypeShape::String(_)));
        assert!(matches!(parse("integer"), TypeShape::Number(ref f) if f.integer));
        assert!(matches!(parse("null"), TypeShape::Nil));
        assert!(matches!(parse("datetime"), TypeShape::Date(DateKind::DateTime)));
    }

    #[test]
    fn references() {
        assert!(matches!(parse("User"), TypeShape::Reference(ref n) if n == "User"));
        assert!(matches!(parse("lib.Thing"), TypeShape::Reference(ref n) if n == "lib.Thing"));
    }

    #[test]
    fn arrays_nest() {
        let shape = parse("string[][]");
        assert_eq!(shape.describe(), "string[][]");
    }

    #[test]
    fn grouped_union_array() {
        let TypeShape::Array(array) = parse("(User | Message)[]") else {
            panic!("expected array");
        };
        assert!(matches!(*array.items, TypeShape::Union(ref m) if m.len() == 2));
    }

    #[test]
    fn optional_suffix() {
        let shape = parse("string?");
        assert_eq!(shape.describe(), "string | nil");
    }

    #[test]
    fn malformed_expressions() {
        for bad in ["", "string |", "(User", "User[", "a b", "#"] {
            let err = parse_type_expression(bad, &Scope::root()).unwrap_err();
            assert!(
                matches!(err, DocumentError::InvalidTypeExpression { .. }),
                "{bad:?} gave {err}"
            );
        }
    }
}
