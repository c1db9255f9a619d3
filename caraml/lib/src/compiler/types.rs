//! Type stubs.

use crate::schema::{TypeDefinition, TypeShape};

/// A named placeholder for a declared type.
///
/// Only the name is derived (upper camel case of the declared name); the
/// declared shape is kept so callers can inspect or validate against it.
#[derive(Debug, Clone)]
pub struct TypeStub {
    name: String,
    definition: TypeDefinition,
}

impl TypeStub {
    pub(crate) fn new(name: String, definition: TypeDefinition) -> Self {
        Self { name, definition }
    }

    /// Generated name, e.g. `Url` for `url`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as declared in the document (namespaced for library types).
    pub fn declared_name(&self) -> &str {
        &self.definition.name
    }

    /// `description:` text.
    pub fn description(&self) -> Option<&str> {
        self.definition.description.as_deref()
    }

    /// The declared shape.
    pub fn shape(&self) -> &TypeShape {
        &self.definition.shape
    }
}
