//! Named type declarations.

use std::collections::BTreeMap;

use super::shape::TypeShape;
use crate::error::DocumentError;

/// A named type from the document's `types:` section or a library.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// Declared name, qualified with its library namespace if any.
    pub name: String,
    /// `description:` text, if declared.
    pub description: Option<String>,
    /// The resolved shape.
    pub shape: TypeShape,
}

/// All named types of a document, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition, replacing any earlier one with the same name.
    pub fn insert(&mut self, definition: TypeDefinition) {
        self.types.insert(definition.name.clone(), definition);
    }

    /// Looks up a type by name.
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Returns `true` if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterates definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    /// Number of declared types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Ensures every reference in `shape` names a declared type.
    ///
    /// ## Errors
    ///
    /// Returns [`DocumentError::UnknownType`] for the first dangling name.
    pub fn check_references(&self, shape: &TypeShape, context: &str) -> Result<(), DocumentError> {
        match shape.references().into_iter().find(|name| !self.contains(name)) {
            Some(name) => Err(DocumentError::UnknownType {
                name: name.to_string(),
                context: context.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Checks the references of every registered type.
    ///
    /// ## Errors
    ///
    /// Returns [`DocumentError::UnknownType`] naming the referring type.
    pub fn check_all(&self) -> Result<(), DocumentError> {
        for definition in self.types.values() {
            self.check_references(&definition.shape, &definition.name)?;
        }
        Ok(())
    }
}
