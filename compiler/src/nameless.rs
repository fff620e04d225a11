//! Arrays and maps that appear inline in field declarations have no name of
//! their own. Backends emit one encode/decode pair per distinct shape, keyed
//! by an identifier derived from the shape's structure rather than how it was
//! spelled (`string[]` and `array[string]` are the same type).

use std::collections::HashMap;
use std::fmt::Write;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::{Schema, TypeExpr};

/// Canonical structural description of a type, e.g. `map<string,array<@Song>>`.
pub fn canonical_description(type_: &TypeExpr) -> String {
    match type_ {
        TypeExpr::Scalar(base) => base.name().to_string(),
        TypeExpr::Array(element) => format!("array<{}>", canonical_description(element)),
        TypeExpr::Map(key, value) => format!(
            "map<{},{}>",
            canonical_description(key),
            canonical_description(value)
        ),
        TypeExpr::Defined(name) => format!("@{}", name),
    }
}

fn identifier_for(type_: &TypeExpr, description: &str) -> String {
    let prefix = match type_ {
        TypeExpr::Map(_, _) => "map",
        _ => "array",
    };
    let digest = Sha256::digest(description.as_bytes());
    let mut id = String::with_capacity(prefix.len() + 17);
    id.push_str(prefix);
    id.push('_');
    for byte in digest.iter().take(8) {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

/// Stable identifier for a compound type, or `None` for scalars and
/// defined types.
pub fn structural_id(type_: &TypeExpr) -> Option<String> {
    if !type_.is_compound() {
        return None;
    }
    Some(identifier_for(type_, &canonical_description(type_)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamelessType {
    pub id:          String,
    pub description: String,
    pub type_:       TypeExpr,
}

/// Every distinct compound type in a schema, inner types before the types
/// that contain them.
#[derive(Debug, Default)]
pub struct NamelessTypes {
    types:                Vec<NamelessType>,
    index_by_description: HashMap<String, usize>,
}

impl NamelessTypes {
    pub fn collect(schema: &Schema) -> NamelessTypes {
        let mut registry = NamelessTypes::default();
        for definition in schema.definitions() {
            for field in &definition.fields {
                registry.register(&field.type_);
            }
        }
        debug!(helpers = registry.len(), "registered nameless types");
        registry
    }

    /// Registers `type_` and any compound types nested inside it. Returns the
    /// identifier of `type_` itself.
    pub fn register(&mut self, type_: &TypeExpr) -> Option<String> {
        match type_ {
            TypeExpr::Array(element) => {
                self.register(element);
            }
            TypeExpr::Map(key, value) => {
                self.register(key);
                self.register(value);
            }
            _ => return None,
        }

        let description = canonical_description(type_);
        if let Some(&i) = self.index_by_description.get(&description) {
            return Some(self.types[i].id.clone());
        }
        let id = identifier_for(type_, &description);
        self.index_by_description.insert(description.clone(), self.types.len());
        self.types.push(NamelessType { id: id.clone(), description, type_: type_.clone() });
        Some(id)
    }

    pub fn id_of(&self, type_: &TypeExpr) -> Option<&str> {
        self.index_by_description
            .get(&canonical_description(type_))
            .map(|&i| self.types[i].id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamelessType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
