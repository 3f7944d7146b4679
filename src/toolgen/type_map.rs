//! Type mapping between declared parameter types and JSON Schema type names.
//!
//! Tool-calling APIs only understand a small, fixed vocabulary of JSON
//! Schema types. Every declared parameter type must resolve to exactly one
//! of them, and the mapping must be total: a declared type the table does
//! not recognize falls back to `string` instead of failing, so loosely
//! typed tools stay usable by the model.

use serde::{Deserialize, Serialize};

/// The closed set of JSON Schema type names a tool parameter can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl TypeTag {
    /// The JSON Schema spelling of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Array => "array",
            TypeTag::Object => "object",
            TypeTag::Null => "null",
        }
    }
}

/// A parameter type as declared at registration time.
///
/// This is the "language-native" side of the mapping. Tools declare their
/// parameters with these instead of relying on runtime reflection; `Named`
/// covers domain types (instance handles, element lists, ...) that have no
/// direct JSON Schema equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    Str,
    Int,
    Float,
    Bool,
    List,
    Map,
    Unit,
    Named(String),
}

impl DeclaredType {
    /// Human-readable spelling used when rendering signature text.
    pub fn label(&self) -> &str {
        match self {
            DeclaredType::Str => "str",
            DeclaredType::Int => "int",
            DeclaredType::Float => "float",
            DeclaredType::Bool => "bool",
            DeclaredType::List => "list",
            DeclaredType::Map => "map",
            DeclaredType::Unit => "()",
            DeclaredType::Named(name) => name,
        }
    }
}

/// Maps a declared type to its JSON Schema tag.
///
/// Pure and total: unrecognized (`Named`) types resolve to `string` by
/// policy rather than surfacing an error.
pub fn map_type(ty: &DeclaredType) -> TypeTag {
    match ty {
        DeclaredType::Str => TypeTag::String,
        DeclaredType::Int => TypeTag::Integer,
        DeclaredType::Float => TypeTag::Number,
        DeclaredType::Bool => TypeTag::Boolean,
        DeclaredType::List => TypeTag::Array,
        DeclaredType::Map => TypeTag::Object,
        DeclaredType::Unit => TypeTag::Null,
        DeclaredType::Named(_) => TypeTag::String,
    }
}
