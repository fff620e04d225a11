use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BebopError, Span};
use crate::utils::parse_number;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BaseType {
    Bool,
    Byte,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float32,
    Float64,
    String,
    Guid,
    Date,
}

impl BaseType {
    /// Looks up a scalar by its schema spelling. `uint8` is an alias of `byte`.
    pub fn from_name(name: &str) -> Option<BaseType> {
        Some(match name {
            "bool" => BaseType::Bool,
            "byte" | "uint8" => BaseType::Byte,
            "uint16" => BaseType::UInt16,
            "int16" => BaseType::Int16,
            "uint32" => BaseType::UInt32,
            "int32" => BaseType::Int32,
            "uint64" => BaseType::UInt64,
            "int64" => BaseType::Int64,
            "float32" => BaseType::Float32,
            "float64" => BaseType::Float64,
            "string" => BaseType::String,
            "guid" => BaseType::Guid,
            "date" => BaseType::Date,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BaseType::Bool => "bool",
            BaseType::Byte => "byte",
            BaseType::UInt16 => "uint16",
            BaseType::Int16 => "int16",
            BaseType::UInt32 => "uint32",
            BaseType::Int32 => "int32",
            BaseType::UInt64 => "uint64",
            BaseType::Int64 => "int64",
            BaseType::Float32 => "float32",
            BaseType::Float64 => "float64",
            BaseType::String => "string",
            BaseType::Guid => "guid",
            BaseType::Date => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeExpr {
    Scalar(BaseType),
    Array(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Defined(String),
}

impl TypeExpr {
    pub fn is_scalar(&self) -> bool {
        matches!(self, TypeExpr::Scalar(_))
    }

    /// Arrays and maps: the types that need shared encode/decode helpers.
    pub fn is_compound(&self) -> bool {
        matches!(self, TypeExpr::Array(_) | TypeExpr::Map(_, _))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeExpr::Scalar(base) => f.write_str(base.name()),
            TypeExpr::Array(element) => write!(f, "{}[]", element),
            TypeExpr::Map(key, value) => write!(f, "map[{}, {}]", key, value),
            TypeExpr::Defined(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DefinitionKind {
    Enum,
    Struct,
    Message,
    Union,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            DefinitionKind::Enum => "enum",
            DefinitionKind::Struct => "struct",
            DefinitionKind::Message => "message",
            DefinitionKind::Union => "union",
        })
    }
}

/// The argument of an `[opcode(...)]` attribute, kept as written until
/// validation resolves it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpcodeAttribute {
    pub value:     String,
    pub is_number: bool,
    pub span:      Span,
}

impl OpcodeAttribute {
    /// Numbers must fit in a `u32`; strings must be four ASCII characters,
    /// read as a little-endian FourCC.
    pub fn resolve(&self) -> Result<u32, String> {
        if self.is_number {
            return parse_number(&self.value)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| format!("{} is not a valid 32-bit unsigned integer", self.value));
        }
        let bytes = self.value.as_bytes();
        if bytes.len() != 4 || !self.value.is_ascii() {
            return Err(format!(
                "\"{}\" must be exactly four ASCII characters",
                self.value
            ));
        }
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:          String,
    pub type_:         TypeExpr,
    /// Enum literal for enums, wire index for messages, zero for structs.
    pub constant:      i64,
    pub deprecated:    Option<String>,
    pub documentation: Option<String>,
    pub span:          Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionBranch {
    pub discriminator: u8,
    pub definition:    Definition,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub name:          String,
    pub kind:          DefinitionKind,
    pub fields:        Vec<Field>,
    pub branches:      Vec<UnionBranch>,
    pub documentation: Option<String>,
    pub opcode:        Option<OpcodeAttribute>,
    pub read_only:     bool,
    pub span:          Span,
}

impl Definition {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn branch(&self, discriminator: u8) -> Option<&UnionBranch> {
        self.branches.iter().find(|b| b.discriminator == discriminator)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RustOptions {
    /// Wraps the generated code in `pub mod <module>`; falls back to the
    /// schema namespace.
    #[serde(default)]
    pub module: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaOptions {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub rust: RustOptions,
}

/// All definitions of a compile, union branches included, in the order the
/// parser finished them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub options:             SchemaOptions,
    definitions:             Vec<Definition>,
    #[serde(skip)]
    definition_name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Builds a schema from parsed definitions. When a name repeats, lookups
    /// see the first one; [Schema::validate] rejects the repeat.
    pub fn new(options: SchemaOptions, definitions: Vec<Definition>) -> Schema {
        let mut definition_name_to_index = HashMap::new();
        for (i, def) in definitions.iter().enumerate() {
            definition_name_to_index.entry(def.name.clone()).or_insert(i);
        }
        Schema {
            options,
            definitions,
            definition_name_to_index,
        }
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definition_name_to_index
            .get(name)
            .map(|&i| &self.definitions[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.definition_name_to_index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn validate(&self) -> Result<(), BebopError> {
        crate::verifier::validate_schema(self)
    }
}
