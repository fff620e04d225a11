//! brine-bebop
//!
//! The crate generated code depends on. It re-exports the runtime buffers and
//! traits, the compiler entry points, and a JSON bridge for inspecting
//! payloads without generated types.
//!
//! - `Record` trait plus `ByteBuffer`/`ByteBufferMut` (re-exported from schema)
//! - `decode_to_json` / `encode_from_json` for dynamic payloads

use std::collections::HashMap;

use serde_json::{json, Map};

pub use brine_bebop_compiler::error::{BebopError, Span};
pub use brine_bebop_compiler::{compile_files, compile_schema, compile_schema_to_rust, lower_schema, SchemaOptions};
pub use brine_bebop_schema::{ByteBuffer, ByteBufferMut, DecodeError, EncodeError, Record, Uuid, Value};

pub mod error {
    pub use brine_bebop_compiler::error::{BebopError, Span};
    pub use brine_bebop_schema::{DecodeError, EncodeError};
}

pub mod schema {
    pub use brine_bebop_compiler::types::{Definition, DefinitionKind, Field, Schema, TypeExpr};
}

pub mod runtime {
    pub use brine_bebop_schema::{Branch, Def, DefKind, Field, Schema, Type, Value};
}

use brine_bebop_compiler::types::Schema;
use brine_bebop_schema::{Def, DefKind, Type};

fn runtime_type(schema: &brine_bebop_schema::Schema, type_name: &str) -> Result<Type, BebopError> {
    schema
        .type_of(type_name)
        .ok_or_else(|| EncodeError::UnknownDefinition(type_name.to_owned()).into())
}

/// Decodes `bytes` as the named definition and renders the result as JSON.
pub fn decode_to_json(schema: &Schema, type_name: &str, bytes: &[u8]) -> Result<serde_json::Value, BebopError> {
    let runtime = lower_schema(schema)?;
    let type_ = runtime_type(&runtime, type_name)?;
    let value = Value::decode(&runtime, &type_, bytes)?;
    Ok(value_to_json(&value))
}

/// Encodes a JSON document as the named definition.
pub fn encode_from_json(schema: &Schema, type_name: &str, json: &serde_json::Value) -> Result<Vec<u8>, BebopError> {
    let runtime = lower_schema(schema)?;
    let type_ = runtime_type(&runtime, type_name)?;
    let value = json_to_value(&runtime, &type_, json)?;
    Ok(value.encode(&runtime, &type_)?)
}

/// GUIDs become hyphenated strings, maps become `[key, value]` pairs and
/// unions become `{"discriminator": n, "value": ...}`.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => json!(v),
        Value::Byte(v) => json!(v),
        Value::UInt16(v) => json!(v),
        Value::Int16(v) => json!(v),
        Value::UInt32(v) => json!(v),
        Value::Int32(v) => json!(v),
        Value::UInt64(v) => json!(v),
        Value::Int64(v) => json!(v),
        Value::Float32(v) => json!(v),
        Value::Float64(v) => json!(v),
        Value::String(v) => json!(v),
        Value::Guid(v) => json!(v.hyphenated().to_string()),
        Value::Date(ticks) => json!(ticks),
        Value::Array(values) => serde_json::Value::Array(values.iter().map(value_to_json).collect()),
        Value::Map(entries) => serde_json::Value::Array(
            entries
                .iter()
                .map(|(k, v)| json!([value_to_json(k), value_to_json(v)]))
                .collect(),
        ),
        Value::Enum(_, v) => json!(v),
        Value::Object(_, fields) => {
            let mut object = Map::new();
            for (name, field) in fields {
                object.insert(name.to_string(), value_to_json(field));
            }
            serde_json::Value::Object(object)
        }
        Value::Union(_, discriminator, inner) => json!({
            "discriminator": discriminator,
            "value": value_to_json(inner),
        }),
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn mismatch(expected: impl Into<String>, json: &serde_json::Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected: expected.into(),
        found: json_kind(json).to_owned(),
    }
}

fn as_u64(json: &serde_json::Value, expected: &str, max: u64) -> Result<u64, EncodeError> {
    json.as_u64()
        .filter(|&v| v <= max)
        .ok_or_else(|| mismatch(expected, json))
}

fn as_i64(json: &serde_json::Value, expected: &str, min: i64, max: i64) -> Result<i64, EncodeError> {
    json.as_i64()
        .filter(|&v| v >= min && v <= max)
        .ok_or_else(|| mismatch(expected, json))
}

fn as_f64(json: &serde_json::Value, expected: &str) -> Result<f64, EncodeError> {
    json.as_f64().ok_or_else(|| mismatch(expected, json))
}

/// Builds a [Value] of type `type_` from JSON in the shape [value_to_json]
/// produces.
pub fn json_to_value<'a>(
    schema: &'a brine_bebop_schema::Schema,
    type_: &Type,
    json: &serde_json::Value,
) -> Result<Value<'a>, EncodeError> {
    Ok(match type_ {
        Type::Bool => Value::Bool(json.as_bool().ok_or_else(|| mismatch("bool", json))?),
        Type::Byte => Value::Byte(as_u64(json, "byte", u8::MAX as u64)? as u8),
        Type::UInt16 => Value::UInt16(as_u64(json, "uint16", u16::MAX as u64)? as u16),
        Type::Int16 => Value::Int16(as_i64(json, "int16", i16::MIN as i64, i16::MAX as i64)? as i16),
        Type::UInt32 => Value::UInt32(as_u64(json, "uint32", u32::MAX as u64)? as u32),
        Type::Int32 => Value::Int32(as_i64(json, "int32", i32::MIN as i64, i32::MAX as i64)? as i32),
        Type::UInt64 => Value::UInt64(as_u64(json, "uint64", u64::MAX)?),
        Type::Int64 => Value::Int64(as_i64(json, "int64", i64::MIN, i64::MAX)?),
        Type::Float32 => Value::Float32(as_f64(json, "float32")? as f32),
        Type::Float64 => Value::Float64(as_f64(json, "float64")?),
        Type::String => Value::String(json.as_str().ok_or_else(|| mismatch("string", json))?.to_owned()),
        Type::Guid => {
            let text = json.as_str().ok_or_else(|| mismatch("guid", json))?;
            Value::Guid(Uuid::parse_str(text).map_err(|_| mismatch("guid", json))?)
        }
        Type::Date => Value::Date(as_i64(json, "date", i64::MIN, i64::MAX)?),

        Type::Array(element) => {
            let items = json.as_array().ok_or_else(|| mismatch("array", json))?;
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(json_to_value(schema, element, item)?);
            }
            Value::Array(values)
        }

        Type::Map(key_type, value_type) => {
            let pairs = json.as_array().ok_or_else(|| mismatch("map", json))?;
            let mut map = Value::Map(Vec::with_capacity(pairs.len()));
            for pair in pairs {
                match pair.as_array().map(Vec::as_slice) {
                    Some([k, v]) => {
                        map.insert_entry(json_to_value(schema, key_type, k)?, json_to_value(schema, value_type, v)?)
                    }
                    _ => return Err(mismatch("[key, value] pair", pair)),
                }
            }
            map
        }

        &Type::Defined(index) => {
            let def = schema
                .defs
                .get(index)
                .ok_or_else(|| EncodeError::UnknownDefinition(format!("#{}", index)))?;
            json_to_defined(schema, def, json)?
        }
    })
}

fn json_to_defined<'a>(
    schema: &'a brine_bebop_schema::Schema,
    def: &'a Def,
    json: &serde_json::Value,
) -> Result<Value<'a>, EncodeError> {
    match def.kind {
        DefKind::Enum => Ok(Value::Enum(def.name.as_str(), as_u64(json, &def.name, u32::MAX as u64)? as u32)),

        DefKind::Struct | DefKind::Message => {
            let object = json.as_object().ok_or_else(|| mismatch(def.name.as_str(), json))?;
            let mut fields = HashMap::new();
            for (name, item) in object {
                let field = def.field(name).ok_or_else(|| EncodeError::UnknownField {
                    definition: def.name.clone(),
                    field: name.clone(),
                })?;
                if def.kind == DefKind::Message && item.is_null() {
                    continue;
                }
                fields.insert(field.name.as_str(), json_to_value(schema, &field.type_, item)?);
            }
            Ok(Value::Object(def.name.as_str(), fields))
        }

        DefKind::Union => {
            let discriminator = json
                .get("discriminator")
                .and_then(serde_json::Value::as_u64)
                .filter(|&d| d <= u8::MAX as u64)
                .ok_or_else(|| mismatch(format!("{} {{discriminator, value}}", def.name), json))?
                as u8;
            let branch = def.branch(discriminator).ok_or_else(|| EncodeError::UnknownBranch {
                union: def.name.clone(),
                discriminator,
            })?;
            let inner = json.get("value").unwrap_or(&serde_json::Value::Null);
            let value = json_to_value(schema, &Type::Defined(branch.def_index), inner)?;
            Ok(Value::Union(def.name.as_str(), discriminator, Box::new(value)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        enum Mood { Calm = 0; Loud = 1; }
        struct Point { float64 x; float64 y; }
        message Track {
            1 -> string title;
            2 -> Mood mood;
            3 -> date recorded;
        }
        union Item {
            1 -> struct Marker { guid id; Point at; }
            2 -> message Note { 1 -> string text; }
        }
        struct Board {
            map[string, Item] items;
            Track[] tracks;
            int64 big;
        }
    "#;

    fn schema() -> Schema {
        compile_schema(SCHEMA, SchemaOptions::default()).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let schema = schema();
        let document = json!({
            "items": [
                ["a", {"discriminator": 1, "value": {
                    "id": "81c6987b-48b7-495f-ad01-ec20cc5f5be1",
                    "at": {"x": 1.5, "y": -2.0}
                }}],
                ["b", {"discriminator": 2, "value": {"text": "hello"}}]
            ],
            "tracks": [{"title": "Blue", "mood": 1, "recorded": 638000000000000000i64}, {}],
            "big": -9007199254740993i64
        });

        let bytes = encode_from_json(&schema, "Board", &document).unwrap();
        let decoded = decode_to_json(&schema, "Board", &bytes).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn test_point_bytes() {
        let schema = schema();
        let bytes = encode_from_json(&schema, "Point", &json!({"x": 0.5, "y": 0.0})).unwrap();
        assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0xe0, 0x3f, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode_to_json(&schema, "Point", &bytes).unwrap(), json!({"x": 0.5, "y": 0.0}));
    }

    #[test]
    fn test_message_null_fields_are_absent() {
        let schema = schema();
        let bytes = encode_from_json(&schema, "Track", &json!({"title": null, "mood": 0})).unwrap();
        assert_eq!(bytes, [6, 0, 0, 0, 2, 0, 0, 0, 0, 0]);
        assert_eq!(decode_to_json(&schema, "Track", &bytes).unwrap(), json!({"mood": 0}));
    }

    #[test]
    fn test_json_errors() {
        let schema = schema();
        let err = encode_from_json(&schema, "Point", &json!({"x": 1.0})).unwrap_err();
        assert!(matches!(err, BebopError::Encode(EncodeError::MissingField { .. })), "{:?}", err);

        let err = encode_from_json(&schema, "Point", &json!({"x": 1.0, "y": 2.0, "z": 3.0})).unwrap_err();
        assert!(matches!(err, BebopError::Encode(EncodeError::UnknownField { .. })), "{:?}", err);

        let err = encode_from_json(&schema, "Track", &json!({"mood": -1})).unwrap_err();
        assert!(matches!(err, BebopError::Encode(EncodeError::TypeMismatch { .. })), "{:?}", err);

        let err = encode_from_json(&schema, "Item", &json!({"discriminator": 9, "value": {}})).unwrap_err();
        assert!(matches!(err, BebopError::Encode(EncodeError::UnknownBranch { .. })), "{:?}", err);

        let err = encode_from_json(&schema, "Nope", &json!({})).unwrap_err();
        assert!(matches!(err, BebopError::Encode(EncodeError::UnknownDefinition(_))), "{:?}", err);
    }

    #[test]
    fn test_decode_errors_surface() {
        let schema = schema();
        let err = decode_to_json(&schema, "Point", &[0, 0, 0]).unwrap_err();
        assert!(matches!(err, BebopError::Decode(DecodeError::UnexpectedEof { .. })), "{:?}", err);
    }
}
