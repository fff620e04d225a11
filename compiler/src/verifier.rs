use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{
    error::BebopError,
    types::{Definition, DefinitionKind, Field, Schema, TypeExpr},
};

/// Names no definition or field may take: the schema keywords plus the
/// runtime types generated code refers to.
pub const RESERVED_IDENTIFIERS: [&str; 14] = [
    "enum",
    "struct",
    "message",
    "union",
    "readonly",
    "map",
    "array",
    "opcode",
    "deprecated",
    "ByteBuffer",
    "ByteBufferMut",
    "Record",
    "DecodeError",
    "EncodeError",
];

fn invalid_field(definition: &Definition, field: &Field, reason: &str) -> BebopError {
    BebopError::InvalidField {
        definition: definition.name.clone(),
        field:      field.name.clone(),
        reason:     reason.to_string(),
        span:       field.span,
    }
}

/// Checks every well-formedness rule over the schema, stopping at the first
/// violation. Definitions are visited in order, then their fields.
pub fn validate_schema(schema: &Schema) -> Result<(), BebopError> {
    debug!(definitions = schema.len(), "validating schema");

    let mut seen_names: HashSet<&str> = HashSet::new();
    let mut seen_opcodes: HashMap<u32, &str> = HashMap::new();

    for definition in schema.definitions() {
        if !seen_names.insert(definition.name.as_str()) {
            return Err(BebopError::MultipleDefinitions {
                name: definition.name.clone(),
                span: definition.span,
            });
        }
        if RESERVED_IDENTIFIERS.contains(&definition.name.as_str()) {
            return Err(BebopError::ReservedIdentifier {
                name: definition.name.clone(),
                span: definition.span,
            });
        }
        if definition.read_only && definition.kind != DefinitionKind::Struct {
            return Err(BebopError::InvalidReadOnlyUsage {
                name: definition.name.clone(),
                span: definition.span,
            });
        }

        if let Some(opcode) = &definition.opcode {
            if definition.kind == DefinitionKind::Enum {
                return Err(BebopError::InvalidOpcodeUsage {
                    name: definition.name.clone(),
                    span: opcode.span,
                });
            }
            let value = opcode.resolve().map_err(|reason| BebopError::InvalidOpcodeValue {
                name: definition.name.clone(),
                reason,
                span: opcode.span,
            })?;
            if seen_opcodes.insert(value, definition.name.as_str()).is_some() {
                return Err(BebopError::DuplicateOpcode {
                    name:   definition.name.clone(),
                    opcode: value,
                    span:   opcode.span,
                });
            }
        }

        match definition.kind {
            DefinitionKind::Union => validate_union(definition)?,
            _ => validate_fields(schema, definition)?,
        }
    }

    debug!("schema is valid");
    Ok(())
}

fn validate_fields(schema: &Schema, definition: &Definition) -> Result<(), BebopError> {
    let mut seen_constants: HashSet<i64> = HashSet::new();

    for field in &definition.fields {
        if RESERVED_IDENTIFIERS.contains(&field.name.as_str()) {
            return Err(BebopError::ReservedIdentifier {
                name: field.name.clone(),
                span: field.span,
            });
        }
        if field.deprecated.is_some() && definition.kind == DefinitionKind::Struct {
            return Err(BebopError::InvalidDeprecatedUsage {
                definition: definition.name.clone(),
                field:      field.name.clone(),
                span:       field.span,
            });
        }

        validate_type(schema, definition, field, &field.type_)?;

        match definition.kind {
            DefinitionKind::Enum => {
                if field.constant < 0 {
                    return Err(invalid_field(definition, field, "Enum values must start at 0"));
                }
                if field.constant > u32::MAX as i64 {
                    return Err(invalid_field(definition, field, "Enum values must fit in 32 bits"));
                }
                if !seen_constants.insert(field.constant) {
                    return Err(invalid_field(definition, field, "Enum value must be unique"));
                }
            }
            DefinitionKind::Struct => {
                if matches!(&field.type_, TypeExpr::Defined(name) if *name == definition.name) {
                    return Err(invalid_field(definition, field, "Struct contains itself"));
                }
            }
            DefinitionKind::Message => {
                if !seen_constants.insert(field.constant) {
                    return Err(invalid_field(definition, field, "Message index must be unique"));
                }
                if field.constant <= 0 {
                    return Err(invalid_field(definition, field, "Message member index must start at 1"));
                }
                if field.constant > definition.fields.len() as i64 {
                    return Err(invalid_field(definition, field, "Message index is greater than field count"));
                }
                if field.constant > 255 {
                    return Err(invalid_field(definition, field, "Message index must fit in one byte"));
                }
            }
            DefinitionKind::Union => {}
        }
    }
    Ok(())
}

/// Map keys must be scalar and every defined name must exist, at any depth.
fn validate_type(
    schema: &Schema,
    definition: &Definition,
    field: &Field,
    type_: &TypeExpr,
) -> Result<(), BebopError> {
    match type_ {
        TypeExpr::Scalar(_) => Ok(()),
        TypeExpr::Array(element) => validate_type(schema, definition, field, element),
        TypeExpr::Map(key, value) => {
            if !key.is_scalar() {
                return Err(BebopError::InvalidMapKeyType {
                    key:  key.to_string(),
                    span: field.span,
                });
            }
            validate_type(schema, definition, field, value)
        }
        TypeExpr::Defined(name) => match schema.get(name) {
            Some(_) => Ok(()),
            None => Err(BebopError::UnrecognizedType {
                name:       name.clone(),
                definition: definition.name.clone(),
                span:       field.span,
            }),
        },
    }
}

fn validate_union(definition: &Definition) -> Result<(), BebopError> {
    let mut seen: HashSet<u8> = HashSet::new();
    for branch in &definition.branches {
        let branch_def = &branch.definition;
        if !matches!(branch_def.kind, DefinitionKind::Struct | DefinitionKind::Message) {
            return Err(BebopError::InvalidUnionBranch {
                name: branch_def.name.clone(),
                span: branch_def.span,
            });
        }
        let reason = if branch.discriminator == 0 {
            "Union discriminators must start at 1"
        } else if !seen.insert(branch.discriminator) {
            "Union discriminator must be unique"
        } else {
            continue;
        };
        return Err(BebopError::InvalidField {
            definition: definition.name.clone(),
            field:      branch_def.name.clone(),
            reason:     reason.to_string(),
            span:       branch_def.span,
        });
    }
    // Branch definitions are top-level entries too; their fields are checked
    // when `validate_schema` reaches them.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_schema;
    use crate::error::Span;
    use crate::types::{BaseType, SchemaOptions};

    fn check(text: &str) -> Result<(), BebopError> {
        compile_schema(text, SchemaOptions::default()).map(|_| ())
    }

    fn reason(err: BebopError) -> String {
        match err {
            BebopError::InvalidField { reason, .. } => reason,
            other => panic!("expected InvalidField but got {:?}", other),
        }
    }

    #[test]
    fn test_valid_schema() {
        let text = r#"
            enum Instrument { Sax = 0; Trumpet = 1; Clarinet = 2; }
            readonly struct Musician { string name; Instrument plays; }
            [opcode(0x12345678)]
            message Song { 1 -> string title; 2 -> uint16 year; 3 -> Musician[] performers; }
            [opcode("JAZZ")]
            union Album { 1 -> struct StudioAlbum { Song[] tracks; } 2 -> message LiveAlbum { 1 -> Song[] tracks; } }
        "#;
        check(text).unwrap();
    }

    #[test]
    fn test_duplicate_enum_constant() {
        let err = check("enum Color { Red = 0; Blue = 1; Green = 1; }").unwrap_err();
        match &err {
            BebopError::InvalidField { definition, field, .. } => {
                assert_eq!(definition, "Color");
                assert_eq!(field, "Green");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(reason(err), "Enum value must be unique");
    }

    #[test]
    fn test_negative_enum_constant() {
        let err = check("enum Color { Red = -1; }").unwrap_err();
        assert_eq!(reason(err), "Enum values must start at 0");
    }

    #[test]
    fn test_message_indices() {
        let err = check("message M { 0 -> int32 a; }").unwrap_err();
        assert_eq!(reason(err), "Message member index must start at 1");
        let err = check("message M { 1 -> int32 a; 1 -> int32 b; }").unwrap_err();
        assert_eq!(reason(err), "Message index must be unique");
        let err = check("message M { 1 -> int32 a; 3 -> int32 b; }").unwrap_err();
        assert_eq!(reason(err), "Message index is greater than field count");
    }

    #[test]
    fn test_message_index_fits_in_byte() {
        let fields: String = (1..=256).map(|i| format!("{} -> int32 f{}; ", i, i)).collect();
        let err = check(&format!("message M {{ {}}}", fields)).unwrap_err();
        assert_eq!(reason(err), "Message index must fit in one byte");

        let fields: String = (1..=255).map(|i| format!("{} -> int32 f{}; ", i, i)).collect();
        check(&format!("message M {{ {}}}", fields)).unwrap();
    }

    #[test]
    fn test_struct_contains_itself() {
        let err = check("struct S { int32 a; S inner; }").unwrap_err();
        assert_eq!(reason(err), "Struct contains itself");
        check("struct S { S[] children; }").unwrap();
    }

    #[test]
    fn test_readonly_only_on_structs() {
        let err = check("readonly message M {}").unwrap_err();
        assert!(matches!(err, BebopError::InvalidReadOnlyUsage { .. }), "{:?}", err);
    }

    #[test]
    fn test_opcode_rules() {
        let err = check("[opcode(1)] enum E { A = 0; }").unwrap_err();
        assert!(matches!(err, BebopError::InvalidOpcodeUsage { .. }), "{:?}", err);

        let err = check(r#"[opcode("TOOLONG")] struct A {}"#).unwrap_err();
        assert!(matches!(err, BebopError::InvalidOpcodeValue { .. }), "{:?}", err);

        let err = check(r#"[opcode(0x5a5a414a)] struct A {} [opcode("JAZZ")] struct B {}"#).unwrap_err();
        match err {
            BebopError::DuplicateOpcode { name, opcode, .. } => {
                assert_eq!(name, "B");
                assert_eq!(opcode, 0x5a5a_414a);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_deprecated_struct_field() {
        let err = check(r#"struct S { [deprecated("old")] int32 a; }"#).unwrap_err();
        assert!(matches!(err, BebopError::InvalidDeprecatedUsage { .. }), "{:?}", err);
        check(r#"message M { [deprecated("old")] 1 -> int32 a; }"#).unwrap();
    }

    #[test]
    fn test_reserved_identifiers() {
        let err = check("struct ByteBuffer {}").unwrap_err();
        assert!(matches!(err, BebopError::ReservedIdentifier { ref name, .. } if name == "ByteBuffer"), "{:?}", err);
        let err = check("struct S { int32 Record; }").unwrap_err();
        assert!(matches!(err, BebopError::ReservedIdentifier { ref name, .. } if name == "Record"), "{:?}", err);
    }

    #[test]
    fn test_union_discriminators() {
        let err = check("union U { 0 -> struct A {} }").unwrap_err();
        assert_eq!(reason(err), "Union discriminators must start at 1");
        let err = check("union U { 1 -> struct A {} 1 -> struct B {} }").unwrap_err();
        assert_eq!(reason(err), "Union discriminator must be unique");
    }

    #[test]
    fn test_duplicate_names_in_hand_built_schema() {
        let def = |name: &str| Definition {
            name:          name.to_string(),
            kind:          DefinitionKind::Struct,
            fields:        Vec::new(),
            branches:      Vec::new(),
            documentation: None,
            opcode:        None,
            read_only:     false,
            span:          Span::default(),
        };
        let schema = Schema::new(SchemaOptions::default(), vec![def("A"), def("A")]);
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, BebopError::MultipleDefinitions { .. }), "{:?}", err);
    }

    #[test]
    fn test_map_key_in_hand_built_schema() {
        let mut bad = Definition {
            name:          "S".to_string(),
            kind:          DefinitionKind::Struct,
            fields:        Vec::new(),
            branches:      Vec::new(),
            documentation: None,
            opcode:        None,
            read_only:     false,
            span:          Span::default(),
        };
        bad.fields.push(Field {
            name:          "m".to_string(),
            type_:         TypeExpr::Map(
                Box::new(TypeExpr::Array(Box::new(TypeExpr::Scalar(BaseType::Int32)))),
                Box::new(TypeExpr::Scalar(BaseType::String)),
            ),
            constant:      0,
            deprecated:    None,
            documentation: None,
            span:          Span::new(1, 1),
        });
        let schema = Schema::new(SchemaOptions::default(), vec![bad]);
        let err = schema.validate().unwrap_err();
        assert!(matches!(err, BebopError::InvalidMapKeyType { .. }), "{:?}", err);
    }
}
