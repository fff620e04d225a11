//! Converts a validated [Schema] into the runtime descriptor used by the
//! dynamic [Value](brine_bebop_schema::Value) codec.

use brine_bebop_schema as runtime;

use crate::{
    error::BebopError,
    types::{BaseType, Definition, DefinitionKind, Schema, TypeExpr},
};

fn lower_type(schema: &Schema, definition: &Definition, type_: &TypeExpr) -> Result<runtime::Type, BebopError> {
    Ok(match type_ {
        TypeExpr::Scalar(base) => match base {
            BaseType::Bool => runtime::Type::Bool,
            BaseType::Byte => runtime::Type::Byte,
            BaseType::UInt16 => runtime::Type::UInt16,
            BaseType::Int16 => runtime::Type::Int16,
            BaseType::UInt32 => runtime::Type::UInt32,
            BaseType::Int32 => runtime::Type::Int32,
            BaseType::UInt64 => runtime::Type::UInt64,
            BaseType::Int64 => runtime::Type::Int64,
            BaseType::Float32 => runtime::Type::Float32,
            BaseType::Float64 => runtime::Type::Float64,
            BaseType::String => runtime::Type::String,
            BaseType::Guid => runtime::Type::Guid,
            BaseType::Date => runtime::Type::Date,
        },
        TypeExpr::Array(element) => runtime::Type::array(lower_type(schema, definition, element)?),
        TypeExpr::Map(key, value) => runtime::Type::map(
            lower_type(schema, definition, key)?,
            lower_type(schema, definition, value)?,
        ),
        TypeExpr::Defined(name) => {
            let index = schema.index_of(name).ok_or_else(|| BebopError::UnrecognizedType {
                name:       name.clone(),
                definition: definition.name.clone(),
                span:       definition.span,
            })?;
            runtime::Type::Defined(index)
        }
    })
}

fn lower_definition(schema: &Schema, definition: &Definition) -> Result<runtime::Def, BebopError> {
    let kind = match definition.kind {
        DefinitionKind::Enum => runtime::DefKind::Enum,
        DefinitionKind::Struct => runtime::DefKind::Struct,
        DefinitionKind::Message => runtime::DefKind::Message,
        DefinitionKind::Union => {
            let mut branches = Vec::with_capacity(definition.branches.len());
            for branch in &definition.branches {
                let def_index = schema.index_of(&branch.definition.name).ok_or_else(|| {
                    BebopError::UnrecognizedType {
                        name:       branch.definition.name.clone(),
                        definition: definition.name.clone(),
                        span:       branch.definition.span,
                    }
                })?;
                branches.push(runtime::Branch { discriminator: branch.discriminator, def_index });
            }
            return Ok(runtime::Def::new_union(definition.name.clone(), branches));
        }
    };

    let mut fields = Vec::with_capacity(definition.fields.len());
    for field in &definition.fields {
        // Struct constants are zero and enum/message constants are range
        // checked by the validator.
        let value = u32::try_from(field.constant).map_err(|_| BebopError::InvalidField {
            definition: definition.name.clone(),
            field:      field.name.clone(),
            reason:     format!("{} does not fit in 32 bits", field.constant),
            span:       field.span,
        })?;
        fields.push(runtime::Field {
            name: field.name.clone(),
            type_: lower_type(schema, definition, &field.type_)?,
            value,
        });
    }
    Ok(runtime::Def::new(definition.name.clone(), kind, fields))
}

/// Definitions keep their positions, so `Type::Defined(i)` in the result
/// refers to `schema.definitions()[i]`.
pub fn lower_schema(schema: &Schema) -> Result<runtime::Schema, BebopError> {
    let defs = schema
        .definitions()
        .iter()
        .map(|definition| lower_definition(schema, definition))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(runtime::Schema::new(defs))
}
