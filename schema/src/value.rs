use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use uuid::Uuid;

use crate::bb::{ByteBuffer, ByteBufferMut};
use crate::error::{DecodeError, EncodeError};
use crate::schema::{Def, DefKind, Schema, Type};

/// A dynamically-typed value that can be encoded and decoded with nothing
/// more than a runtime [Schema]. Definition and field names borrow from the
/// schema.
///
/// Structs and messages are both represented as [Object](#variant.Object).
/// A struct object must hold every declared field; a message object holds
/// only the fields that are present.
#[derive(Clone, PartialEq)]
pub enum Value<'a> {
    Bool(bool),
    Byte(u8),
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    UInt64(u64),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Guid(Uuid),
    Date(i64),
    Array(Vec<Value<'a>>),
    Map(Vec<(Value<'a>, Value<'a>)>),
    Enum(&'a str, u32),
    Object(&'a str, HashMap<&'a str, Value<'a>>),
    Union(&'a str, u8, Box<Value<'a>>),
}

impl<'a> Value<'a> {
    /// A convenience method to extract the length out of an array or map.
    /// Returns 0 for every other value.
    pub fn len(&self) -> usize {
        match *self {
            Value::Array(ref values) => values.len(),
            Value::Map(ref entries) => entries.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to append to an array value. Does nothing for
    /// other values.
    pub fn push(&mut self, value: Value<'a>) {
        if let Value::Array(ref mut values) = *self {
            values.push(value);
        }
    }

    /// Inserts a map entry, replacing the value of an equal key in place.
    /// Does nothing for values that aren't maps.
    pub fn insert_entry(&mut self, key: Value<'a>, value: Value<'a>) {
        if let Value::Map(ref mut entries) = *self {
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// A convenience method to extract a field out of an [Object](#variant.Object).
    /// Returns `None` for other value kinds or if the field isn't present.
    pub fn get(&self, name: &str) -> Option<&Value<'a>> {
        match *self {
            Value::Object(_, ref fields) => fields.get(name),
            _ => None,
        }
    }

    /// A convenience method to update a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn set(&mut self, name: &'a str, value: Value<'a>) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.insert(name, value);
        }
    }

    /// A convenience method to remove a field on an [Object](#variant.Object).
    /// Does nothing for other value kinds.
    pub fn remove(&mut self, name: &'a str) {
        if let Value::Object(_, ref mut fields) = *self {
            fields.remove(name);
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match *self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::UInt16(_) => "uint16",
            Value::Int16(_) => "int16",
            Value::UInt32(_) => "uint32",
            Value::Int32(_) => "int32",
            Value::UInt64(_) => "uint64",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Guid(_) => "guid",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Enum(..) => "enum",
            Value::Object(..) => "object",
            Value::Union(..) => "union",
        }
    }

    /// Decodes the type specified by `type_` and `schema` from `bytes`.
    pub fn decode(schema: &'a Schema, type_: &Type, bytes: &[u8]) -> Result<Value<'a>, DecodeError> {
        Value::decode_bb(schema, type_, &mut ByteBuffer::new(bytes))
    }

    /// Encodes this value as `type_` and returns the bytes.
    pub fn encode(&self, schema: &Schema, type_: &Type) -> Result<Vec<u8>, EncodeError> {
        let mut bb = ByteBufferMut::new();
        self.encode_bb(schema, type_, &mut bb)?;
        Ok(bb.data())
    }

    /// Decodes the type specified by `type_` and `schema` from `bb` starting
    /// at the current index. After this function returns, the current index
    /// will be advanced by the amount of data that was successfully parsed.
    /// This is mainly useful as a helper routine for
    /// [decode](#method.decode), which you probably want to use instead.
    pub fn decode_bb(
        schema: &'a Schema,
        type_: &Type,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, DecodeError> {
        match *type_ {
            Type::Bool => Ok(Value::Bool(bb.read_bool()?)),
            Type::Byte => Ok(Value::Byte(bb.read_byte()?)),
            Type::UInt16 => Ok(Value::UInt16(bb.read_u16()?)),
            Type::Int16 => Ok(Value::Int16(bb.read_i16()?)),
            Type::UInt32 => Ok(Value::UInt32(bb.read_u32()?)),
            Type::Int32 => Ok(Value::Int32(bb.read_i32()?)),
            Type::UInt64 => Ok(Value::UInt64(bb.read_u64()?)),
            Type::Int64 => Ok(Value::Int64(bb.read_i64()?)),
            Type::Float32 => Ok(Value::Float32(bb.read_f32()?)),
            Type::Float64 => Ok(Value::Float64(bb.read_f64()?)),
            Type::String => Ok(Value::String(bb.read_string()?.to_owned())),
            Type::Guid => Ok(Value::Guid(bb.read_guid()?)),
            Type::Date => Ok(Value::Date(bb.read_date()?)),

            Type::Array(ref element) => {
                let len = bb.read_length()?;
                let mut array = Vec::with_capacity(len.min(bb.remaining()));
                for _ in 0..len {
                    array.push(Value::decode_bb(schema, element, bb)?);
                }
                Ok(Value::Array(array))
            }

            Type::Map(ref key, ref value) => {
                let len = bb.read_length()?;
                let mut map = Value::Map(Vec::with_capacity(len.min(bb.remaining())));
                for _ in 0..len {
                    let k = Value::decode_bb(schema, key, bb)?;
                    let v = Value::decode_bb(schema, value, bb)?;
                    map.insert_entry(k, v);
                }
                Ok(map)
            }

            Type::Defined(index) => {
                let def = schema
                    .defs
                    .get(index)
                    .ok_or(DecodeError::UnknownDefinition(index))?;

                match def.kind {
                    DefKind::Enum => Ok(Value::Enum(def.name.as_str(), bb.read_u32()?)),

                    DefKind::Struct => {
                        let mut fields = HashMap::new();
                        for field in &def.fields {
                            fields.insert(
                                field.name.as_str(),
                                Value::decode_bb(schema, &field.type_, bb)?,
                            );
                        }
                        Ok(Value::Object(def.name.as_str(), fields))
                    }

                    DefKind::Message => Value::decode_message(schema, def, bb),

                    DefKind::Union => {
                        let discriminator = bb.read_byte()?;
                        let branch = def.branch(discriminator).ok_or_else(|| {
                            DecodeError::UnknownDiscriminator {
                                union: def.name.clone(),
                                discriminator,
                            }
                        })?;
                        let value = Value::decode_bb(schema, &Type::Defined(branch.def_index), bb)?;
                        Ok(Value::Union(def.name.as_str(), discriminator, Box::new(value)))
                    }
                }
            }
        }
    }

    fn decode_message(
        schema: &'a Schema,
        def: &'a Def,
        bb: &mut ByteBuffer,
    ) -> Result<Value<'a>, DecodeError> {
        let length = bb.read_message_length()?;
        let start = bb.index();
        let end = start + length;

        let mut fields = HashMap::new();
        loop {
            let tag = bb.read_byte()?;
            if tag == 0 {
                bb.check_message_body(start, length)?;
                return Ok(Value::Object(def.name.as_str(), fields));
            }
            match def.field_value_to_index.get(&(tag as u32)) {
                Some(&index) => {
                    let field = &def.fields[index];
                    let value = Value::decode_bb(schema, &field.type_, bb)?;
                    fields.insert(field.name.as_str(), value);
                    bb.check_message_body(start, length)?;
                }
                // An unknown tag ends the body: nothing after it can be
                // located, so skip to the declared end and keep what was read.
                None => {
                    bb.seek(end)?;
                    return Ok(Value::Object(def.name.as_str(), fields));
                }
            }
        }
    }

    /// Encodes the current value as `type_` to the end of `bb` using the
    /// provided `schema`. This is mainly useful as a helper routine for
    /// [encode](#method.encode), which you probably want to use instead.
    pub fn encode_bb(
        &self,
        schema: &Schema,
        type_: &Type,
        bb: &mut ByteBufferMut,
    ) -> Result<(), EncodeError> {
        match (type_, self) {
            (Type::Bool, &Value::Bool(value)) => bb.write_bool(value),
            (Type::Byte, &Value::Byte(value)) => bb.write_byte(value),
            (Type::UInt16, &Value::UInt16(value)) => bb.write_u16(value),
            (Type::Int16, &Value::Int16(value)) => bb.write_i16(value),
            (Type::UInt32, &Value::UInt32(value)) => bb.write_u32(value),
            (Type::Int32, &Value::Int32(value)) => bb.write_i32(value),
            (Type::UInt64, &Value::UInt64(value)) => bb.write_u64(value),
            (Type::Int64, &Value::Int64(value)) => bb.write_i64(value),
            (Type::Float32, &Value::Float32(value)) => bb.write_f32(value),
            (Type::Float64, &Value::Float64(value)) => bb.write_f64(value),
            (Type::String, Value::String(value)) => bb.write_string(value)?,
            (Type::Guid, Value::Guid(value)) => bb.write_guid(value),
            (Type::Date, &Value::Date(ticks)) => bb.write_date(ticks),

            (Type::Array(element), Value::Array(values)) => {
                bb.write_length(values.len())?;
                for value in values {
                    value.encode_bb(schema, element, bb)?;
                }
            }

            (Type::Map(key_type, value_type), Value::Map(entries)) => {
                bb.write_length(entries.len())?;
                for (key, value) in entries {
                    key.encode_bb(schema, key_type, bb)?;
                    value.encode_bb(schema, value_type, bb)?;
                }
            }

            (&Type::Defined(index), _) => {
                let def = schema
                    .defs
                    .get(index)
                    .ok_or_else(|| EncodeError::UnknownDefinition(format!("#{}", index)))?;
                self.encode_defined(schema, def, bb)?;
            }

            (expected, found) => {
                return Err(EncodeError::TypeMismatch {
                    expected: format!("{:?}", expected),
                    found: found.kind_name().to_owned(),
                })
            }
        }
        Ok(())
    }

    fn encode_defined(&self, schema: &Schema, def: &Def, bb: &mut ByteBufferMut) -> Result<(), EncodeError> {
        let mismatch = || EncodeError::TypeMismatch {
            expected: def.name.clone(),
            found: match *self {
                Value::Enum(name, _) | Value::Object(name, _) | Value::Union(name, ..) => name.to_owned(),
                _ => self.kind_name().to_owned(),
            },
        };

        match (def.kind, self) {
            (DefKind::Enum, &Value::Enum(name, value)) if name == def.name => bb.write_u32(value),

            (DefKind::Struct, Value::Object(name, fields)) if *name == def.name => {
                check_known_fields(def, fields)?;
                for field in &def.fields {
                    let value = fields.get(field.name.as_str()).ok_or_else(|| EncodeError::MissingField {
                        definition: def.name.clone(),
                        field: field.name.clone(),
                    })?;
                    value.encode_bb(schema, &field.type_, bb)?;
                }
            }

            (DefKind::Message, Value::Object(name, fields)) if *name == def.name => {
                check_known_fields(def, fields)?;
                let position = bb.reserve_message_length();
                let start = bb.len();
                // Declaration order keeps the output independent of map order.
                for field in &def.fields {
                    if let Some(value) = fields.get(field.name.as_str()) {
                        let tag = u8::try_from(field.value).map_err(|_| EncodeError::TagOverflow {
                            definition: def.name.clone(),
                            field: field.name.clone(),
                            index: field.value,
                        })?;
                        bb.write_byte(tag);
                        value.encode_bb(schema, &field.type_, bb)?;
                    }
                }
                bb.write_byte(0);
                let length = bb.len() - start;
                bb.fill_message_length(position, length)?;
            }

            (DefKind::Union, Value::Union(name, discriminator, value)) if *name == def.name => {
                let branch = def.branch(*discriminator).ok_or_else(|| EncodeError::UnknownBranch {
                    union: def.name.clone(),
                    discriminator: *discriminator,
                })?;
                bb.write_byte(*discriminator);
                value.encode_bb(schema, &Type::Defined(branch.def_index), bb)?;
            }

            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

fn check_known_fields(def: &Def, fields: &HashMap<&str, Value>) -> Result<(), EncodeError> {
    match fields.keys().find(|name| def.field(name).is_none()) {
        Some(name) => Err(EncodeError::UnknownField {
            definition: def.name.clone(),
            field: name.to_string(),
        }),
        None => Ok(()),
    }
}

impl<'a> Index<usize> for Value<'a> {
    type Output = Value<'a>;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't an [Array](#variant.Array) or if the
    /// provided index is out of bounds.
    fn index(&self, index: usize) -> &Value<'a> {
        match *self {
            Value::Array(ref values) => &values[index],
            _ => panic!("cannot index into a {}", self.kind_name()),
        }
    }
}

impl<'a> fmt::Debug for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::Byte(value) => value.fmt(f),
            Value::UInt16(value) => value.fmt(f),
            Value::Int16(value) => value.fmt(f),
            Value::UInt32(value) => value.fmt(f),
            Value::Int32(value) => value.fmt(f),
            Value::UInt64(value) => value.fmt(f),
            Value::Int64(value) => value.fmt(f),
            Value::Float32(value) => value.fmt(f),
            Value::Float64(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Guid(ref value) => write!(f, "{}", value),
            Value::Date(ticks) => write!(f, "Date({})", ticks),
            Value::Array(ref values) => values.fmt(f),
            Value::Enum(name, value) => write!(f, "{}({})", name, value),
            Value::Union(name, discriminator, ref value) => {
                write!(f, "{}#{}({:?})", name, discriminator, value)
            }

            Value::Map(ref entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {:?}", key, value)?;
                }
                write!(f, "}}")
            }

            Value::Object(name, ref fields) => {
                let mut keys: Vec<_> = fields.keys().collect();
                keys.sort();
                write!(f, "{} {{", name)?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {:?}", key, fields[key])?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Branch, Def, Field};

    fn field(name: &str, type_: Type, value: u32) -> Field {
        Field {
            name: name.to_owned(),
            type_,
            value,
        }
    }

    fn object<'a>(name: &'a str, entries: Vec<(&'a str, Value<'a>)>) -> Value<'a> {
        Value::Object(name, entries.into_iter().collect())
    }

    /// 0 Color, 1 Point, 2 Person, 3 Shape, 4 Circle, 5 Label, 6 Holder
    fn test_schema() -> Schema {
        Schema::new(vec![
            Def::new(
                "Color".to_owned(),
                DefKind::Enum,
                vec![
                    field("Red", Type::UInt32, 0),
                    field("Blue", Type::UInt32, 1),
                ],
            ),
            Def::new(
                "Point".to_owned(),
                DefKind::Struct,
                vec![
                    field("x", Type::Float32, 0),
                    field("y", Type::Float32, 0),
                ],
            ),
            Def::new(
                "Person".to_owned(),
                DefKind::Message,
                vec![
                    field("name", Type::String, 1),
                    field("age", Type::Int32, 2),
                ],
            ),
            Def::new_union(
                "Shape".to_owned(),
                vec![
                    Branch { discriminator: 1, def_index: 4 },
                    Branch { discriminator: 2, def_index: 5 },
                ],
            ),
            Def::new(
                "Circle".to_owned(),
                DefKind::Struct,
                vec![field("radius", Type::Float64, 0)],
            ),
            Def::new(
                "Label".to_owned(),
                DefKind::Message,
                vec![field("text", Type::String, 1)],
            ),
            Def::new(
                "Holder".to_owned(),
                DefKind::Struct,
                vec![
                    field("color", Type::Defined(0), 0),
                    field("origin", Type::Defined(1), 0),
                    field("owner", Type::Defined(2), 0),
                    field("tags", Type::map(Type::String, Type::array(Type::Int16)), 0),
                ],
            ),
        ])
    }

    #[test]
    fn value_basic() {
        let mut value = Value::Array(vec![]);
        assert_eq!(value.len(), 0);
        value.push(Value::Int32(123));
        value.push(Value::String("abc".to_owned()));
        assert_eq!(value.len(), 2);
        assert_eq!(value[0], Value::Int32(123));
        assert_eq!(value[1], Value::String("abc".to_owned()));

        let mut person = object("Person", vec![]);
        assert_eq!(person.get("name"), None);
        person.set("name", Value::String("Ada".to_owned()));
        assert_eq!(person.get("name"), Some(&Value::String("Ada".to_owned())));
        person.remove("name");
        assert_eq!(person.get("name"), None);

        assert_eq!(
            format!("{:?}", object("P", vec![("b", Value::Bool(true)), ("a", Value::Byte(1))])),
            "P {a: 1, b: true}"
        );
    }

    #[test]
    fn struct_is_fixed_layout() {
        let schema = test_schema();
        let point = object(
            "Point",
            vec![("x", Value::Float32(1.0)), ("y", Value::Float32(2.0))],
        );
        let bytes = point.encode(&schema, &Type::Defined(1)).unwrap();
        assert_eq!(bytes, [0, 0, 0x80, 0x3f, 0, 0, 0, 0x40]);
        assert_eq!(Value::decode(&schema, &Type::Defined(1), &bytes), Ok(point));
    }

    #[test]
    fn struct_encoding_ignores_insertion_order() {
        let schema = test_schema();
        let mut forward = HashMap::new();
        forward.insert("x", Value::Float32(3.5));
        forward.insert("y", Value::Float32(-1.0));
        let mut backward = HashMap::new();
        backward.insert("y", Value::Float32(-1.0));
        backward.insert("x", Value::Float32(3.5));
        assert_eq!(
            Value::Object("Point", forward).encode(&schema, &Type::Defined(1)),
            Value::Object("Point", backward).encode(&schema, &Type::Defined(1))
        );
    }

    #[test]
    fn struct_requires_every_field() {
        let schema = test_schema();
        let point = object("Point", vec![("x", Value::Float32(1.0))]);
        assert_eq!(
            point.encode(&schema, &Type::Defined(1)),
            Err(EncodeError::MissingField {
                definition: "Point".to_owned(),
                field: "y".to_owned()
            })
        );
    }

    #[test]
    fn message_omits_absent_fields() {
        let schema = test_schema();
        let person = object("Person", vec![("name", Value::String("Al".to_owned()))]);
        let bytes = person.encode(&schema, &Type::Defined(2)).unwrap();
        // length, tag 1, "Al", sentinel
        assert_eq!(bytes, [8, 0, 0, 0, 1, 2, 0, 0, 0, b'A', b'l', 0]);
        assert_eq!(bytes[0] as usize, bytes.len() - 4);
        assert_eq!(Value::decode(&schema, &Type::Defined(2), &bytes), Ok(person));
    }

    #[test]
    fn message_fields_are_order_independent_on_decode() {
        let schema = test_schema();
        // tag 2 before tag 1
        let bytes = [12, 0, 0, 0, 2, 7, 0, 0, 0, 1, 1, 0, 0, 0, b'Z', 0];
        let expected = object(
            "Person",
            vec![("name", Value::String("Z".to_owned())), ("age", Value::Int32(7))],
        );
        assert_eq!(Value::decode(&schema, &Type::Defined(2), &bytes), Ok(expected));
    }

    #[test]
    fn message_unknown_tag_stops_reading_and_skips_to_body_end() {
        let schema = test_schema();
        // The body carries tag 1, then an unknown tag 9 with a payload, then
        // tag 2. Everything from tag 9 on is skipped and reading resumes
        // right after the declared body.
        let bytes = [
            15, 0, 0, 0, // length
            1, 1, 0, 0, 0, b'Q', // name = "Q"
            9, 0xde, 0xad, // unknown field
            2, 5, 0, 0, 0, // age = 5, never reached
            0,    // sentinel
            0xff, // first byte after the body
        ];
        let mut bb = ByteBuffer::new(&bytes);
        let decoded = Value::decode_bb(&schema, &Type::Defined(2), &mut bb).unwrap();
        assert_eq!(decoded, object("Person", vec![("name", Value::String("Q".to_owned()))]));
        assert_eq!(bb.index(), 4 + 15);
        assert_eq!(bb.read_byte(), Ok(0xff));
    }

    #[test]
    fn message_body_overrun_is_an_error() {
        let schema = test_schema();
        // Declared length 3, but the age field alone needs 5 bytes.
        let bytes = [3, 0, 0, 0, 2, 1, 0, 0, 0, 0];
        assert_eq!(
            Value::decode(&schema, &Type::Defined(2), &bytes),
            Err(DecodeError::MessageBodyOverrun { length: 3, consumed: 5 })
        );
    }

    #[test]
    fn enum_is_raw_u32() {
        let schema = test_schema();
        let bytes = Value::Enum("Color", 1).encode(&schema, &Type::Defined(0)).unwrap();
        assert_eq!(bytes, [1, 0, 0, 0]);
        // Constants outside the declared set still decode.
        assert_eq!(
            Value::decode(&schema, &Type::Defined(0), &[7, 0, 0, 0]),
            Ok(Value::Enum("Color", 7))
        );
    }

    #[test]
    fn union_writes_discriminator_then_branch() {
        let schema = test_schema();
        let circle = Value::Union(
            "Shape",
            1,
            Box::new(object("Circle", vec![("radius", Value::Float64(2.0))])),
        );
        let bytes = circle.encode(&schema, &Type::Defined(3)).unwrap();
        assert_eq!(bytes, [1, 0, 0, 0, 0, 0, 0, 0, 0x40]);
        assert_eq!(Value::decode(&schema, &Type::Defined(3), &bytes), Ok(circle));

        let label = Value::Union(
            "Shape",
            2,
            Box::new(object("Label", vec![("text", Value::String("hi".to_owned()))])),
        );
        let bytes = label.encode(&schema, &Type::Defined(3)).unwrap();
        assert_eq!(bytes, [2, 8, 0, 0, 0, 1, 2, 0, 0, 0, b'h', b'i', 0]);
        assert_eq!(Value::decode(&schema, &Type::Defined(3), &bytes), Ok(label));

        assert_eq!(
            Value::decode(&schema, &Type::Defined(3), &[3]),
            Err(DecodeError::UnknownDiscriminator {
                union: "Shape".to_owned(),
                discriminator: 3
            })
        );
    }

    #[test]
    fn map_decode_overwrites_duplicate_keys() {
        let schema = test_schema();
        let type_ = Type::map(Type::Byte, Type::Bool);
        let bytes = [3, 0, 0, 0, 1, 0, 2, 1, 1, 1];
        assert_eq!(
            Value::decode(&schema, &type_, &bytes),
            Ok(Value::Map(vec![
                (Value::Byte(1), Value::Bool(true)),
                (Value::Byte(2), Value::Bool(true)),
            ]))
        );
    }

    #[test]
    fn nested_round_trip() {
        let schema = test_schema();
        let holder = object(
            "Holder",
            vec![
                ("color", Value::Enum("Color", 1)),
                (
                    "origin",
                    object("Point", vec![("x", Value::Float32(0.5)), ("y", Value::Float32(-0.5))]),
                ),
                ("owner", object("Person", vec![("age", Value::Int32(42))])),
                (
                    "tags",
                    Value::Map(vec![
                        (
                            Value::String("a".to_owned()),
                            Value::Array(vec![Value::Int16(1), Value::Int16(-2)]),
                        ),
                        (Value::String("b".to_owned()), Value::Array(vec![])),
                    ]),
                ),
            ],
        );
        let bytes = holder.encode(&schema, &Type::Defined(6)).unwrap();
        assert_eq!(Value::decode(&schema, &Type::Defined(6), &bytes), Ok(holder));

        let guid = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        let scalars = Value::Array(vec![Value::Guid(guid), Value::Guid(Uuid::nil())]);
        let bytes = scalars.encode(&schema, &Type::array(Type::Guid)).unwrap();
        assert_eq!(bytes.len(), 4 + 32);
        assert_eq!(Value::decode(&schema, &Type::array(Type::Guid), &bytes), Ok(scalars));

        let date = Value::Date(637_000_000_000_000_000);
        let bytes = date.encode(&schema, &Type::Date).unwrap();
        assert_eq!(Value::decode(&schema, &Type::Date, &bytes), Ok(date));
    }

    #[test]
    fn truncated_input_is_a_typed_error() {
        let schema = test_schema();
        assert!(matches!(
            Value::decode(&schema, &Type::Defined(1), &[0, 0, 0x80]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            Value::decode(&schema, &Type::array(Type::String), &[5, 0, 0, 0]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn type_mismatch() {
        let schema = test_schema();
        assert_eq!(
            Value::Bool(true).encode(&schema, &Type::String),
            Err(EncodeError::TypeMismatch {
                expected: "String".to_owned(),
                found: "bool".to_owned()
            })
        );
        assert!(matches!(
            Value::Enum("Color", 0).encode(&schema, &Type::Defined(1)),
            Err(EncodeError::TypeMismatch { .. })
        ));
    }
}
