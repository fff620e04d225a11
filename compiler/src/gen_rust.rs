use std::collections::{HashMap, HashSet};

use crate::{
    error::BebopError,
    generator::Generator,
    nameless::NamelessTypes,
    types::{BaseType, Definition, DefinitionKind, Schema, TypeExpr},
    utils::quote,
};

/// Emits plain Rust types plus `Record` impls against the `brine_bebop`
/// runtime.
pub struct RustGenerator;

impl Generator for RustGenerator {
    fn alias(&self) -> &'static str {
        "rust"
    }

    fn name(&self) -> &'static str {
        "Rust"
    }

    fn compile(&self, schema: &Schema) -> Result<String, BebopError> {
        compile_schema_to_rust(schema)
    }
}

/// Converts a string to PascalCase.
/// - If the string contains underscores, it splits on underscores and converts each word
///   so that its first letter is uppercase and the rest lowercase.
/// - If the string does not contain underscores and is fully uppercase, it converts it
///   so that only the first letter is uppercase and the rest are lowercase.
/// - Otherwise, it ensures only the first letter is uppercase.
fn to_pascal_case(s: &str) -> String {
    fn capitalize(word: &str, lower_rest: bool) -> String {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) if lower_rest => first.to_uppercase().to_string() + &chars.as_str().to_lowercase(),
            Some(first) => first.to_uppercase().to_string() + chars.as_str(),
        }
    }

    if s.contains('_') {
        s.split('_')
            .filter(|word| !word.is_empty())
            .map(|word| capitalize(word, true))
            .collect::<String>()
    } else {
        capitalize(s, s == s.to_uppercase())
    }
}

/// Converts a string to snake_case.
/// This implementation avoids inserting underscores between consecutive uppercase letters,
/// so that acronyms remain intact (e.g. "sessionID" becomes "session_id").
fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut snake = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                if prev != '_'
                    && (!prev.is_uppercase() || (i + 1 < chars.len() && chars[i + 1].is_lowercase()))
                {
                    snake.push('_');
                }
            }
            snake.extend(c.to_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}

fn to_constant_case(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

/// Escapes Rust reserved keywords by suffixing with an underscore.
fn escape_rust_keyword(s: &str) -> String {
    let keywords = [
        "as", "break", "const", "continue", "crate", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl",
        "in", "let", "loop", "match", "mod", "move", "mut",
        "pub", "ref", "return", "self", "Self", "static",
        "struct", "super", "trait", "true", "type", "unsafe",
        "use", "where", "while", "async", "await", "dyn",
    ];
    if keywords.contains(&s) {
        format!("{}_", s)
    } else {
        s.to_string()
    }
}

fn field_name(name: &str) -> String {
    escape_rust_keyword(&to_snake_case(name))
}

fn type_name(name: &str) -> String {
    escape_rust_keyword(&to_pascal_case(name))
}

fn doc_comment(documentation: &Option<String>, indent: &str) -> String {
    match documentation {
        Some(doc) => doc
            .lines()
            .map(|line| format!("{}/// {}\n", indent, line.trim().trim_start_matches('*').trim()))
            .collect(),
        None => String::new(),
    }
}

/// Rejects structs that contain each other by value, which no finite
/// encoding can satisfy.
fn check_recursion(schema: &Schema) -> Result<(), BebopError> {
    fn visit(schema: &Schema, name: &str, state: &mut HashMap<String, u8>) -> Result<(), BebopError> {
        let definition = match schema.get(name) {
            Some(def) if def.kind == DefinitionKind::Struct => def,
            _ => return Ok(()),
        };
        match state.get(name) {
            Some(1) => {
                return Err(BebopError::Generator(format!(
                    "Recursive nesting of {} is not allowed",
                    quote(name)
                )))
            }
            Some(_) => return Ok(()),
            None => {}
        }
        state.insert(name.to_string(), 1);
        for field in &definition.fields {
            if let TypeExpr::Defined(ty) = &field.type_ {
                visit(schema, ty, state)?;
            }
        }
        state.insert(name.to_string(), 2);
        Ok(())
    }

    let mut state = HashMap::new();
    for definition in schema.definitions() {
        visit(schema, &definition.name, &mut state)?;
    }
    Ok(())
}

fn check_map_keys(type_: &TypeExpr) -> Result<(), BebopError> {
    match type_ {
        TypeExpr::Map(key, value) => {
            if let TypeExpr::Scalar(base @ (BaseType::Float32 | BaseType::Float64)) = **key {
                return Err(BebopError::Generator(format!(
                    "map keys of type {} cannot be hashed in Rust",
                    base.name()
                )));
            }
            check_map_keys(value)
        }
        TypeExpr::Array(element) => check_map_keys(element),
        _ => Ok(()),
    }
}

struct RustWriter<'a> {
    schema:   &'a Schema,
    nameless: NamelessTypes,
}

impl<'a> RustWriter<'a> {
    fn kind_of(&self, name: &str) -> Result<DefinitionKind, BebopError> {
        self.schema
            .get(name)
            .map(|d| d.kind)
            .ok_or_else(|| BebopError::Generator(format!("unknown type {}", quote(name))))
    }

    fn helper_id(&self, type_: &TypeExpr) -> Result<&str, BebopError> {
        self.nameless
            .id_of(type_)
            .ok_or_else(|| BebopError::Generator(format!("no helper registered for {}", type_)))
    }

    /// Whether `from` can reach `target` through fields or branches held by
    /// value. Arrays and maps already sit behind a heap allocation.
    fn reaches(&self, from: &str, target: &str, visited: &mut HashSet<String>) -> bool {
        if from == target {
            return true;
        }
        if !visited.insert(from.to_string()) {
            return false;
        }
        let definition = match self.schema.get(from) {
            Some(def) => def,
            None => return false,
        };
        definition.fields.iter().any(|f| match &f.type_ {
            TypeExpr::Defined(name) => self.reaches(name, target, visited),
            _ => false,
        }) || definition
            .branches
            .iter()
            .any(|b| self.reaches(&b.definition.name, target, visited))
    }

    /// Fields whose type can contain the owner again are boxed.
    fn is_boxed(&self, owner: &Definition, type_: &TypeExpr) -> bool {
        match type_ {
            TypeExpr::Defined(name) => {
                self.schema.get(name).map(|d| d.kind) != Some(DefinitionKind::Enum)
                    && self.reaches(name, &owner.name, &mut HashSet::new())
            }
            _ => false,
        }
    }

    fn native_type(&self, type_: &TypeExpr) -> String {
        match type_ {
            TypeExpr::Scalar(base) => match base {
                BaseType::Bool => "bool",
                BaseType::Byte => "u8",
                BaseType::UInt16 => "u16",
                BaseType::Int16 => "i16",
                BaseType::UInt32 => "u32",
                BaseType::Int32 => "i32",
                BaseType::UInt64 => "u64",
                BaseType::Int64 => "i64",
                BaseType::Float32 => "f32",
                BaseType::Float64 => "f64",
                BaseType::String => "String",
                BaseType::Guid => "Uuid",
                BaseType::Date => "i64",
            }
            .to_string(),
            TypeExpr::Array(element) => format!("Vec<{}>", self.native_type(element)),
            TypeExpr::Map(key, value) => {
                format!("HashMap<{}, {}>", self.native_type(key), self.native_type(value))
            }
            TypeExpr::Defined(name) => type_name(name),
        }
    }

    fn field_type(&self, owner: &Definition, type_: &TypeExpr) -> String {
        if self.is_boxed(owner, type_) {
            format!("Box<{}>", self.native_type(type_))
        } else {
            self.native_type(type_)
        }
    }

    /// A statement writing `value`, which is either a reference expression
    /// or `&` followed by a place.
    fn encode_stmt(&self, type_: &TypeExpr, value: &str) -> Result<String, BebopError> {
        let place = value.strip_prefix('&');
        let copied = match place {
            Some(p) => p.to_string(),
            None => format!("*{}", value),
        };
        let receiver = place.unwrap_or(value);

        Ok(match type_ {
            TypeExpr::Scalar(base) => match base {
                BaseType::Bool => format!("bb.write_bool({});", copied),
                BaseType::Byte => format!("bb.write_byte({});", copied),
                BaseType::UInt16 => format!("bb.write_u16({});", copied),
                BaseType::Int16 => format!("bb.write_i16({});", copied),
                BaseType::UInt32 => format!("bb.write_u32({});", copied),
                BaseType::Int32 => format!("bb.write_i32({});", copied),
                BaseType::UInt64 => format!("bb.write_u64({});", copied),
                BaseType::Int64 => format!("bb.write_i64({});", copied),
                BaseType::Float32 => format!("bb.write_f32({});", copied),
                BaseType::Float64 => format!("bb.write_f64({});", copied),
                BaseType::Date => format!("bb.write_date({});", copied),
                BaseType::Guid => format!("bb.write_guid({});", value),
                BaseType::String => format!("bb.write_string({})?;", value),
            },
            TypeExpr::Defined(name) => match self.kind_of(name)? {
                DefinitionKind::Enum => format!("bb.write_u32({}.0);", receiver),
                _ => format!("{}.encode_into(bb)?;", receiver),
            },
            _ => format!("encode_{}({}, bb)?;", self.helper_id(type_)?, value),
        })
    }

    fn decode_expr(&self, type_: &TypeExpr, boxed: bool) -> Result<String, BebopError> {
        Ok(match type_ {
            TypeExpr::Scalar(base) => match base {
                BaseType::Bool => "bb.read_bool()?".to_string(),
                BaseType::Byte => "bb.read_byte()?".to_string(),
                BaseType::UInt16 => "bb.read_u16()?".to_string(),
                BaseType::Int16 => "bb.read_i16()?".to_string(),
                BaseType::UInt32 => "bb.read_u32()?".to_string(),
                BaseType::Int32 => "bb.read_i32()?".to_string(),
                BaseType::UInt64 => "bb.read_u64()?".to_string(),
                BaseType::Int64 => "bb.read_i64()?".to_string(),
                BaseType::Float32 => "bb.read_f32()?".to_string(),
                BaseType::Float64 => "bb.read_f64()?".to_string(),
                BaseType::Date => "bb.read_date()?".to_string(),
                BaseType::Guid => "bb.read_guid()?".to_string(),
                BaseType::String => "bb.read_string()?.to_owned()".to_string(),
            },
            TypeExpr::Defined(name) => {
                let native = type_name(name);
                match self.kind_of(name)? {
                    DefinitionKind::Enum => format!("{}(bb.read_u32()?)", native),
                    _ if boxed => format!("Box::new({}::decode_from(bb)?)", native),
                    _ => format!("{}::decode_from(bb)?", native),
                }
            }
            _ => format!("decode_{}(bb)?", self.helper_id(type_)?),
        })
    }

    fn generate_enum(&self, definition: &Definition) -> String {
        let name = type_name(&definition.name);
        let mut out = doc_comment(&definition.documentation, "");
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]\n");
        out.push_str(&format!("pub struct {}(pub u32);\n\n", name));

        out.push_str(&format!("impl {} {{\n", name));
        for field in &definition.fields {
            out.push_str(&doc_comment(&field.documentation, "    "));
            if let Some(reason) = &field.deprecated {
                out.push_str(&format!("    #[deprecated(note = {})]\n", quote(reason)));
            }
            out.push_str(&format!(
                "    pub const {}: {} = {}({});\n",
                to_constant_case(&field.name),
                name,
                name,
                field.constant
            ));
        }
        if !definition.fields.is_empty() {
            out.push('\n');
        }
        out.push_str("    /// The schema name of this value, if it is a known constant.\n");
        out.push_str("    pub fn name(self) -> Option<&'static str> {\n");
        out.push_str("        match self.0 {\n");
        for field in &definition.fields {
            out.push_str(&format!("            {} => Some({}),\n", field.constant, quote(&field.name)));
        }
        out.push_str("            _ => None,\n");
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("}\n\n");

        out.push_str(&format!("impl Record for {} {{\n", name));
        out.push_str("    fn encode_into(&self, bb: &mut ByteBufferMut) -> Result<(), EncodeError> {\n");
        out.push_str("        bb.write_u32(self.0);\n");
        out.push_str("        Ok(())\n");
        out.push_str("    }\n\n");
        out.push_str("    fn decode_from(bb: &mut ByteBuffer) -> Result<Self, DecodeError> {\n");
        out.push_str(&format!("        Ok({}(bb.read_u32()?))\n", name));
        out.push_str("    }\n");
        out.push_str("}\n");
        out
    }

    fn generate_opcode(&self, definition: &Definition) -> Result<String, BebopError> {
        let opcode = match &definition.opcode {
            Some(opcode) => opcode,
            None => return Ok(String::new()),
        };
        let value = opcode.resolve().map_err(BebopError::Generator)?;
        Ok(format!(
            "impl {} {{\n    pub const OPCODE: u32 = 0x{:08x};\n}}\n\n",
            type_name(&definition.name),
            value
        ))
    }

    fn generate_struct(&self, definition: &Definition) -> Result<String, BebopError> {
        let name = type_name(&definition.name);
        let visibility = if definition.read_only { "" } else { "pub " };
        let bb = if definition.fields.is_empty() { "_bb" } else { "bb" };

        let mut out = doc_comment(&definition.documentation, "");
        out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
        out.push_str(&format!("pub struct {} {{\n", name));
        for field in &definition.fields {
            out.push_str(&doc_comment(&field.documentation, "    "));
            out.push_str(&format!(
                "    {}{}: {},\n",
                visibility,
                field_name(&field.name),
                self.field_type(definition, &field.type_)
            ));
        }
        out.push_str("}\n\n");

        if definition.read_only {
            let params: Vec<String> = definition
                .fields
                .iter()
                .map(|f| format!("{}: {}", field_name(&f.name), self.field_type(definition, &f.type_)))
                .collect();
            let names: Vec<String> = definition.fields.iter().map(|f| field_name(&f.name)).collect();
            out.push_str(&format!("impl {} {{\n", name));
            out.push_str(&format!("    pub fn new({}) -> Self {{\n", params.join(", ")));
            out.push_str(&format!("        {} {{ {} }}\n", name, names.join(", ")));
            out.push_str("    }\n");
            for field in &definition.fields {
                let fname = field_name(&field.name);
                out.push_str(&format!(
                    "\n    pub fn {}(&self) -> &{} {{\n        &self.{}\n    }}\n",
                    fname,
                    self.field_type(definition, &field.type_),
                    fname
                ));
            }
            out.push_str("}\n\n");
        }

        out.push_str(&self.generate_opcode(definition)?);

        out.push_str(&format!("impl Record for {} {{\n", name));
        out.push_str(&format!(
            "    fn encode_into(&self, {}: &mut ByteBufferMut) -> Result<(), EncodeError> {{\n",
            bb
        ));
        for field in &definition.fields {
            let value = format!("&self.{}", field_name(&field.name));
            out.push_str(&format!("        {}\n", self.encode_stmt(&field.type_, &value)?));
        }
        out.push_str("        Ok(())\n");
        out.push_str("    }\n\n");

        out.push_str(&format!(
            "    fn decode_from({}: &mut ByteBuffer) -> Result<Self, DecodeError> {{\n",
            bb
        ));
        out.push_str(&format!("        Ok({} {{\n", name));
        for field in &definition.fields {
            let boxed = self.is_boxed(definition, &field.type_);
            out.push_str(&format!(
                "            {}: {},\n",
                field_name(&field.name),
                self.decode_expr(&field.type_, boxed)?
            ));
        }
        out.push_str("        })\n");
        out.push_str("    }\n");
        out.push_str("}\n");
        Ok(out)
    }

    fn generate_message(&self, definition: &Definition) -> Result<String, BebopError> {
        let name = type_name(&definition.name);

        let mut out = doc_comment(&definition.documentation, "");
        out.push_str("#[derive(Debug, Clone, PartialEq, Default)]\n");
        out.push_str(&format!("pub struct {} {{\n", name));
        for field in &definition.fields {
            out.push_str(&doc_comment(&field.documentation, "    "));
            if let Some(reason) = &field.deprecated {
                out.push_str(&format!("    /// Deprecated: {}\n", reason));
            }
            out.push_str(&format!(
                "    pub {}: Option<{}>,\n",
                field_name(&field.name),
                self.field_type(definition, &field.type_)
            ));
        }
        out.push_str("}\n\n");

        out.push_str(&self.generate_opcode(definition)?);

        out.push_str(&format!("impl Record for {} {{\n", name));
        out.push_str("    fn encode_into(&self, bb: &mut ByteBufferMut) -> Result<(), EncodeError> {\n");
        out.push_str("        let position = bb.reserve_message_length();\n");
        out.push_str("        let start = bb.len();\n");
        for field in &definition.fields {
            let tag = u8::try_from(field.constant).map_err(|_| {
                BebopError::Generator(format!(
                    "field {} of {} has index {}, which does not fit in a one-byte tag",
                    field.name, definition.name, field.constant
                ))
            })?;
            out.push_str(&format!(
                "        if let Some(ref value) = self.{} {{\n",
                field_name(&field.name)
            ));
            out.push_str(&format!("            bb.write_byte({});\n", tag));
            out.push_str(&format!("            {}\n", self.encode_stmt(&field.type_, "value")?));
            out.push_str("        }\n");
        }
        out.push_str("        bb.write_byte(0);\n");
        out.push_str("        let length = bb.len() - start;\n");
        out.push_str("        bb.fill_message_length(position, length)\n");
        out.push_str("    }\n\n");

        let binding = if definition.fields.is_empty() { "let" } else { "let mut" };
        out.push_str("    fn decode_from(bb: &mut ByteBuffer) -> Result<Self, DecodeError> {\n");
        out.push_str("        let length = bb.read_message_length()?;\n");
        out.push_str("        let start = bb.index();\n");
        out.push_str(&format!("        {} message = {}::default();\n", binding, name));
        out.push_str("        loop {\n");
        out.push_str("            match bb.read_byte()? {\n");
        out.push_str("                0 => break,\n");
        for field in &definition.fields {
            let boxed = self.is_boxed(definition, &field.type_);
            out.push_str(&format!(
                "                {} => message.{} = Some({}),\n",
                field.constant,
                field_name(&field.name),
                self.decode_expr(&field.type_, boxed)?
            ));
        }
        out.push_str("                _ => {\n");
        out.push_str("                    bb.seek(start + length)?;\n");
        out.push_str("                    return Ok(message);\n");
        out.push_str("                }\n");
        out.push_str("            }\n");
        // Every arm diverges when there are no fields.
        if !definition.fields.is_empty() {
            out.push_str("            bb.check_message_body(start, length)?;\n");
        }
        out.push_str("        }\n");
        out.push_str("        bb.check_message_body(start, length)?;\n");
        out.push_str("        Ok(message)\n");
        out.push_str("    }\n");
        out.push_str("}\n");
        Ok(out)
    }

    fn generate_union(&self, definition: &Definition) -> Result<String, BebopError> {
        let name = type_name(&definition.name);

        let mut out = doc_comment(&definition.documentation, "");
        out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
        out.push_str(&format!("pub enum {} {{\n", name));
        for branch in &definition.branches {
            out.push_str(&doc_comment(&branch.documentation, "    "));
            let variant = type_name(&branch.definition.name);
            out.push_str(&format!("    {}({}),\n", variant, variant));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl {} {{\n", name));
        out.push_str("    pub fn discriminator(&self) -> u8 {\n");
        out.push_str("        match *self {\n");
        for branch in &definition.branches {
            out.push_str(&format!(
                "            {}::{}(_) => {},\n",
                name,
                type_name(&branch.definition.name),
                branch.discriminator
            ));
        }
        out.push_str("        }\n");
        out.push_str("    }\n");
        if let Some(opcode) = &definition.opcode {
            let value = opcode.resolve().map_err(BebopError::Generator)?;
            out.push_str(&format!("\n    pub const OPCODE: u32 = 0x{:08x};\n", value));
        }
        out.push_str("}\n\n");

        out.push_str(&format!("impl Record for {} {{\n", name));
        out.push_str("    fn encode_into(&self, bb: &mut ByteBufferMut) -> Result<(), EncodeError> {\n");
        out.push_str("        bb.write_byte(self.discriminator());\n");
        out.push_str("        match *self {\n");
        for branch in &definition.branches {
            out.push_str(&format!(
                "            {}::{}(ref value) => value.encode_into(bb),\n",
                name,
                type_name(&branch.definition.name)
            ));
        }
        out.push_str("        }\n");
        out.push_str("    }\n\n");
        out.push_str("    fn decode_from(bb: &mut ByteBuffer) -> Result<Self, DecodeError> {\n");
        out.push_str("        match bb.read_byte()? {\n");
        for branch in &definition.branches {
            let variant = type_name(&branch.definition.name);
            out.push_str(&format!(
                "            {} => Ok({}::{}({}::decode_from(bb)?)),\n",
                branch.discriminator, name, variant, variant
            ));
        }
        out.push_str(&format!(
            "            discriminator => Err(DecodeError::UnknownDiscriminator {{ union: {}.to_string(), discriminator }}),\n",
            quote(&definition.name)
        ));
        out.push_str("        }\n");
        out.push_str("    }\n");
        out.push_str("}\n");
        Ok(out)
    }

    fn generate_helpers(&self) -> Result<String, BebopError> {
        let mut out = String::new();
        for nameless in self.nameless.iter() {
            let id = &nameless.id;
            out.push_str(&format!("// {}\n", nameless.description));
            match &nameless.type_ {
                TypeExpr::Array(element) if **element == TypeExpr::Scalar(BaseType::Byte) => {
                    out.push_str(&format!(
                        "fn encode_{}(value: &[u8], bb: &mut ByteBufferMut) -> Result<(), EncodeError> {{\n    bb.write_byte_array(value)\n}}\n\n",
                        id
                    ));
                    out.push_str(&format!(
                        "fn decode_{}(bb: &mut ByteBuffer) -> Result<Vec<u8>, DecodeError> {{\n    Ok(bb.read_byte_array()?.to_vec())\n}}\n\n",
                        id
                    ));
                }
                TypeExpr::Array(element) => {
                    let native = self.native_type(element);
                    out.push_str(&format!(
                        "fn encode_{}(value: &[{}], bb: &mut ByteBufferMut) -> Result<(), EncodeError> {{\n",
                        id, native
                    ));
                    out.push_str("    bb.write_length(value.len())?;\n");
                    out.push_str("    for item in value {\n");
                    out.push_str(&format!("        {}\n", self.encode_stmt(element, "item")?));
                    out.push_str("    }\n");
                    out.push_str("    Ok(())\n");
                    out.push_str("}\n\n");

                    out.push_str(&format!(
                        "fn decode_{}(bb: &mut ByteBuffer) -> Result<Vec<{}>, DecodeError> {{\n",
                        id, native
                    ));
                    out.push_str("    let length = bb.read_length()?;\n");
                    out.push_str("    let mut value = Vec::with_capacity(length.min(bb.remaining()));\n");
                    out.push_str("    for _ in 0..length {\n");
                    out.push_str(&format!("        value.push({});\n", self.decode_expr(element, false)?));
                    out.push_str("    }\n");
                    out.push_str("    Ok(value)\n");
                    out.push_str("}\n\n");
                }
                TypeExpr::Map(key, value) => {
                    let native = self.native_type(&nameless.type_);
                    out.push_str(&format!(
                        "fn encode_{}(value: &{}, bb: &mut ByteBufferMut) -> Result<(), EncodeError> {{\n",
                        id, native
                    ));
                    out.push_str("    bb.write_length(value.len())?;\n");
                    out.push_str("    for (key, item) in value {\n");
                    out.push_str(&format!("        {}\n", self.encode_stmt(key, "key")?));
                    out.push_str(&format!("        {}\n", self.encode_stmt(value, "item")?));
                    out.push_str("    }\n");
                    out.push_str("    Ok(())\n");
                    out.push_str("}\n\n");

                    out.push_str(&format!(
                        "fn decode_{}(bb: &mut ByteBuffer) -> Result<{}, DecodeError> {{\n",
                        id, native
                    ));
                    out.push_str("    let length = bb.read_length()?;\n");
                    out.push_str("    let mut value = HashMap::with_capacity(length.min(bb.remaining()));\n");
                    out.push_str("    for _ in 0..length {\n");
                    out.push_str(&format!("        let key = {};\n", self.decode_expr(key, false)?));
                    out.push_str(&format!("        let item = {};\n", self.decode_expr(value, false)?));
                    out.push_str("        value.insert(key, item);\n");
                    out.push_str("    }\n");
                    out.push_str("    Ok(value)\n");
                    out.push_str("}\n\n");
                }
                _ => {}
            }
        }
        Ok(out)
    }
}

/// Compiles the entire schema into Rust type definitions as a string,
/// including `Record` implementations and one pair of helpers per distinct
/// array or map type.
pub fn compile_schema_to_rust(schema: &Schema) -> Result<String, BebopError> {
    check_recursion(schema)?;
    for definition in schema.definitions() {
        for field in &definition.fields {
            check_map_keys(&field.type_)?;
        }
    }

    let writer = RustWriter {
        schema,
        nameless: NamelessTypes::collect(schema),
    };
    let module = schema
        .options
        .rust
        .module
        .clone()
        .or_else(|| schema.options.namespace.clone())
        .map(|m| to_snake_case(&m.replace('.', "_")));

    let mut rust_code: Vec<String> = Vec::new();
    rust_code.push("// Code generated by bebopc. DO NOT EDIT.".to_string());
    rust_code.push("".to_string());

    if let Some(name) = &module {
        rust_code.push(format!("pub mod {} {{", name));
        rust_code.push("".to_string());
    }

    rust_code.push("#[allow(unused_imports)]".to_string());
    rust_code.push("use brine_bebop::{ByteBuffer, ByteBufferMut, DecodeError, EncodeError, Record, Uuid};".to_string());
    rust_code.push("#[allow(unused_imports)]".to_string());
    rust_code.push("use std::collections::HashMap;".to_string());
    rust_code.push("".to_string());

    for definition in schema.definitions() {
        let code = match definition.kind {
            DefinitionKind::Enum => writer.generate_enum(definition),
            DefinitionKind::Struct => writer.generate_struct(definition)?,
            DefinitionKind::Message => writer.generate_message(definition)?,
            DefinitionKind::Union => writer.generate_union(definition)?,
        };
        rust_code.push(code);
    }

    let helpers = writer.generate_helpers()?;
    if !helpers.is_empty() {
        rust_code.push(helpers.trim_end().to_string());
    }

    if module.is_some() {
        rust_code.push("}".to_string());
    }

    Ok(rust_code.join("\n"))
}
