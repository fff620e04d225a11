use std::collections::HashMap;

/// The shape of an encoded value. User-defined types refer to their
/// definition by position in [Schema::defs](struct.Schema.html#structfield.defs).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
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
    Array(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Defined(usize),
}

impl Type {
    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Box::new(key), Box::new(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Enum,
    Struct,
    Message,
    Union,
}

/// A field of a definition. `value` is the enum constant for enums, the wire
/// tag for messages, and unused for structs.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub type_: Type,
    pub value: u32,
}

/// A union branch: the discriminator byte and the struct or message it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub discriminator: u8,
    pub def_index: usize,
}

#[derive(Debug, PartialEq)]
pub struct Def {
    pub name: String,
    pub index: usize,
    pub kind: DefKind,
    pub fields: Vec<Field>,
    pub branches: Vec<Branch>,
    pub field_value_to_index: HashMap<u32, usize>,
    pub field_name_to_index: HashMap<String, usize>,
}

impl Def {
    pub fn new(name: String, kind: DefKind, fields: Vec<Field>) -> Def {
        let mut field_value_to_index = HashMap::new();
        let mut field_name_to_index = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            field_value_to_index.insert(field.value, i);
            field_name_to_index.insert(field.name.clone(), i);
        }
        Def {
            name,
            index: 0,
            kind,
            fields,
            branches: Vec::new(),
            field_value_to_index,
            field_name_to_index,
        }
    }

    pub fn new_union(name: String, branches: Vec<Branch>) -> Def {
        Def {
            branches,
            ..Def::new(name, DefKind::Union, Vec::new())
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_name_to_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn branch(&self, discriminator: u8) -> Option<&Branch> {
        self.branches.iter().find(|b| b.discriminator == discriminator)
    }
}

/// Runtime description of every definition in a schema, in declaration order.
#[derive(Debug, PartialEq)]
pub struct Schema {
    pub defs: Vec<Def>,
    pub def_name_to_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(mut defs: Vec<Def>) -> Schema {
        let mut def_name_to_index = HashMap::new();
        for (i, def) in defs.iter_mut().enumerate() {
            def.index = i;
            def_name_to_index.insert(def.name.clone(), i);
        }
        Schema {
            defs,
            def_name_to_index,
        }
    }

    pub fn def(&self, name: &str) -> Option<&Def> {
        self.def_name_to_index.get(name).map(|&i| &self.defs[i])
    }

    /// The [Type] that refers to the named definition.
    pub fn type_of(&self, name: &str) -> Option<Type> {
        self.def_name_to_index.get(name).map(|&i| Type::Defined(i))
    }
}
