#![cfg(test)]

use std::collections::HashMap;

use brine_bebop_compiler::{
    compile_files, compile_schema, compile_schema_to_rust, generate, lower_schema, nameless::NamelessTypes,
    BebopError, DefinitionKind, GeneratorRegistry, SchemaOptions, TypeExpr,
};
use brine_bebop_schema::{Uuid, Value};

const JAZZ: &str = r#"
    /* Instruments a musician can play. */
    enum Instrument {
        Sax = 0;
        Trumpet = 1;
        Clarinet = 2;
    }

    struct Musician {
        string name;
        Instrument plays;
    }

    [opcode("SONG")]
    message Song {
        1 -> string title;
        2 -> uint16 year;
        3 -> Musician[] performers;
    }

    union Album {
        1 -> struct StudioAlbum { Song[] tracks; }
        2 -> message LiveAlbum {
            1 -> Song[] tracks;
            2 -> string venue;
            3 -> date concertDate;
        }
    }

    struct Library {
        map[guid, Album] albums;
        map[string, string[]] tags;
    }
"#;

fn compile(text: &str) -> Result<brine_bebop_compiler::Schema, BebopError> {
    compile_schema(text, SchemaOptions::default())
}

#[test]
fn test_scenario_a_point_struct() {
    let schema = compile("struct Point { float32 x; float32 y; }").unwrap();
    let point = schema.get("Point").unwrap();
    assert_eq!(point.kind, DefinitionKind::Struct);
    assert_eq!(point.fields.len(), 2);

    let runtime = lower_schema(&schema).unwrap();
    let point_type = runtime.type_of("Point").unwrap();
    let mut fields = HashMap::new();
    fields.insert("x", Value::Float32(1.0));
    fields.insert("y", Value::Float32(2.0));
    let bytes = Value::Object("Point", fields).encode(&runtime, &point_type).unwrap();
    assert_eq!(bytes, [0x00, 0x00, 0x80, 0x3f, 0x00, 0x00, 0x00, 0x40]);
}

#[test]
fn test_scenario_b_message_omits_absent_fields() {
    let schema = compile("message M { 1 -> string name; 2 -> int32 age; }").unwrap();
    let runtime = lower_schema(&schema).unwrap();
    let m = runtime.type_of("M").unwrap();

    let mut fields = HashMap::new();
    fields.insert("name", Value::String("Al".to_string()));
    let bytes = Value::Object("M", fields).encode(&runtime, &m).unwrap();
    assert_eq!(bytes, [8, 0, 0, 0, 1, 2, 0, 0, 0, b'A', b'l', 0]);
    assert_eq!(bytes.len() - 4, 8);

    let decoded = Value::decode(&runtime, &m, &bytes).unwrap();
    assert_eq!(decoded.get("name"), Some(&Value::String("Al".to_string())));
    assert!(decoded.get("age").is_none());
}

#[test]
fn test_scenario_c_duplicate_enum_constant() {
    let err = compile("enum Color { Red = 0; Blue = 1; Green = 1; }").unwrap_err();
    match err {
        BebopError::InvalidField { definition, field, reason, .. } => {
            assert_eq!(definition, "Color");
            assert_eq!(field, "Green");
            assert_eq!(reason, "Enum value must be unique");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_scenario_d_union_branches_are_top_level() {
    let schema = compile("union U { 1 -> struct A{} 2 -> struct B{} }").unwrap();
    assert_eq!(schema.get("A").unwrap().kind, DefinitionKind::Struct);
    assert_eq!(schema.get("B").unwrap().kind, DefinitionKind::Struct);

    let u = schema.get("U").unwrap();
    assert_eq!(u.kind, DefinitionKind::Union);
    let branches: Vec<(u8, &str)> = u
        .branches
        .iter()
        .map(|b| (b.discriminator, b.definition.name.as_str()))
        .collect();
    assert_eq!(branches, vec![(1, "A"), (2, "B")]);
}

fn assert_rejected(text: &str, is_expected: fn(&BebopError) -> bool) {
    let err = compile(text).unwrap_err();
    assert!(is_expected(&err), "{} gave {:?}", text, err);
    assert!(err.span().is_some(), "{} gave {:?} without a span", text, err);
}

#[test]
fn test_validator_rejection_set() {
    assert_rejected("struct A {} struct A {}", |e| matches!(e, BebopError::MultipleDefinitions { .. }));
    assert_rejected("[opcode(1)] struct A {} [opcode(0x1)] message B {}", |e| {
        matches!(e, BebopError::DuplicateOpcode { .. })
    });
    assert_rejected("enum E { A = -3; }", |e| matches!(e, BebopError::InvalidField { .. }));
    assert_rejected("enum E { A = 1; B = 1; }", |e| matches!(e, BebopError::InvalidField { .. }));
    assert_rejected("message M { 0 -> int32 a; }", |e| matches!(e, BebopError::InvalidField { .. }));
    assert_rejected("message M { 1 -> int32 a; 1 -> int32 b; }", |e| matches!(e, BebopError::InvalidField { .. }));
    assert_rejected("message M { 2 -> int32 a; }", |e| matches!(e, BebopError::InvalidField { .. }));
    assert_rejected("struct S { S s; }", |e| matches!(e, BebopError::InvalidField { .. }));
    assert_rejected("struct S { map[S, int32] m; }", |e| matches!(e, BebopError::InvalidMapKeyType { .. }));
    assert_rejected("struct S { map[byte[], int32] m; }", |e| matches!(e, BebopError::InvalidMapKeyType { .. }));
    assert_rejected("struct ByteBuffer {}", |e| matches!(e, BebopError::ReservedIdentifier { .. }));
    assert_rejected("struct union {}", |e| matches!(e, BebopError::ReservedIdentifier { .. }));
    assert_rejected("readonly message M {}", |e| matches!(e, BebopError::InvalidReadOnlyUsage { .. }));
    assert_rejected("[opcode(1)] enum E { A = 0; }", |e| matches!(e, BebopError::InvalidOpcodeUsage { .. }));
    assert_rejected("[opcode(\"AB\")] struct S {}", |e| matches!(e, BebopError::InvalidOpcodeValue { .. }));
    assert_rejected("struct S { Nowhere n; }", |e| matches!(e, BebopError::UnrecognizedType { .. }));
    assert_rejected("union U { 1 -> union V {} }", |e| matches!(e, BebopError::InvalidUnionBranch { .. }));
}

#[test]
fn test_forward_and_mutual_references() {
    compile("struct A { B b; } message B { 1 -> A a; }").unwrap();
    compile("message B { 1 -> A a; } struct A { B b; }").unwrap();
    compile("union U { 1 -> message M { 1 -> U next; } }").unwrap();

    let err = compile("struct A { B b; } message C { 1 -> A a; }").unwrap_err();
    assert!(matches!(err, BebopError::UnrecognizedType { ref name, .. } if name == "B"), "{:?}", err);
}

#[test]
fn test_structural_deduplication() {
    let schema = compile(
        "struct A { array[string] names; } message B { 1 -> string[] labels; } struct C { map[int32, string[]] m; }",
    )
    .unwrap();
    let registry = NamelessTypes::collect(&schema);
    assert_eq!(registry.len(), 2);

    let a = &schema.get("A").unwrap().fields[0].type_;
    let b = &schema.get("B").unwrap().fields[0].type_;
    assert_eq!(registry.id_of(a), registry.id_of(b));

    let code = compile_schema_to_rust(&schema).unwrap();
    let id = registry.id_of(a).unwrap();
    assert_eq!(code.matches(&format!("fn encode_{}(", id)).count(), 1);
    assert_eq!(code.matches(&format!("encode_{}(", id)).count(), 4);
}

#[test]
fn test_full_schema_round_trip() {
    let schema = compile(JAZZ).unwrap();
    assert_eq!(
        schema.definitions().iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
        vec!["Instrument", "Musician", "Song", "StudioAlbum", "LiveAlbum", "Album", "Library"]
    );
    assert_eq!(schema.get("Instrument").unwrap().documentation.as_deref(), Some("Instruments a musician can play."));

    let runtime = lower_schema(&schema).unwrap();
    let library = runtime.type_of("Library").unwrap();

    let musician = |name: &'static str, plays: u32| {
        let mut fields = HashMap::new();
        fields.insert("name", Value::String(name.to_string()));
        fields.insert("plays", Value::Enum("Instrument", plays));
        Value::Object("Musician", fields)
    };
    let mut song = HashMap::new();
    song.insert("title", Value::String("Giant Steps".to_string()));
    song.insert("performers", Value::Array(vec![musician("Coltrane", 0), musician("Flanagan", 2)]));
    let mut live = HashMap::new();
    live.insert("tracks", Value::Array(vec![Value::Object("Song", song)]));
    live.insert("concertDate", Value::Date(630_000_000_000_000_000));
    let album = Value::Union("Album", 2, Box::new(Value::Object("LiveAlbum", live)));

    let guid = Uuid::parse_str("81c6987b-48b7-495f-ad01-ec20cc5f5be1").unwrap();
    let mut lib = HashMap::new();
    lib.insert("albums", Value::Map(vec![(Value::Guid(guid), album)]));
    lib.insert(
        "tags",
        Value::Map(vec![(
            Value::String("bop".to_string()),
            Value::Array(vec![Value::String("fast".to_string())]),
        )]),
    );
    let value = Value::Object("Library", lib);

    let bytes = value.encode(&runtime, &library).unwrap();
    let decoded = Value::decode(&runtime, &library, &bytes).unwrap();
    assert_eq!(format!("{:?}", decoded), format!("{:?}", value));
    assert_eq!(decoded.encode(&runtime, &library).unwrap(), bytes);
}

#[test]
fn test_generated_rust_for_full_schema() {
    let schema = compile(JAZZ).unwrap();
    let registry = GeneratorRegistry::builtin();
    let code = generate(&schema, &registry, "rust").unwrap();
    assert!(code.starts_with("// Code generated by bebopc. DO NOT EDIT."));
    assert!(code.contains("pub struct Instrument(pub u32);"));
    assert!(code.contains("pub struct Musician {\n    pub name: String,\n    pub plays: Instrument,\n}"));
    assert!(code.contains("    pub performers: Option<Vec<Musician>>,\n"));
    assert!(code.contains("    pub concert_date: Option<i64>,\n"));
    assert!(code.contains("pub enum Album {\n    StudioAlbum(StudioAlbum),\n    LiveAlbum(LiveAlbum),\n}"));
    assert!(code.contains("    pub albums: HashMap<Uuid, Album>,\n"));
    assert!(code.contains(&format!("pub const OPCODE: u32 = 0x{:08x};", u32::from_le_bytes(*b"SONG"))));
}

#[test]
fn test_compile_files_shares_one_namespace() {
    let dir = std::env::temp_dir().join(format!("bebop-compile-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let first = dir.join("first.bop");
    let second = dir.join("second.bop");
    std::fs::write(&first, "struct A { B b; }").unwrap();
    std::fs::write(&second, "message B { 1 -> A[] a; }").unwrap();

    let schema = compile_files(&[&first, &second], SchemaOptions::default()).unwrap();
    assert_eq!(schema.len(), 2);
    assert_eq!(schema.get("B").unwrap().fields[0].type_, TypeExpr::Array(Box::new(TypeExpr::Defined("A".into()))));

    let err = compile_files(&[dir.join("missing.bop")], SchemaOptions::default()).unwrap_err();
    assert!(matches!(err, BebopError::Io(_)), "{:?}", err);

    std::fs::remove_dir_all(&dir).unwrap();
}
