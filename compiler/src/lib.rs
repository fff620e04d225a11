//! brine-bebop-compiler
//!
//! This crate implements:
//!  1) A regex tokenizer and recursive-descent parser for `.bop` schemas,
//!  2) The schema type model and a fail-fast validator,
//!  3) Structural deduplication of inline array and map types,
//!  4) Lowering to the runtime descriptor used by the dynamic codec,
//!  5) A generator registry with a Rust backend (`compile_schema_to_rust` → `String`),
//!  6) Error types (`BebopError`) and `bebop.json` project configuration.

pub mod compiler;
pub mod config;
pub mod error;
pub mod gen_rust;
pub mod generator;
pub mod lower;
pub mod nameless;
pub mod parser;
pub mod tokenizer;
pub mod types;
pub mod utils;
pub mod verifier;

pub use compiler::{compile_files, compile_schema, generate, load_tokens};
pub use config::{GeneratorOutput, ProjectConfig};
pub use error::{BebopError, Span};
pub use gen_rust::{compile_schema_to_rust, RustGenerator};
pub use generator::{Generator, GeneratorRegistry};
pub use lower::lower_schema;
pub use nameless::{NamelessType, NamelessTypes};
pub use parser::{parse_schema, SchemaParser};
pub use types::*;
