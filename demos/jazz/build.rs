use std::env;
use std::fs;
use std::path::Path;

use brine_bebop_compiler::{compile_schema, compile_schema_to_rust, SchemaOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=jazz.bop");

    let text = fs::read_to_string("jazz.bop")?;
    let schema = compile_schema(&text, SchemaOptions::default())?;
    let code = compile_schema_to_rust(&schema)?;

    let out_dir = env::var("OUT_DIR")?;
    fs::write(Path::new(&out_dir).join("jazz.rs"), code)?;
    Ok(())
}
