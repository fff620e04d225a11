use std::{fs, path::Path};

use tracing::debug;

use crate::{
    error::BebopError,
    generator::GeneratorRegistry,
    parser::SchemaParser,
    tokenizer::{concat_token_streams, tokenize_schema, Token},
    types::{Schema, SchemaOptions},
};

/// Tokenizes, parses and validates schema text.
pub fn compile_schema(text: &str, options: SchemaOptions) -> Result<Schema, BebopError> {
    let tokens = tokenize_schema(text)?;
    compile_tokens(tokens, options)
}

/// Compiles several schema files as one schema, so definitions may refer to
/// types declared in any of them.
pub fn compile_files<P: AsRef<Path>>(paths: &[P], options: SchemaOptions) -> Result<Schema, BebopError> {
    let tokens = load_tokens(paths)?;
    compile_tokens(tokens, options)
}

/// Reads and tokenizes every file, joining the results into one stream.
pub fn load_tokens<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Token>, BebopError> {
    let mut streams = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading schema file");
        let text = fs::read_to_string(path)?;
        streams.push(tokenize_schema(&text)?);
    }
    Ok(concat_token_streams(streams))
}

fn compile_tokens(tokens: Vec<Token>, options: SchemaOptions) -> Result<Schema, BebopError> {
    debug!(tokens = tokens.len(), "tokenized schema");
    let mut parser = SchemaParser::new(options);
    let schema = parser.evaluate(tokens)?;
    schema.validate()?;
    Ok(schema)
}

/// Renders a compiled schema with the generator registered under `alias`.
pub fn generate(schema: &Schema, registry: &GeneratorRegistry, alias: &str) -> Result<String, BebopError> {
    registry.get(alias)?.compile(schema)
}
