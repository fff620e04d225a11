use std::collections::BTreeMap;

use tracing::debug;

use crate::{error::BebopError, gen_rust::RustGenerator, types::Schema};

/// A code generation backend for one target language.
pub trait Generator: Send + Sync {
    /// Short name used on the command line, e.g. `rust`.
    fn alias(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Renders the whole schema as source text.
    fn compile(&self, schema: &Schema) -> Result<String, BebopError>;
}

/// The set of available backends, keyed by alias. Built once and passed
/// down to whatever needs to generate code.
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new(generators: Vec<Box<dyn Generator>>) -> GeneratorRegistry {
        GeneratorRegistry {
            generators: generators.into_iter().map(|g| (g.alias(), g)).collect(),
        }
    }

    /// Every backend that ships with the compiler.
    pub fn builtin() -> GeneratorRegistry {
        GeneratorRegistry::new(vec![Box::new(RustGenerator)])
    }

    pub fn get(&self, alias: &str) -> Result<&dyn Generator, BebopError> {
        match self.generators.get(alias) {
            Some(generator) => {
                debug!(alias, name = generator.name(), "selected generator");
                Ok(generator.as_ref())
            }
            None => Err(BebopError::Generator(format!(
                "no generator named \"{}\" (available: {})",
                alias,
                self.aliases().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    pub fn aliases(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        GeneratorRegistry::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaOptions;

    struct Echo;

    impl Generator for Echo {
        fn alias(&self) -> &'static str {
            "echo"
        }

        fn name(&self) -> &'static str {
            "Echo"
        }

        fn compile(&self, schema: &Schema) -> Result<String, BebopError> {
            Ok(schema
                .definitions()
                .iter()
                .map(|d| d.name.clone())
                .collect::<Vec<_>>()
                .join(","))
        }
    }

    #[test]
    fn test_lookup_by_alias() {
        let registry = GeneratorRegistry::new(vec![Box::new(Echo), Box::new(RustGenerator)]);
        assert_eq!(registry.aliases().collect::<Vec<_>>(), vec!["echo", "rust"]);
        let schema = Schema::new(SchemaOptions::default(), Vec::new());
        assert_eq!(registry.get("echo").unwrap().compile(&schema).unwrap(), "");
    }

    #[test]
    fn test_unknown_alias() {
        let registry = GeneratorRegistry::builtin();
        match registry.get("cobol") {
            Err(BebopError::Generator(msg)) => assert!(msg.contains("available: rust"), "{}", msg),
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("expected an error"),
        }
    }
}
