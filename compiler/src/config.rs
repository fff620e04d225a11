use std::{fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::BebopError,
    types::{RustOptions, SchemaOptions},
};

/// One generator to run and where its output goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOutput {
    pub alias: String,
    pub out:   PathBuf,
}

/// Contents of a `bebop.json` project file. Relative paths are resolved
/// against the directory holding the file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub inputs:     Vec<PathBuf>,
    #[serde(default)]
    pub namespace:  Option<String>,
    #[serde(default)]
    pub generators: Vec<GeneratorOutput>,
    #[serde(default)]
    pub rust:       RustOptions,
}

impl ProjectConfig {
    pub fn from_json(text: &str) -> Result<ProjectConfig, BebopError> {
        serde_json::from_str(text).map_err(|e| BebopError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<ProjectConfig, BebopError> {
        debug!(path = %path.display(), "loading project config");
        let text = fs::read_to_string(path)
            .map_err(|e| BebopError::Config(format!("{}: {}", path.display(), e)))?;
        let mut config = ProjectConfig::from_json(&text)?;

        if let Some(base) = path.parent() {
            for input in &mut config.inputs {
                if input.is_relative() {
                    *input = base.join(&*input);
                }
            }
            for generator in &mut config.generators {
                if generator.out.is_relative() {
                    generator.out = base.join(&generator.out);
                }
            }
        }
        Ok(config)
    }

    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            namespace: self.namespace.clone(),
            rust:      self.rust.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let config = ProjectConfig::from_json(
            r#"{
                "inputs": ["schemas/jazz.bop"],
                "namespace": "jazz",
                "generators": [{ "alias": "rust", "out": "src/jazz.rs" }],
                "rust": { "module": "records" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.inputs, vec![PathBuf::from("schemas/jazz.bop")]);
        assert_eq!(config.generators[0].alias, "rust");
        let options = config.schema_options();
        assert_eq!(options.namespace.as_deref(), Some("jazz"));
        assert_eq!(options.rust.module.as_deref(), Some("records"));
    }

    #[test]
    fn test_defaults_and_unknown_keys() {
        assert_eq!(ProjectConfig::from_json("{}").unwrap(), ProjectConfig::default());
        let err = ProjectConfig::from_json(r#"{ "input": [] }"#).unwrap_err();
        assert!(matches!(err, BebopError::Config(_)), "{:?}", err);
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = std::env::temp_dir().join(format!("bebop-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bebop.json");
        fs::write(&path, r#"{ "inputs": ["a.bop"], "generators": [{ "alias": "rust", "out": "out.rs" }] }"#).unwrap();

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.inputs, vec![dir.join("a.bop")]);
        assert_eq!(config.generators[0].out, dir.join("out.rs"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
