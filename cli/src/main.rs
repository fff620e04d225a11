use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use brine_bebop::{decode_to_json, encode_from_json};
use brine_bebop_compiler::{compile_files, generate, BebopError, GeneratorRegistry, ProjectConfig, Schema, SchemaOptions};

#[derive(Parser)]
#[command(name = "bebopc")]
#[command(about = "Check, generate code from, and inspect payloads of Bebop schemas", long_about = None)]
struct Cli {
    /// Project file listing inputs, namespace and generator outputs
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Namespace recorded in the schema options (overrides the project file)
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Log compiler progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate schema files
    Check {
        /// Input `.bop` files (defaults to the project file's inputs)
        files: Vec<PathBuf>,
    },

    /// Generate source code from schema files
    Gen {
        /// Generator alias
        #[arg(short, long)]
        generator: Option<String>,

        /// Output file (if omitted, prints to stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Input `.bop` files (defaults to the project file's inputs)
        files: Vec<PathBuf>,
    },

    /// Decode a binary payload to JSON (printed to stdout)
    Decode {
        /// Name of the definition the payload holds
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Binary payload file
        #[arg(short, long)]
        input: PathBuf,

        /// Input `.bop` files (defaults to the project file's inputs)
        files: Vec<PathBuf>,
    },

    /// Encode a JSON document to a binary payload
    Encode {
        /// Name of the definition to encode
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// JSON document
        #[arg(short, long)]
        input: PathBuf,

        /// Output payload file
        #[arg(short, long)]
        out: PathBuf,

        /// Input `.bop` files (defaults to the project file's inputs)
        files: Vec<PathBuf>,
    },
}

/// Command-line flags layered over an optional project file.
struct Project {
    config:  ProjectConfig,
    options: SchemaOptions,
}

impl Project {
    fn load(cli: &Cli) -> Result<Project, BebopError> {
        let config = match &cli.config {
            Some(path) => ProjectConfig::load(path)?,
            None => ProjectConfig::default(),
        };
        let mut options = config.schema_options();
        if let Some(namespace) = &cli.namespace {
            options.namespace = Some(namespace.clone());
        }
        Ok(Project { config, options })
    }

    fn compile(&self, files: &[PathBuf]) -> Result<Schema, BebopError> {
        let inputs = if files.is_empty() { self.config.inputs.as_slice() } else { files };
        if inputs.is_empty() {
            return Err(BebopError::Config(
                "no schema files given and no inputs in the project file".to_string(),
            ));
        }
        debug!(files = inputs.len(), "compiling schema");
        compile_files(inputs, self.options.clone())
    }
}

fn write_output(path: &Path, contents: &[u8]) -> Result<(), BebopError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

fn main() -> Result<(), BebopError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let project = Project::load(&cli)?;

    match &cli.command {
        Commands::Check { files } => {
            let schema = project.compile(files)?;
            println!("OK: {} definitions", schema.len());
            Ok(())
        }

        Commands::Gen { generator, out, files } => {
            let schema = project.compile(files)?;
            let registry = GeneratorRegistry::builtin();

            // An explicit generator or output wins; otherwise run every
            // generator the project file lists.
            if generator.is_some() || out.is_some() || project.config.generators.is_empty() {
                let alias = generator.as_deref().unwrap_or("rust");
                let code = generate(&schema, &registry, alias)?;
                match out {
                    Some(path) => {
                        write_output(path, code.as_bytes())?;
                        println!("Generated {} code written to {}", alias, path.display());
                    }
                    None => print!("{}", code),
                }
            } else {
                for output in &project.config.generators {
                    let code = generate(&schema, &registry, &output.alias)?;
                    write_output(&output.out, code.as_bytes())?;
                    println!("Generated {} code written to {}", output.alias, output.out.display());
                }
            }
            Ok(())
        }

        Commands::Decode { type_name, input, files } => {
            let schema = project.compile(files)?;
            let data = fs::read(input)?;
            let json = decode_to_json(&schema, type_name, &data)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }

        Commands::Encode { type_name, input, out, files } => {
            let schema = project.compile(files)?;
            let text = fs::read_to_string(input)?;
            let json: serde_json::Value = serde_json::from_str(&text)?;
            let bytes = encode_from_json(&schema, type_name, &json)?;
            write_output(out, &bytes)?;
            println!("Encoded {} ({} bytes) to {}", type_name, bytes.len(), out.display());
            Ok(())
        }
    }
}
