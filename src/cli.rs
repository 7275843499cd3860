//! Minimal CLI: synthesize schemas from JSON documents, or build a whole
//! document from a manifest.
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::path_de;
use crate::schema::Synthesizer;

const STDIN: &str = "-";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// synthesize OpenAPI 3.0 schemas from example JSON, or build a full document from a manifest
#[derive(Parser, Debug)]
#[command(name = "openapi-synth", version)]
pub struct CommandLineInterface {
    /// log debug events (OPENAPI_SYNTH_LOG overrides)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// log errors only
    #[arg(short, long, global = true, default_value_t = false, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// synthesize one schema per input document
    Schema(SchemaOut),
    /// build an OpenAPI document from a JSON manifest
    Document(DocumentOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// single-line JSON
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[derive(Args, Debug)]
struct DocumentOut {
    /// manifest .json file
    #[arg(short, long)]
    manifest: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// single-line JSON
    #[arg(long, default_value_t = false)]
    compact: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Feed every selected document to `apply`, tagged with where it came from.
    fn load_process(&self, mut apply: impl FnMut(&str, Value)) -> Result<()> {
        for (origin, source) in self.sources()? {
            if self.ndjson {
                for (index, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let origin = format!("{origin}:{}", index + 1);
                    let value = path_de::from_str_with_path::<Value>(&origin, line)?;
                    apply(origin.as_str(), self.select(&origin, value)?);
                }
            } else {
                let value = path_de::from_str_with_path::<Value>(&origin, &source)?;
                apply(origin.as_str(), self.select(&origin, value)?);
            }
        }
        Ok(())
    }

    fn sources(&self) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for pattern in &self.input {
            if pattern == STDIN {
                let mut source = String::new();
                std::io::stdin()
                    .read_to_string(&mut source)
                    .map_err(|err| Error::io("<stdin>", err))?;
                out.push(("<stdin>".to_owned(), source));
                continue;
            }
            for path in resolve_file_path_patterns([pattern])? {
                let source = std::fs::read_to_string(&path).map_err(|err| Error::io(&path, err))?;
                out.push((path.to_string_lossy().into_owned(), source));
            }
        }
        Ok(out)
    }

    fn select(&self, origin: &str, value: Value) -> Result<Value> {
        let Some(pointer) = self.json_pointer.as_deref() else {
            return Ok(value);
        };
        value.pointer(pointer).cloned().ok_or_else(|| Error::Pointer {
            origin: origin.to_owned(),
            pointer: pointer.to_owned(),
        })
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let mut synth = Synthesizer::new();
                let mut schemas = Vec::new();
                target.input_settings.load_process(|origin, value| {
                    debug!(origin, "synthesizing document");
                    schemas.push(synth.make(&value).to_value());
                })?;
                let output = match schemas.len() {
                    0 => return Err(Error::NoInput),
                    1 => schemas.swap_remove(0),
                    _ => Value::Array(schemas),
                };
                write_output(target.out.as_deref(), &output, target.compact)
            }
            Command::Document(target) => {
                let manifest = Manifest::load(&target.manifest)?;
                let document = manifest.build()?.to_value();
                write_output(target.out.as_deref(), &document, target.compact)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, value: &Value, compact: bool) -> Result<()> {
    let rendered = if compact { value.to_string() } else { pretty(value) };
    let Some(out) = out else {
        println!("{rendered}");
        return Ok(());
    };
    if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    std::fs::write(out, rendered).map_err(|err| Error::io(out, err))?;
    info!(path = %out.display(), "wrote output");
    Ok(())
}

fn pretty(value: &Value) -> String {
    // A `Value` always serializes.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                return Err(Error::NoMatch(pattern.to_owned()));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
