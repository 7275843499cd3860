//! Errors of the fallible surfaces: manifest loading and CLI input handling.
//! Synthesis itself never fails.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON, or JSON that does not fit the expected structure.
    #[error("{origin}: at JSON path {path} → {message}")]
    Json {
        origin: String,
        path: String,
        message: String,
    },

    #[error("{origin}: JSON pointer {pointer} selects nothing")]
    Pointer { origin: String, pointer: String },

    #[error("invalid input pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("unreadable glob match: {0}")]
    GlobEntry(#[from] glob::GlobError),

    #[error("glob pattern matched no files: {0}")]
    NoMatch(String),

    /// A `$component` payload names a schema the manifest does not declare.
    #[error("unknown component {name:?} (referenced at {at})")]
    UnknownComponent { name: String, at: String },

    #[error("no input documents")]
    NoInput,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
