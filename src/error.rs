//! Error types for lattice construction and clone orchestration

use std::path::PathBuf;

/// Crate result type
pub type Result<T> = std::result::Result<T, LatticeError>;

#[derive(Debug, thiserror::Error)]
pub enum LatticeError {
    /// Malformed or contradictory axis / clone arguments
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("parameter {name} already exists in the lattice")]
    DuplicateAxis { name: String },

    #[error("at least 2 dimensions are needed to form a lattice, have {declared}")]
    InsufficientDimensions { declared: usize },

    #[error("filter mask has {mask} entries but the lattice has {rows} points")]
    MaskLengthMismatch { mask: usize, rows: usize },

    #[error("lattice must first be built by calling expand()")]
    LatticeNotBuilt,

    #[error("root case {path} does not exist")]
    RootCaseNotFound { path: PathBuf },

    #[error("{kind} at {path} already exists")]
    ClonePathConflict { kind: &'static str, path: PathBuf },

    #[error("clone cases must first be created by calling create_clones()")]
    NoClones,

    #[error("{command} exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Namelist(#[from] namelist_core::NamelistError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LatticeError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LatticeError::Configuration {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LatticeError::Io {
            path: path.into(),
            source,
        }
    }
}
