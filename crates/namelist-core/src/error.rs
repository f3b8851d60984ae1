//! Error types for namelist documents

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, NamelistError>;

#[derive(Debug, thiserror::Error)]
pub enum NamelistError {
    #[error("failed to read namelist {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write namelist {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("namelist path {0} has no parent directory")]
    NoParent(PathBuf),
}
