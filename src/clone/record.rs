//! Clone records and the on-disk manifest
//!
//! The manifest lets `submit` / `resubmit` run in a later process than the
//! one that created the clones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{LatticeError, Result};

pub const MANIFEST_FILE: &str = ".lattice_clones.json";

/// One created (or rediscovered) clone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneRecord {
    pub case_name: String,
    pub case_dir: PathBuf,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Column name and value of the lattice point, in column order
    pub parameters: Vec<(String, String)>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneManifest {
    pub component: String,
    pub root_case: PathBuf,
    pub clones: Vec<CloneRecord>,
}

impl CloneManifest {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path_in(dir);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .await
            .map_err(|e| LatticeError::io(&path, e))
    }

    pub async fn load(dir: &Path) -> Result<Self> {
        let path = Self::path_in(dir);
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| LatticeError::io(&path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_manifest_persistence() {
        let dir = tempdir().unwrap();
        let manifest = CloneManifest {
            component: "cam".to_string(),
            root_case: PathBuf::from("/cases/root"),
            clones: vec![CloneRecord {
                case_name: "root__a_1".to_string(),
                case_dir: dir.path().join("root__a_1"),
                output_dir: None,
                parameters: vec![("a".to_string(), "1".to_string())],
                created_at: Utc::now(),
            }],
        };

        manifest.save(dir.path()).await.unwrap();
        assert!(dir.path().join(MANIFEST_FILE).exists());
        let loaded = CloneManifest::load(dir.path()).await.unwrap();
        assert_eq!(loaded, manifest);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_io_error() {
        let dir = tempdir().unwrap();
        let err = CloneManifest::load(dir.path()).await.unwrap_err();
        assert!(matches!(err, LatticeError::Io { .. }));
    }
}
