//! Removal Guard
//!
//! `clean_all` and `overwrite` delete whole directory trees. These checks
//! refuse targets whose loss would be far worse than a bad sweep.

use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::error::{LatticeError, Result};

/// True when deleting `target` would take out the filesystem root, the home
/// directory, or any of the `protected` paths (e.g. the root case).
pub fn is_dangerous_removal(target: &Path, protected: &[&Path]) -> bool {
    let normal_parts = target
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    if normal_parts == 0 {
        return true;
    }
    if target.components().any(|c| matches!(c, Component::ParentDir)) {
        return true;
    }

    let target = normalized(target);
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() && normalized(Path::new(&home)) == target {
            return true;
        }
    }

    protected.iter().any(|p| normalized(p).starts_with(&target))
}

/// Absolute form of `path`, with symlinks and `..` resolved when it exists.
fn normalized(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Delete `target` recursively after the danger checks. A missing target is fine.
pub fn remove_tree(target: &Path, protected: &[&Path]) -> Result<()> {
    if is_dangerous_removal(target, protected) {
        return Err(LatticeError::Aborted(format!(
            "refusing to remove {}",
            target.display()
        )));
    }
    if !target.exists() {
        return Ok(());
    }
    info!(path = %target.display(), "removing directory tree");
    std::fs::remove_dir_all(target).map_err(|e| LatticeError::io(target, e))
}
