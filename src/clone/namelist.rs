//! `user_nl_<component>` rewrite for one clone

use std::path::{Path, PathBuf};

use namelist_core::NamelistDocument;
use tracing::debug;

use crate::error::Result;

pub fn namelist_path(case_dir: &Path, component: &str) -> PathBuf {
    case_dir.join(format!("user_nl_{}", component))
}

/// Drop every line setting one of `purge`, then append `assignments`.
/// Returns the number of dropped lines.
pub fn rewrite_namelist(path: &Path, purge: &[String], assignments: &[(String, String)]) -> Result<usize> {
    let mut doc = NamelistDocument::read(path)?;
    let removed = doc.remove_keys(purge);
    for (key, value) in assignments {
        doc.push(key, value);
    }
    doc.write_atomic(path)?;
    debug!(path = %path.display(), removed, appended = assignments.len(), "namelist rewritten");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rewrite_keeps_unrelated_lines() {
        let dir = tempdir().unwrap();
        let path = namelist_path(dir.path(), "cam");
        std::fs::write(&path, "! user namelist\nnhtfrq = 0\na = 7\nmfilt=1\nb =3").unwrap();

        let removed = rewrite_namelist(
            &path,
            &["a".to_string(), "b".to_string()],
            &[("a".to_string(), "1".to_string()), ("b".to_string(), "10".to_string())],
        )
        .unwrap();

        assert_eq!(removed, 2);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "! user namelist\nnhtfrq = 0\nmfilt=1\na = 1\nb = 10\n");
    }

    #[test]
    fn test_missing_namelist_fails() {
        let dir = tempdir().unwrap();
        let path = namelist_path(dir.path(), "clm");
        assert!(rewrite_namelist(&path, &[], &[("x".to_string(), "1".to_string())]).is_err());
    }
}
