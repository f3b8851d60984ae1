//! Namelist document model
//!
//! A document is an ordered list of lines. Assignment lines (`key = value`)
//! are parsed into entries; anything else (comments, blank lines, Fortran
//! group markers) is carried verbatim. Entries keep their original text so
//! that serializing an untouched document reproduces the input exactly.

use std::fmt;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{NamelistError, Result};

/// One physical line of a namelist file, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Entry { key: String, value: String, raw: String },
    Verbatim(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('!') {
            return Line::Verbatim(raw.to_string());
        }
        match trimmed.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Line::Entry {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
                raw: raw.to_string(),
            },
            _ => Line::Verbatim(raw.to_string()),
        }
    }

    /// Key of an assignment line, `None` for passthrough lines.
    pub fn key(&self) -> Option<&str> {
        match self {
            Line::Entry { key, .. } => Some(key),
            Line::Verbatim(_) => None,
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Line::Entry { raw, .. } => raw,
            Line::Verbatim(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamelistDocument {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl NamelistDocument {
    pub fn parse(text: &str) -> Self {
        let lines = text
            .split_inclusive('\n')
            .map(|l| Line::parse(l.strip_suffix('\n').unwrap_or(l)))
            .collect();
        Self {
            lines,
            trailing_newline: text.ends_with('\n'),
        }
    }

    /// Read and parse a namelist file. A missing file is an error; CIME
    /// always creates `user_nl_*` files when a case is cloned.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| NamelistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Value of the last assignment to `key`, which is the one the model honours.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(Line::key)
    }

    /// Drop every assignment whose key is in `keys`. Returns how many lines were removed.
    pub fn remove_keys<S: AsRef<str>>(&mut self, keys: &[S]) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| match line.key() {
            Some(k) => !keys.iter().any(|purge| purge.as_ref() == k),
            None => true,
        });
        before - self.lines.len()
    }

    /// Append `key = value` at the end of the document.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let raw = format!("{} = {}", key, value);
        self.lines.push(Line::Entry { key, value, raw });
        self.trailing_newline = true;
    }

    /// Replace every assignment to the given keys with fresh ones appended at the end.
    pub fn merge<K, V, I>(&mut self, assignments: I) -> usize
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let assignments: Vec<(String, String)> = assignments
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let keys: Vec<&str> = assignments.iter().map(|(k, _)| k.as_str()).collect();
        let removed = self.remove_keys(&keys);
        for (key, value) in assignments {
            self.push(key, value);
        }
        removed
    }

    /// Replace `path` with this document. The content goes to a temporary
    /// file in the same directory first, so readers see either the old or
    /// the new file and never a partial one.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => return Err(NamelistError::NoParent(path.to_path_buf())),
        };
        let write_err = |source| NamelistError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.to_string().as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!(path = %path.display(), lines = self.lines.len(), "namelist written");
        Ok(())
    }
}

impl fmt::Display for NamelistDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line.raw())?;
        }
        if self.trailing_newline && !self.lines.is_empty() {
            f.write_str("\n")?;
        }
        Ok(())
    }
}
