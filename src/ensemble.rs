//! Initial-condition ensembles
//!
//! An ensemble is a single-axis lattice over the `NCDATA` setting: one
//! clone per initial-condition file, named `ens01`, `ens02`, ...

use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::clone::{CaseLattice, CloneOptions, CloneRecord};
use crate::error::{LatticeError, Result};
use crate::lattice::{AxisSpec, ExpansionMode};

pub const NCDATA: &str = "NCDATA";

pub struct Ensemble {
    lattice: CaseLattice,
    members: usize,
}

impl Ensemble {
    pub fn new(component: impl Into<String>) -> Self {
        Self::from_lattice(CaseLattice::new(component, ExpansionMode::Combinatorial))
    }

    /// Wrap a configured lattice (runner, tools, ...). It must not have
    /// axes yet.
    pub fn from_lattice(lattice: CaseLattice) -> Self {
        Self { lattice, members: 0 }
    }

    pub fn lattice(&self) -> &CaseLattice {
        &self.lattice
    }

    pub fn len(&self) -> usize {
        self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members == 0
    }

    /// One member per regular file in `ic_dir` whose name matches the
    /// `*` / `?` wildcard `pattern` (all files when `None`). Returns the
    /// sorted initial-condition paths.
    pub fn add_members(&mut self, ic_dir: &Path, pattern: Option<&str>) -> Result<Vec<PathBuf>> {
        let matcher = wildcard_regex(pattern.unwrap_or("*"))?;
        let entries = std::fs::read_dir(ic_dir).map_err(|e| LatticeError::io(ic_dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LatticeError::io(ic_dir, e))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if path.is_file() && matcher.is_match(&name) {
                files.push(path);
            }
        }
        files.sort();
        if files.is_empty() {
            return Err(LatticeError::configuration(format!(
                "no initial condition files in {} match {}",
                ic_dir.display(),
                pattern.unwrap_or("*")
            )));
        }

        let values: Vec<String> = files.iter().map(|f| format!("\"{}\"", f.display())).collect();
        self.lattice.expand(AxisSpec::values(NCDATA, values))?;
        self.members = files.len();
        info!(members = self.members, dir = %ic_dir.display(), "ensemble members added");
        Ok(files)
    }

    /// Clone one case per member with suffixes `ens01`, `ens02`, ...
    /// Any `clone_suffixes` in `options` are replaced.
    pub async fn create_members(&mut self, options: &CloneOptions) -> Result<&[CloneRecord]> {
        let options = CloneOptions {
            clone_suffixes: Some(member_suffixes(self.members)),
            ..options.clone()
        };
        self.lattice.create_clones(&options).await
    }

    pub async fn submit_members(&self, dry: bool) -> Result<Vec<PathBuf>> {
        self.lattice.submit_clone_runs(dry).await
    }
}

fn member_suffixes(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("ens{:02}", i)).collect()
}

/// Translate a shell wildcard into an anchored regex.
fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| LatticeError::configuration(format!("bad pattern {}: {}", pattern, e)))
}
