//! CIME case utilities
//!
//! Builds the command lines for the three CIME tools the orchestrator uses.
//! `create_clone` lives in the CIME scripts directory; `xmlchange` and
//! `case.submit` are per-case entry points inside each clone.

use std::path::{Path, PathBuf};

use super::CommandSpec;

/// Scripts directory relative to `$HOME` when `CIME_SCRIPTS` is unset.
pub const DEFAULT_CIME_SCRIPTS: &str = "CESM/cesm2.2/cime/scripts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CimeTools {
    scripts_dir: PathBuf,
}

impl CimeTools {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    /// `$CIME_SCRIPTS`, falling back to `~/CESM/cesm2.2/cime/scripts`.
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var("CIME_SCRIPTS") {
            return Self::new(dir);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Self::new(Path::new(&home).join(DEFAULT_CIME_SCRIPTS))
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// `create_clone --case <case> --clone <root> [--cime-output-root <out>] --keepexe`
    pub fn create_clone(&self, case: &Path, root_case: &Path, output_root: Option<&Path>) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.scripts_dir.join("create_clone"))
            .arg("--case")
            .path_arg(case)
            .arg("--clone")
            .path_arg(root_case);
        if let Some(out) = output_root {
            cmd = cmd.arg("--cime-output-root").path_arg(out);
        }
        cmd.arg("--keepexe")
    }

    /// `./xmlchange KEY=VALUE`, run from inside the case.
    pub fn xmlchange(&self, case: &Path, key: &str, value: &str) -> CommandSpec {
        let case = absolute_case(case);
        CommandSpec::new(case.join("xmlchange"))
            .arg(format!("{}={}", key, value))
            .current_dir(case)
    }

    /// `./case.submit`, run from inside the case.
    pub fn case_submit(&self, case: &Path) -> CommandSpec {
        let case = absolute_case(case);
        CommandSpec::new(case.join("case.submit")).current_dir(case)
    }
}

/// The child changes into the case before exec, so a relative program
/// path would resolve against the case directory twice.
fn absolute_case(case: &Path) -> PathBuf {
    std::path::absolute(case).unwrap_or_else(|_| case.to_path_buf())
}

impl Default for CimeTools {
    fn default() -> Self {
        Self::from_env()
    }
}
