//! Submission & Resubmission
//!
//! Batch submission of recorded clones through each clone's `case.submit`,
//! and targeted resubmission of clones whose last run was interrupted.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::clone::{CaseLattice, CloneRecord};
use crate::error::{LatticeError, Result};

lazy_static::lazy_static! {
    /// `case.run` lifecycle events written by CIME into `CaseStatus`
    static ref CASE_RUN_EVENT: Regex = Regex::new(r"case\.run (starting|success|error)").unwrap();
}

/// Decides whether a recorded clone needs to be submitted again.
#[async_trait]
pub trait HangDetector: Send + Sync {
    async fn is_hung(&self, clone: &CloneRecord) -> Result<bool>;
}

/// Reads `<clone>/CaseStatus`. A clone is hung when its last `case.run`
/// event is an `error`, or a `starting` older than `stale_after` with no
/// `success` after it. Clones without a status file never ran and are
/// left alone.
#[derive(Debug, Clone)]
pub struct CaseStatusDetector {
    stale_after: Duration,
}

impl CaseStatusDetector {
    pub fn new(stale_after: Duration) -> Self {
        Self { stale_after }
    }
}

impl Default for CaseStatusDetector {
    fn default() -> Self {
        Self::new(Duration::from_secs(6 * 60 * 60))
    }
}

#[async_trait]
impl HangDetector for CaseStatusDetector {
    async fn is_hung(&self, clone: &CloneRecord) -> Result<bool> {
        let path = clone.case_dir.join("CaseStatus");
        if !path.exists() {
            return Ok(false);
        }
        let status = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LatticeError::io(&path, e))?;

        let last = CASE_RUN_EVENT
            .captures_iter(&status)
            .last()
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let hung = match last.as_deref() {
            Some("error") => true,
            Some("starting") => {
                let modified = tokio::fs::metadata(&path)
                    .await
                    .and_then(|m| m.modified())
                    .map_err(|e| LatticeError::io(&path, e))?;
                modified.elapsed().map(|age| age >= self.stale_after).unwrap_or(false)
            }
            _ => false,
        };
        debug!(case = %clone.case_name, event = ?last, hung, "case status checked");
        Ok(hung)
    }
}

impl CaseLattice {
    /// Run `case.submit` in every recorded clone. With `dry`, print the
    /// commands instead.
    pub async fn submit_clone_runs(&self, dry: bool) -> Result<Vec<PathBuf>> {
        if self.clones().is_empty() {
            return Err(LatticeError::NoClones);
        }
        let mut submitted = Vec::with_capacity(self.clones().len());
        for record in self.clones() {
            self.submit_one(record, dry).await?;
            submitted.push(record.case_dir.clone());
        }
        info!(count = submitted.len(), dry, "clone runs submitted");
        Ok(submitted)
    }

    /// Submit again only the clones the hang detector flags.
    pub async fn resubmit_hung_clone_runs(&self, dry: bool) -> Result<Vec<PathBuf>> {
        if self.clones().is_empty() {
            return Err(LatticeError::NoClones);
        }
        let mut hung = Vec::new();
        for record in self.clones() {
            if self.detector().is_hung(record).await? {
                hung.push(record);
            }
        }
        info!(hung = hung.len(), total = self.clones().len(), "hung clones detected");

        let mut submitted = Vec::with_capacity(hung.len());
        for record in hung {
            self.submit_one(record, dry).await?;
            submitted.push(record.case_dir.clone());
        }
        Ok(submitted)
    }

    async fn submit_one(&self, record: &CloneRecord, dry: bool) -> Result<()> {
        let cmd = self.tools().case_submit(&record.case_dir);
        if dry {
            println!("{}", cmd);
            return Ok(());
        }
        info!(case = %record.case_name, "submitting job from {}", cmd.program.display());
        self.runner().run_checked(&cmd).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::RecordingRunner;
    use crate::exec::CimeTools;
    use crate::lattice::ExpansionMode;
    use chrono::Utc;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(dir: &Path, name: &str) -> CloneRecord {
        let case_dir = dir.join(name);
        std::fs::create_dir_all(&case_dir).unwrap();
        CloneRecord {
            case_name: name.to_string(),
            case_dir,
            output_dir: None,
            parameters: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn lattice(runner: Arc<RecordingRunner>, clones: Vec<CloneRecord>) -> CaseLattice {
        CaseLattice::new("cam", ExpansionMode::Combinatorial)
            .with_runner(runner)
            .with_tools(CimeTools::new("/opt/cime/scripts"))
            .with_clones(clones)
    }

    #[tokio::test]
    async fn test_submit_requires_clones() {
        let lattice = lattice(Arc::new(RecordingRunner::new()), Vec::new());
        assert!(matches!(lattice.submit_clone_runs(false).await, Err(LatticeError::NoClones)));
        assert!(matches!(
            lattice.resubmit_hung_clone_runs(true).await,
            Err(LatticeError::NoClones)
        ));
    }

    #[tokio::test]
    async fn test_submit_every_clone() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let clones = vec![record(dir.path(), "c__a_1"), record(dir.path(), "c__a_2")];
        let lattice = lattice(runner.clone(), clones);

        let submitted = lattice.submit_clone_runs(false).await.unwrap();

        assert_eq!(submitted, vec![dir.path().join("c__a_1"), dir.path().join("c__a_2")]);
        let calls = runner.calls_to("case.submit");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].cwd.as_deref(), Some(dir.path().join("c__a_2").as_path()));
    }

    #[tokio::test]
    async fn test_dry_submit_runs_nothing() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let lattice = lattice(runner.clone(), vec![record(dir.path(), "c__a_1")]);

        let submitted = lattice.submit_clone_runs(true).await.unwrap();
        assert_eq!(submitted.len(), 1);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_case_status_detection() {
        let dir = tempdir().unwrap();
        let detector = CaseStatusDetector::new(Duration::ZERO);

        let never_ran = record(dir.path(), "fresh");
        assert!(!detector.is_hung(&never_ran).await.unwrap());

        let finished = record(dir.path(), "done");
        std::fs::write(
            finished.case_dir.join("CaseStatus"),
            "2024-01-01 00:00:00: case.run starting 1\n2024-01-01 01:00:00: case.run success\n",
        )
        .unwrap();
        assert!(!detector.is_hung(&finished).await.unwrap());

        let failed = record(dir.path(), "failed");
        std::fs::write(failed.case_dir.join("CaseStatus"), "case.run starting\ncase.run error\n").unwrap();
        assert!(detector.is_hung(&failed).await.unwrap());

        let stuck = record(dir.path(), "stuck");
        std::fs::write(stuck.case_dir.join("CaseStatus"), "case.run success\ncase.run starting\n").unwrap();
        assert!(detector.is_hung(&stuck).await.unwrap());
        assert!(!CaseStatusDetector::default().is_hung(&stuck).await.unwrap());
    }

    #[tokio::test]
    async fn test_resubmit_only_hung_clones() {
        let dir = tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let ok = record(dir.path(), "c__a_1");
        let broken = record(dir.path(), "c__a_2");
        std::fs::write(broken.case_dir.join("CaseStatus"), "case.run error\n").unwrap();
        let lattice = lattice(runner.clone(), vec![ok, broken]);

        let submitted = lattice.resubmit_hung_clone_runs(false).await.unwrap();

        assert_eq!(submitted, vec![dir.path().join("c__a_2")]);
        assert_eq!(runner.calls_to("case.submit").len(), 1);
    }
}
