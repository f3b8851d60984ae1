//! Clone Orchestrator
//!
//! `CaseLattice` owns a lattice builder and turns every retained lattice
//! point into a CESM case clone: `create_clone`, a rewritten
//! `user_nl_<component>`, and `xmlchange` calls for XML-routed axes.

mod namelist;
mod naming;
mod record;

pub use namelist::{namelist_path, rewrite_namelist};
pub use naming::{case_name, default_suffix, resolve_suffixes, CASE_DELIMITER};
pub use record::{CloneManifest, CloneRecord, MANIFEST_FILE};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{LatticeError, Result};
use crate::exec::{CimeTools, CommandRunner, ProcessRunner};
use crate::lattice::{AxisSpec, ExpansionMode, LatticeBuilder, LatticeTable, Row};
use crate::safety::{is_dangerous_removal, remove_tree, Confirmation, StdinConfirmation};
use crate::submit::{CaseStatusDetector, HangDetector};

/// Options of one `create_clones` pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneOptions {
    pub root_case: PathBuf,
    /// Defaults to the parent directory of `root_case`
    pub top_clone_dir: Option<PathBuf>,
    /// Passed to `create_clone` as `--cime-output-root`
    pub top_output_dir: Option<PathBuf>,
    /// Defaults to the base name of `root_case`
    pub clone_prefix: Option<String>,
    pub clone_suffixes: Option<Vec<String>>,
    pub overwrite: bool,
    pub clean_all: bool,
    pub resubmits: u32,
    pub read_existing_clones: bool,
}

impl CloneOptions {
    pub fn new(root_case: impl Into<PathBuf>) -> Self {
        Self {
            root_case: root_case.into(),
            ..Default::default()
        }
    }

    pub fn clone_dir(&self) -> PathBuf {
        match &self.top_clone_dir {
            Some(dir) => dir.clone(),
            None => self
                .root_case
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf(),
        }
    }

    /// Copy with `root_case`, `top_clone_dir` and `top_output_dir` made
    /// absolute against the current directory. Clone paths end up in
    /// records and as working directories of the case scripts. Existing
    /// directories are canonicalized.
    pub fn absolute(&self) -> Result<Self> {
        let absolute = |path: &Path| {
            path.canonicalize()
                .or_else(|_| std::path::absolute(path))
                .map_err(|e| LatticeError::io(path, e))
        };
        Ok(Self {
            root_case: absolute(&self.root_case)?,
            top_clone_dir: self.top_clone_dir.as_deref().map(absolute).transpose()?,
            top_output_dir: self.top_output_dir.as_deref().map(absolute).transpose()?,
            ..self.clone()
        })
    }

    fn prefix(&self) -> Result<String> {
        if let Some(prefix) = &self.clone_prefix {
            return Ok(prefix.clone());
        }
        self.root_case
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                LatticeError::configuration(format!(
                    "can not derive a clone prefix from {}",
                    self.root_case.display()
                ))
            })
    }
}

/// Everything needed to create one clone, computed before any side effect.
#[derive(Debug, Clone)]
struct PlannedClone {
    case_name: String,
    case_dir: PathBuf,
    output_dir: Option<PathBuf>,
    parameters: Vec<(String, String)>,
    namelist: Vec<(String, String)>,
    xml: Vec<(String, String)>,
}

impl PlannedClone {
    fn into_record(self) -> CloneRecord {
        CloneRecord {
            case_name: self.case_name,
            case_dir: self.case_dir,
            output_dir: self.output_dir,
            parameters: self.parameters,
            created_at: Utc::now(),
        }
    }
}

pub struct CaseLattice {
    component: String,
    builder: LatticeBuilder,
    tools: CimeTools,
    runner: Arc<dyn CommandRunner>,
    confirmation: Arc<dyn Confirmation>,
    detector: Arc<dyn HangDetector>,
    clones: Vec<CloneRecord>,
}

impl CaseLattice {
    /// A lattice for `component` (`cam`, `clm`, ...) whose namelist file is
    /// `user_nl_<component>`.
    pub fn new(component: impl Into<String>, mode: ExpansionMode) -> Self {
        Self {
            component: component.into(),
            builder: LatticeBuilder::new(mode),
            tools: CimeTools::from_env(),
            runner: Arc::new(ProcessRunner::new()),
            confirmation: Arc::new(StdinConfirmation),
            detector: Arc::new(CaseStatusDetector::default()),
            clones: Vec::new(),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_tools(mut self, tools: CimeTools) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_confirmation(mut self, confirmation: Arc<dyn Confirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_hang_detector(mut self, detector: Arc<dyn HangDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Records from an earlier run, e.g. a loaded `CloneManifest`.
    pub fn with_clones(mut self, clones: Vec<CloneRecord>) -> Self {
        self.clones = clones;
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn builder(&self) -> &LatticeBuilder {
        &self.builder
    }

    pub fn tools(&self) -> &CimeTools {
        &self.tools
    }

    pub(crate) fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub(crate) fn detector(&self) -> &dyn HangDetector {
        self.detector.as_ref()
    }

    pub fn expand(&mut self, spec: AxisSpec) -> Result<()> {
        self.builder.expand(spec)
    }

    pub fn filter(&mut self, mask: &[bool]) -> Result<()> {
        self.builder.filter(mask)
    }

    pub fn filter_by<F>(&mut self, keep: F) -> Result<()>
    where
        F: Fn(&Row<'_>) -> bool,
    {
        self.builder.filter_by(keep)
    }

    pub fn lattice(&self) -> Result<&LatticeTable> {
        self.builder.lattice()
    }

    pub fn clones(&self) -> &[CloneRecord] {
        &self.clones
    }

    /// Create one clone per retained lattice point.
    ///
    /// Clones are created in row order. A failure stops the pass; clones
    /// created before it stay on disk and in `clones()`.
    pub async fn create_clones(&mut self, options: &CloneOptions) -> Result<&[CloneRecord]> {
        if options.read_existing_clones && (options.overwrite || options.clean_all) {
            return Err(LatticeError::configuration(
                "read_existing_clones can not be combined with overwrite or clean_all",
            ));
        }
        let table = self.builder.table().ok_or(LatticeError::LatticeNotBuilt)?;
        if !options.root_case.is_dir() {
            return Err(LatticeError::RootCaseNotFound {
                path: options.root_case.clone(),
            });
        }

        let options = options.absolute()?;
        let root_case = options.root_case.as_path();
        let top_clone_dir = options.clone_dir();
        let top_output_dir = options.top_output_dir.as_deref();
        let prefix = options.prefix()?;
        let suffixes = resolve_suffixes(table, self.builder.axes(), options.clone_suffixes.as_deref())?;
        let plan = self.plan(table, &suffixes, &prefix, &top_clone_dir, top_output_dir);
        self.clones.clear();

        let mut manifest = CloneManifest {
            component: self.component.clone(),
            root_case: root_case.to_path_buf(),
            clones: Vec::new(),
        };

        if options.read_existing_clones {
            self.record_existing(plan);
            if top_clone_dir.is_dir() {
                manifest.clones = self.clones.clone();
                manifest.save(&top_clone_dir).await?;
            }
            return Ok(&self.clones);
        }

        if options.clean_all {
            self.clean(&top_clone_dir, top_output_dir, root_case)?;
        }
        for dir in std::iter::once(top_clone_dir.as_path()).chain(top_output_dir) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| LatticeError::io(dir, e))?;
        }
        // Records of an earlier pass must not survive this one.
        manifest.save(&top_clone_dir).await?;

        let purge = self.builder.parameter_names();
        info!(count = plan.len(), dir = %top_clone_dir.display(), "creating clones");

        for planned in plan {
            clear_conflicts(&planned, options.overwrite, root_case)?;

            let create = self.tools.create_clone(&planned.case_dir, root_case, top_output_dir);
            self.runner.run_checked(&create).await?;
            info!(case = %planned.case_name, "clone created");

            let nl_path = namelist_path(&planned.case_dir, &self.component);
            if planned.namelist.is_empty() && !nl_path.exists() {
                debug!(case = %planned.case_name, "no namelist parameters, skipping rewrite");
            } else {
                rewrite_namelist(&nl_path, &purge, &planned.namelist)?;
            }

            for (key, value) in &planned.xml {
                let cmd = self.tools.xmlchange(&planned.case_dir, key, value);
                self.runner.run_checked(&cmd).await?;
                debug!(case = %planned.case_name, key = %key, value = %value, "xmlchange");
            }
            if options.resubmits > 0 {
                let cmd = self
                    .tools
                    .xmlchange(&planned.case_dir, "RESUBMIT", &options.resubmits.to_string());
                self.runner.run_checked(&cmd).await?;
            }

            self.clones.push(planned.into_record());
            manifest.clones = self.clones.clone();
            manifest.save(&top_clone_dir).await?;
        }

        Ok(&self.clones)
    }

    fn plan(
        &self,
        table: &LatticeTable,
        suffixes: &[String],
        prefix: &str,
        top_clone_dir: &Path,
        top_output_dir: Option<&Path>,
    ) -> Vec<PlannedClone> {
        table
            .rows()
            .zip(suffixes)
            .map(|(row, suffix)| {
                let name = case_name(prefix, suffix);
                let mut namelist = Vec::new();
                let mut xml = Vec::new();
                for (axis, cell) in self.builder.axes().iter().zip(row.cells()) {
                    let target = if axis.xml_routed() { &mut xml } else { &mut namelist };
                    target.extend(axis.assignments(cell));
                }
                PlannedClone {
                    case_dir: top_clone_dir.join(&name),
                    output_dir: top_output_dir.map(|d| d.join(&name)),
                    parameters: row.iter().map(|(c, v)| (c.to_string(), v.to_string())).collect(),
                    case_name: name,
                    namelist,
                    xml,
                }
            })
            .collect()
    }

    fn record_existing(&mut self, plan: Vec<PlannedClone>) {
        for planned in plan {
            if planned.case_dir.is_dir() {
                debug!(case = %planned.case_name, "found existing clone");
                self.clones.push(planned.into_record());
            } else {
                warn!(path = %planned.case_dir.display(), "expected clone does not exist");
            }
        }
        info!(count = self.clones.len(), "recorded existing clones");
    }

    fn clean(&self, top_clone_dir: &Path, top_output_dir: Option<&Path>, root_case: &Path) -> Result<()> {
        let targets: Vec<&Path> = std::iter::once(top_clone_dir)
            .chain(top_output_dir)
            .filter(|p| p.exists())
            .collect();
        if targets.is_empty() {
            return Ok(());
        }
        if let Some(target) = targets.iter().find(|t| is_dangerous_removal(t, &[root_case])) {
            return Err(LatticeError::Aborted(format!(
                "refusing to remove {}",
                target.display()
            )));
        }

        let listing = targets
            .iter()
            .map(|t| t.display().to_string())
            .collect::<Vec<_>>()
            .join(" and ");
        if !self.confirmation.confirm(&format!("Removing {}", listing)) {
            return Err(LatticeError::Aborted("clean_all declined".to_string()));
        }
        for target in targets {
            warn!(path = %target.display(), "clean_all: removing");
            remove_tree(target, &[root_case])?;
        }
        Ok(())
    }
}

/// Fail on an existing clone or output directory unless `overwrite` is set,
/// in which case it is removed.
fn clear_conflicts(planned: &PlannedClone, overwrite: bool, root_case: &Path) -> Result<()> {
    let paths = [("clone", Some(&planned.case_dir)), ("output", planned.output_dir.as_ref())];
    if !overwrite {
        if let Some((kind, path)) = paths
            .iter()
            .find_map(|(kind, path)| path.filter(|p| p.exists()).map(|p| (*kind, p)))
        {
            return Err(LatticeError::ClonePathConflict {
                kind,
                path: path.clone(),
            });
        }
        return Ok(());
    }
    for (kind, path) in paths {
        if let Some(path) = path.filter(|p| p.exists()) {
            warn!(kind, path = %path.display(), "overwrite: removing existing directory");
            remove_tree(path, &[root_case])?;
        }
    }
    Ok(())
}
