//! Command line interface
//!
//! `plan` and `clone` work from a YAML sweep file; `submit` and `resubmit`
//! replay the manifest written next to the clones.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::clone::{CaseLattice, CloneManifest};
use crate::config::SweepConfig;
use crate::exec::ProcessRunner;
use crate::safety::{AutoConfirm, Confirmation, StdinConfirmation};
use crate::submit::CaseStatusDetector;

/// Case Lattice - parameter sweeps over CESM case clones
#[derive(Parser, Debug)]
#[command(name = "case-lattice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the lattice a sweep file expands to
    Plan {
        sweep: PathBuf,
    },
    /// Create one case clone per lattice point
    Clone(CloneArgs),
    /// Submit every clone recorded in a clone directory
    Submit(SubmitArgs),
    /// Submit again the clones whose last run errored or stalled
    Resubmit {
        #[command(flatten)]
        submit: SubmitArgs,
        /// Hours after which a started run without success counts as hung
        #[arg(long, default_value_t = 6)]
        stale_hours: u64,
    },
}

#[derive(Args, Debug)]
pub struct CloneArgs {
    pub sweep: PathBuf,
    /// Replace clones that already exist
    #[arg(long)]
    pub overwrite: bool,
    /// Remove the clone and output directories first
    #[arg(long)]
    pub clean_all: bool,
    /// Record clones from an earlier run without creating any
    #[arg(long)]
    pub read_existing: bool,
    /// Do not ask before removing directories
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Directory holding the clones and their manifest
    pub clone_dir: PathBuf,
    /// Print the submit commands without running them
    #[arg(long)]
    pub dry: bool,
    /// Append output of `case.submit` to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Plan { sweep } => plan(sweep),
            Commands::Clone(args) => clone(args).await,
            Commands::Submit(args) => {
                let lattice = from_manifest(&args).await?;
                let submitted = lattice.submit_clone_runs(args.dry).await?;
                println!("{} clone run(s) submitted", submitted.len());
                Ok(())
            }
            Commands::Resubmit { submit, stale_hours } => {
                let detector = CaseStatusDetector::new(Duration::from_secs(stale_hours * 3600));
                let lattice = from_manifest(&submit).await?.with_hang_detector(Arc::new(detector));
                let submitted = lattice.resubmit_hung_clone_runs(submit.dry).await?;
                for path in &submitted {
                    println!("{}", path.display());
                }
                println!("{} hung clone run(s) resubmitted", submitted.len());
                Ok(())
            }
        }
    }
}

fn plan(sweep: PathBuf) -> Result<()> {
    let config = SweepConfig::load(&sweep).with_context(|| format!("loading {}", sweep.display()))?;
    let lattice = config.build().context("building lattice")?;
    let table = lattice
        .builder()
        .table()
        .context("sweep produced no lattice")?;
    print!("{}", table);
    println!("{} lattice point(s)", table.len());
    Ok(())
}

async fn clone(args: CloneArgs) -> Result<()> {
    let config = SweepConfig::load(&args.sweep).with_context(|| format!("loading {}", args.sweep.display()))?;
    let confirmation: Arc<dyn Confirmation> = if args.yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(StdinConfirmation)
    };
    let mut lattice = config
        .build()
        .context("building lattice")?
        .with_confirmation(confirmation);

    let mut options = config.clone.clone();
    options.overwrite |= args.overwrite;
    options.clean_all |= args.clean_all;
    options.read_existing_clones |= args.read_existing;

    let records = lattice
        .create_clones(&options)
        .await
        .with_context(|| format!("cloning {}", options.root_case.display()))?;
    for record in records {
        println!("{}", record.case_dir.display());
    }
    println!("{} clone(s) at {}", records.len(), options.clone_dir().display());
    Ok(())
}

async fn from_manifest(args: &SubmitArgs) -> Result<CaseLattice> {
    let manifest = CloneManifest::load(&args.clone_dir)
        .await
        .with_context(|| format!("no clone manifest in {}", args.clone_dir.display()))?;
    let runner = match &args.log_file {
        Some(path) => ProcessRunner::new().with_log_file(path),
        None => ProcessRunner::new(),
    };
    Ok(CaseLattice::new(manifest.component, Default::default())
        .with_runner(Arc::new(runner))
        .with_clones(manifest.clones))
}
