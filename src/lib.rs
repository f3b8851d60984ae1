//! Case Lattice
//!
//! Parameter sweeps over Earth-system model cases. A `LatticeBuilder`
//! expands declared axes into a table of run configurations; a
//! `CaseLattice` clones a root case once per row, rewrites each clone's
//! namelist, routes XML settings through `xmlchange` and submits the runs.

pub mod cli;
pub mod clone;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod exec;
pub mod lattice;
pub mod safety;
pub mod submit;
pub mod utils;

pub use cli::Cli;
pub use clone::{CaseLattice, CloneManifest, CloneOptions, CloneRecord};
pub use config::SweepConfig;
pub use ensemble::Ensemble;
pub use error::{LatticeError, Result};
pub use exec::{CimeTools, CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use lattice::{AxisSpec, ExpansionMode, LatticeBuilder, LatticeTable, ParamValue};
pub use safety::{AutoConfirm, Confirmation, StdinConfirmation};
pub use submit::{CaseStatusDetector, HangDetector};
