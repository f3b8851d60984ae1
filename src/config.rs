//! Sweep configuration
//!
//! A YAML file describing one sweep end to end: the component, the axes,
//! optional row filters and the clone options.
//!
//! ```yaml
//! component: cam
//! mode: combinatorial
//! axes:
//!   - name: clubb_c1
//!     limits: [0.5, 2.0]
//!     nsamples: 4
//!   - name: "p1,p2"
//!     group: diff
//!     values: ["2,2", "4,4"]
//!   - name: STOP_N
//!     xml: true
//!     values: [5]
//! filter:
//!   - lhs: clubb_c1
//!     op: "<="
//!     rhs: 1.5
//! clone:
//!   root_case: /glade/cases/cam_root
//!   top_clone_dir: /glade/cases/sweep
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::clone::{CaseLattice, CloneOptions};
use crate::error::{LatticeError, Result};
use crate::exec::{CimeTools, ProcessRunner};
use crate::lattice::{AxisSpec, ExpansionMode, ParamValue, Row};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub component: String,
    #[serde(default)]
    pub mode: ExpansionMode,
    /// Overrides `CIME_SCRIPTS`
    #[serde(default)]
    pub cime_scripts: Option<PathBuf>,
    /// Where output of the CIME tools goes
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    pub axes: Vec<AxisConfig>,
    #[serde(default)]
    pub filter: Vec<FilterRule>,
    #[serde(default)]
    pub clone: CloneOptions,
}

/// One axis. `name` holds comma separated members when `group` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub name: String,
    #[serde(default)]
    pub values: Option<Vec<ParamValue>>,
    #[serde(default)]
    pub limits: Option<(f64, f64)>,
    #[serde(default)]
    pub nsamples: Option<usize>,
    #[serde(default)]
    pub xml: bool,
    /// Group label; marks the axis as grouped
    #[serde(default)]
    pub group: Option<String>,
}

impl From<&AxisConfig> for AxisSpec {
    fn from(axis: &AxisConfig) -> Self {
        AxisSpec {
            names: vec![axis.name.clone()],
            values: axis.values.clone().map(|v| vec![v]),
            limits: axis.limits.map(|l| vec![l]),
            nsamples: axis.nsamples.map(|n| vec![n]),
            xml_routed: axis.xml,
            grouped: axis.group.is_some(),
            group_labels: axis.group.clone().map(|g| vec![g]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

/// Right-hand side of a filter: another column or a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Column { column: String },
    Value(ParamValue),
}

/// Keep rows where `lhs op rhs` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub lhs: String,
    pub op: FilterOp,
    pub rhs: Operand,
}

impl FilterRule {
    pub fn matches(&self, row: &Row<'_>) -> bool {
        let Some(lhs) = row.get(&self.lhs) else {
            return false;
        };
        let rhs = match &self.rhs {
            Operand::Column { column } => match row.get(column) {
                Some(value) => value,
                None => return false,
            },
            Operand::Value(value) => value,
        };
        let Some(ord) = lhs.compare(rhs) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ord.is_eq(),
            FilterOp::Ne => ord.is_ne(),
            FilterOp::Lt => ord.is_lt(),
            FilterOp::Le => ord.is_le(),
            FilterOp::Gt => ord.is_gt(),
            FilterOp::Ge => ord.is_ge(),
        }
    }

    fn columns(&self) -> Vec<&str> {
        let mut columns = vec![self.lhs.as_str()];
        if let Operand::Column { column } = &self.rhs {
            columns.push(column);
        }
        columns
    }
}

impl SweepConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LatticeError::io(path, e))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: SweepConfig = serde_yaml::from_str(content)?;
        if config.axes.is_empty() {
            return Err(LatticeError::configuration("sweep declares no axes"));
        }
        Ok(config)
    }

    pub fn tools(&self) -> CimeTools {
        match &self.cime_scripts {
            Some(dir) => CimeTools::new(dir),
            None => CimeTools::from_env(),
        }
    }

    pub fn runner(&self) -> ProcessRunner {
        match &self.log_file {
            Some(path) => ProcessRunner::new().with_log_file(path),
            None => ProcessRunner::new(),
        }
    }

    /// Declare every axis, then apply the filters.
    pub fn build(&self) -> Result<CaseLattice> {
        let mut lattice = CaseLattice::new(&self.component, self.mode)
            .with_tools(self.tools())
            .with_runner(Arc::new(self.runner()));
        for axis in &self.axes {
            lattice.expand(AxisSpec::from(axis))?;
        }
        self.apply_filters(&mut lattice)?;
        Ok(lattice)
    }

    pub fn apply_filters(&self, lattice: &mut CaseLattice) -> Result<()> {
        if self.filter.is_empty() {
            return Ok(());
        }
        let table = lattice.builder().table().ok_or(LatticeError::LatticeNotBuilt)?;
        for rule in &self.filter {
            if let Some(unknown) = rule.columns().into_iter().find(|c| table.column_index(c).is_none()) {
                return Err(LatticeError::configuration(format!(
                    "filter refers to unknown column {}",
                    unknown
                )));
            }
        }
        let before = table.len();
        lattice.filter_by(|row| self.filter.iter().all(|rule| rule.matches(row)))?;
        info!(
            before,
            after = lattice.builder().table().map_or(0, |t| t.len()),
            "filters applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWEEP: &str = r#"
component: cam
mode: combinatorial
cime_scripts: /opt/cime/scripts
axes:
  - name: a
    values: [1, 2]
  - name: b
    values: [1, 3]
  - name: "p1, p2"
    group: diff
    values: ["2,2", "4,4"]
  - name: STOP_N
    xml: true
    values: [5]
filter:
  - lhs: a
    op: "=="
    rhs: 1
  - lhs: b
    op: ">="
    rhs: { column: a }
clone:
  root_case: /cases/root
  top_clone_dir: /cases/sweep
  resubmits: 1
"#;

    #[test]
    fn test_parse_sweep() {
        let config = SweepConfig::from_yaml(SWEEP).unwrap();
        assert_eq!(config.component, "cam");
        assert_eq!(config.axes.len(), 4);
        assert_eq!(config.axes[2].group.as_deref(), Some("diff"));
        assert!(config.axes[3].xml);
        assert_eq!(config.filter[0].op, FilterOp::Eq);
        assert_eq!(config.filter[1].rhs, Operand::Column { column: "a".to_string() });
        assert_eq!(config.clone.root_case, PathBuf::from("/cases/root"));
        assert_eq!(config.clone.resubmits, 1);
        assert!(!config.clone.overwrite);
        assert_eq!(config.tools().scripts_dir(), Path::new("/opt/cime/scripts"));
    }

    #[test]
    fn test_build_applies_filters() {
        let config = SweepConfig::from_yaml(SWEEP).unwrap();
        let lattice = config.build().unwrap();
        let table = lattice.lattice().unwrap();

        // a == 1 keeps half of 2*2*2*1 rows, b >= a keeps both b values
        assert_eq!(table.len(), 4);
        assert_eq!(table.columns(), &["a", "b", "p1,p2", "STOP_N"]);
        assert!(table.rows().all(|r| r.get("a") == Some(&ParamValue::Int(1))));
    }

    #[test]
    fn test_unknown_filter_column() {
        let mut config = SweepConfig::from_yaml(SWEEP).unwrap();
        config.filter[0].lhs = "nope".to_string();
        let err = config.build().err().unwrap();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_sampled_axis_and_mode() {
        let config = SweepConfig::from_yaml(
            "component: clm\nmode: paired\naxes:\n  - name: x\n    limits: [0, 1]\n    nsamples: 3\n  - name: y\n    values: [1, 2, 3]\n",
        )
        .unwrap();
        assert_eq!(config.mode, ExpansionMode::Paired);
        let lattice = config.build().unwrap();
        let x: Vec<String> = lattice
            .lattice()
            .unwrap()
            .column("x")
            .unwrap()
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(x, vec!["0.0", "0.5", "1.0"]);
    }

    #[test]
    fn test_no_axes_rejected() {
        assert!(SweepConfig::from_yaml("component: cam\naxes: []\n").is_err());
    }
}
