//! Lattice builder
//!
//! Collects axis declarations and rebuilds the table from scratch after
//! each `expand`. A filter applied before a later `expand` is therefore
//! lost; callers filter as the last step before cloning.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::axis::{strip_whitespace, Axis, AxisSpec, GROUP_DELIMITER};
use super::table::{ExpansionMode, LatticeTable, Row};
use super::value::{linspace, ParamValue};
use crate::error::{LatticeError, Result};

const CALL_ERR: &str = "either ('values') or ('limits' and 'nsamples') must be passed, not both";

#[derive(Debug, Clone, Default)]
pub struct LatticeBuilder {
    mode: ExpansionMode,
    axes: Vec<Axis>,
    table: Option<LatticeTable>,
}

impl LatticeBuilder {
    pub fn new(mode: ExpansionMode) -> Self {
        Self {
            mode,
            axes: Vec::new(),
            table: None,
        }
    }

    pub fn mode(&self) -> ExpansionMode {
        self.mode
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.name() == name)
    }

    /// Every parameter name the lattice sets, group members included.
    pub fn parameter_names(&self) -> Vec<String> {
        self.axes.iter().flat_map(|a| a.members().iter().cloned()).collect()
    }

    /// The lattice, once it has at least two dimensions.
    pub fn lattice(&self) -> Result<&LatticeTable> {
        if self.axes.len() < 2 {
            return Err(LatticeError::InsufficientDimensions {
                declared: self.axes.len(),
            });
        }
        self.table.as_ref().ok_or(LatticeError::LatticeNotBuilt)
    }

    /// The current table regardless of its dimension; single-axis sweeps
    /// are still cloned row by row.
    pub fn table(&self) -> Option<&LatticeTable> {
        self.table.as_ref()
    }

    /// Add one or more dimensions and rebuild the lattice.
    ///
    /// Nothing is changed when validation fails.
    pub fn expand(&mut self, spec: AxisSpec) -> Result<()> {
        let count = spec.names.len();
        if count == 0 {
            return Err(LatticeError::configuration("expand needs at least one name"));
        }

        let labels = if spec.grouped {
            self.check_group_labels(&spec, count)?
        } else {
            Vec::new()
        };

        let mut taken_members: HashSet<String> = self.parameter_names().into_iter().collect();
        let mut taken_columns: HashSet<String> =
            self.axes.iter().map(|a| a.name().to_string()).collect();
        let mut names = Vec::with_capacity(count);

        for raw in &spec.names {
            let members = if spec.grouped {
                let name = strip_whitespace(raw);
                let members: Vec<String> = name.split(GROUP_DELIMITER).map(str::to_string).collect();
                if members.len() < 2 || members.iter().any(String::is_empty) {
                    return Err(LatticeError::configuration(format!(
                        "grouped name {} must list two or more parameters separated by '{}'",
                        raw, GROUP_DELIMITER
                    )));
                }
                let unique: HashSet<&String> = members.iter().collect();
                if unique.len() != members.len() {
                    return Err(LatticeError::configuration(format!(
                        "parameter group {} contains duplicates",
                        name
                    )));
                }
                members
            } else {
                let name = raw.trim().to_string();
                if name.is_empty() {
                    return Err(LatticeError::configuration("axis name must not be empty"));
                }
                if name.contains(GROUP_DELIMITER) {
                    warn!(name = %name, "comma in axis name; should this axis be grouped?");
                }
                vec![name]
            };

            let column = members.join(GROUP_DELIMITER);
            if !taken_columns.insert(column.clone()) {
                return Err(LatticeError::DuplicateAxis { name: column });
            }
            for member in &members {
                if !taken_members.insert(member.clone()) {
                    return Err(LatticeError::DuplicateAxis {
                        name: member.clone(),
                    });
                }
            }
            names.push(members);
        }

        let value_sets = match (&spec.values, &spec.limits, &spec.nsamples) {
            (Some(values), None, None) => explicit_values(&spec, &names, values)?,
            (None, Some(limits), Some(nsamples)) => {
                if spec.grouped {
                    return Err(LatticeError::configuration(
                        "auto-generation of values from limits can not be used for grouped axes; use values",
                    ));
                }
                sampled_values(&names, limits, nsamples)?
            }
            _ => return Err(LatticeError::configuration(CALL_ERR)),
        };

        let mut axes = self.axes.clone();
        for (i, (members, values)) in names.into_iter().zip(value_sets).enumerate() {
            let axis = if spec.grouped {
                Axis::grouped(members, labels[i].clone(), spec.xml_routed, values)
            } else {
                let name = members.into_iter().next().unwrap_or_default();
                Axis::single(name, spec.xml_routed, values)
            };
            debug!(axis = %axis.name(), values = axis.len(), xml = axis.xml_routed(), "axis added");
            axes.push(axis);
        }

        let table = LatticeTable::build(&axes, self.mode)?;
        self.axes = axes;
        self.table = Some(table);
        Ok(())
    }

    /// Drop the rows whose mask entry is false.
    pub fn filter(&mut self, mask: &[bool]) -> Result<()> {
        let table = self.table.as_mut().ok_or(LatticeError::LatticeNotBuilt)?;
        let before = table.len();
        table.retain_mask(mask)?;
        debug!(before, after = table.len(), "lattice filtered");
        Ok(())
    }

    /// Filter with a mask computed from each row.
    pub fn filter_by<F>(&mut self, keep: F) -> Result<()>
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let mask: Vec<bool> = self
            .table
            .as_ref()
            .ok_or(LatticeError::LatticeNotBuilt)?
            .rows()
            .map(|row| keep(&row))
            .collect();
        self.filter(&mask)
    }

    fn check_group_labels(&self, spec: &AxisSpec, count: usize) -> Result<Vec<String>> {
        let labels = spec
            .group_labels
            .as_ref()
            .ok_or_else(|| LatticeError::configuration("group_label must be passed if grouped is set"))?;
        if labels.len() != count {
            return Err(LatticeError::configuration(format!(
                "{} group labels given for {} grouped axes",
                labels.len(),
                count
            )));
        }

        let mut seen: HashSet<&str> = self.axes.iter().filter_map(Axis::group_label).collect();
        for label in labels {
            if label.trim().is_empty() {
                return Err(LatticeError::configuration("group_label must not be empty"));
            }
            if !seen.insert(label.as_str()) {
                return Err(LatticeError::configuration(format!(
                    "group_label with name {} already exists in the lattice",
                    label
                )));
            }
        }
        Ok(labels.clone())
    }
}

fn explicit_values(
    spec: &AxisSpec,
    names: &[Vec<String>],
    values: &[Vec<ParamValue>],
) -> Result<Vec<Vec<ParamValue>>> {
    if values.len() != names.len() {
        return Err(LatticeError::configuration(
            "args 'names' and 'values' must be of equal length",
        ));
    }

    let mut out = Vec::with_capacity(values.len());
    for (members, axis_values) in names.iter().zip(values) {
        if axis_values.is_empty() {
            return Err(LatticeError::configuration(format!(
                "axis {} has no values",
                members.join(GROUP_DELIMITER)
            )));
        }
        if !spec.grouped {
            out.push(axis_values.clone());
            continue;
        }

        let mut grouped = Vec::with_capacity(axis_values.len());
        for value in axis_values {
            let text = strip_whitespace(&value.to_string());
            let parts: Vec<&str> = text.split(GROUP_DELIMITER).collect();
            if parts.iter().any(|p| p.is_empty()) {
                return Err(LatticeError::configuration(format!(
                    "group value {} for ({}) has an empty member",
                    text,
                    members.join(GROUP_DELIMITER)
                )));
            }
            if parts.len() != members.len() {
                return Err(LatticeError::configuration(format!(
                    "mismatch in number of group parameters ({}) and values ({})",
                    members.join(GROUP_DELIMITER),
                    text
                )));
            }
            grouped.push(ParamValue::Text(text));
        }
        out.push(grouped);
    }
    Ok(out)
}

fn sampled_values(
    names: &[Vec<String>],
    limits: &[(f64, f64)],
    nsamples: &[usize],
) -> Result<Vec<Vec<ParamValue>>> {
    if limits.len() != names.len() || nsamples.len() != names.len() {
        return Err(LatticeError::configuration(
            "args 'names', 'limits', and 'nsamples' must all be of equal length",
        ));
    }
    limits
        .iter()
        .zip(nsamples)
        .zip(names)
        .map(|((&(lo, hi), &n), members)| {
            if n == 0 {
                return Err(LatticeError::configuration(format!(
                    "nsamples for {} must be at least 1",
                    members.join(GROUP_DELIMITER)
                )));
            }
            Ok(linspace(lo, hi, n).into_iter().map(ParamValue::Float).collect())
        })
        .collect()
}
