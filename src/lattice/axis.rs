//! Axis declarations
//!
//! An `AxisSpec` is what callers hand to `expand`; it may declare several
//! axes at once. Validated specs become `Axis` values owned by the builder.

use serde::{Deserialize, Serialize};

use super::value::ParamValue;

/// Separator between the members of a grouped axis, in names and in values.
pub const GROUP_DELIMITER: &str = ",";

/// Arguments of one `expand` call.
///
/// Exactly one of `values` or `limits` + `nsamples` is expected; the builder
/// rejects anything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub names: Vec<String>,
    #[serde(default)]
    pub limits: Option<Vec<(f64, f64)>>,
    #[serde(default)]
    pub nsamples: Option<Vec<usize>>,
    #[serde(default)]
    pub values: Option<Vec<Vec<ParamValue>>>,
    /// Apply through `xmlchange` instead of the namelist file
    #[serde(default)]
    pub xml_routed: bool,
    #[serde(default)]
    pub grouped: bool,
    #[serde(default)]
    pub group_labels: Option<Vec<String>>,
}

impl AxisSpec {
    /// One axis with explicit values.
    pub fn values<V: Into<ParamValue>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            names: vec![name.into()],
            values: Some(vec![values.into_iter().map(Into::into).collect()]),
            ..Default::default()
        }
    }

    /// One axis of `nsamples` points spread over `[lo, hi]`.
    pub fn sampled(name: impl Into<String>, lo: f64, hi: f64, nsamples: usize) -> Self {
        Self {
            names: vec![name.into()],
            limits: Some(vec![(lo, hi)]),
            nsamples: Some(vec![nsamples]),
            ..Default::default()
        }
    }

    /// One grouped axis, e.g. `group("p1,p2", "diff", ["2,2", "4,4"])`.
    pub fn group<'a>(
        names: impl Into<String>,
        label: impl Into<String>,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            names: vec![names.into()],
            values: Some(vec![values.into_iter().map(ParamValue::from).collect()]),
            grouped: true,
            group_labels: Some(vec![label.into()]),
            ..Default::default()
        }
    }

    pub fn xml(mut self) -> Self {
        self.xml_routed = true;
        self
    }
}

/// A validated lattice dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    name: String,
    members: Vec<String>,
    group_label: Option<String>,
    xml_routed: bool,
    values: Vec<ParamValue>,
}

impl Axis {
    pub(crate) fn single(name: String, xml_routed: bool, values: Vec<ParamValue>) -> Self {
        Self {
            members: vec![name.clone()],
            name,
            group_label: None,
            xml_routed,
            values,
        }
    }

    pub(crate) fn grouped(
        members: Vec<String>,
        label: String,
        xml_routed: bool,
        values: Vec<ParamValue>,
    ) -> Self {
        Self {
            name: members.join(GROUP_DELIMITER),
            members,
            group_label: Some(label),
            xml_routed,
            values,
        }
    }

    /// Column name; the delimited member list for grouped axes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters this axis sets. A plain axis is its own single member.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn is_grouped(&self) -> bool {
        self.group_label.is_some()
    }

    pub fn group_label(&self) -> Option<&str> {
        self.group_label.as_deref()
    }

    pub fn xml_routed(&self) -> bool {
        self.xml_routed
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(parameter, value)` pairs that one cell of this axis stands for.
    pub fn assignments(&self, cell: &ParamValue) -> Vec<(String, String)> {
        if !self.is_grouped() {
            return vec![(self.name.clone(), cell.to_string())];
        }
        let text = cell.to_string();
        self.members
            .iter()
            .cloned()
            .zip(text.split(GROUP_DELIMITER).map(|v| v.trim().to_string()))
            .collect()
    }
}

/// Drop all whitespace, as grouped names and values are compared without it.
pub(crate) fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
