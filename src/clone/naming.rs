//! Clone naming
//!
//! Every clone is called `{prefix}__{suffix}`. Suffixes are either supplied
//! by the caller or derived from the row values.

use std::collections::HashSet;

use crate::error::{LatticeError, Result};
use crate::lattice::{Axis, LatticeTable, Row, GROUP_DELIMITER};

/// Separator between the prefix and the suffix, and between suffix parts.
pub const CASE_DELIMITER: &str = "__";

pub fn case_name(prefix: &str, suffix: &str) -> String {
    format!("{}{}{}", prefix, CASE_DELIMITER, suffix)
}

/// `{param}_{value}` per column, joined with `__`. Grouped columns use the
/// group label and join member values with `-`.
pub fn default_suffix(row: &Row<'_>, axes: &[Axis]) -> String {
    axes.iter()
        .zip(row.cells())
        .map(|(axis, cell)| {
            let text = cell.to_string();
            let (label, value) = match axis.group_label() {
                Some(label) => (label, text.split(GROUP_DELIMITER).map(str::trim).collect::<Vec<_>>().join("-")),
                None => (axis.name(), text),
            };
            format!("{}_{}", label, sanitize(&value))
        })
        .collect::<Vec<_>>()
        .join(CASE_DELIMITER)
}

/// Make `value` usable as a single path component.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// One suffix per row of `table`, checked for collisions before anything
/// touches the filesystem.
pub fn resolve_suffixes(table: &LatticeTable, axes: &[Axis], external: Option<&[String]>) -> Result<Vec<String>> {
    let suffixes = match external {
        None => table.rows().map(|row| default_suffix(&row, axes)).collect(),
        Some([shared]) => vec![shared.clone(); table.len()],
        Some(list) if list.len() == table.len() => list.to_vec(),
        Some(list) => {
            return Err(LatticeError::configuration(format!(
                "clone_suffixes must hold one entry or one per lattice point ({} given, {} points)",
                list.len(),
                table.len()
            )))
        }
    };

    let mut seen = HashSet::new();
    for suffix in &suffixes {
        if suffix.is_empty() || suffix.contains('/') {
            return Err(LatticeError::configuration(format!(
                "clone suffix '{}' is not a valid directory name",
                suffix
            )));
        }
        if !seen.insert(suffix.as_str()) {
            return Err(LatticeError::configuration(format!(
                "clone suffix '{}' is produced by more than one lattice point",
                suffix
            )));
        }
    }
    Ok(suffixes)
}
