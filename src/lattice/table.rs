//! Lattice table
//!
//! Rows of parameter values under an ordered column schema. Columns are
//! addressed by name through the schema, never by position guessing.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::axis::Axis;
use super::value::ParamValue;
use crate::error::{LatticeError, Result};

/// How axis value sequences are combined into rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionMode {
    /// Every combination of values across axes
    #[default]
    Combinatorial,
    /// Row i takes the i-th value of every axis; axes must be equally long
    Paired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatticeTable {
    columns: Vec<String>,
    rows: Vec<Vec<ParamValue>>,
}

impl LatticeTable {
    pub(crate) fn build(axes: &[Axis], mode: ExpansionMode) -> Result<Self> {
        let columns = axes.iter().map(|a| a.name().to_string()).collect();
        let rows = match mode {
            ExpansionMode::Combinatorial => cartesian_rows(axes),
            ExpansionMode::Paired => paired_rows(axes)?,
        };
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            columns: &self.columns,
            cells,
        })
    }

    /// Every value of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&ParamValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub(crate) fn retain_mask(&mut self, mask: &[bool]) -> Result<()> {
        if mask.len() != self.rows.len() {
            return Err(LatticeError::MaskLengthMismatch {
                mask: mask.len(),
                rows: self.rows.len(),
            });
        }
        let mut keep = mask.iter();
        self.rows.retain(|_| keep.next().copied().unwrap_or(false));
        Ok(())
    }
}

impl fmt::Display for LatticeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(ToString::to_string).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| cells.iter().map(|r| r[i].len()).fold(c.len(), usize::max))
            .collect();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = w))
            .collect();
        writeln!(f, "{}", header.join("  ").trim_end())?;
        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(v, w)| format!("{:<w$}", v, w = w))
                .collect();
            writeln!(f, "{}", line.join("  ").trim_end())?;
        }
        Ok(())
    }
}

/// A borrowed view of one lattice point.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [ParamValue],
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Option<&'a ParamValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.cells.get(idx)
    }

    pub fn cells(&self) -> &'a [ParamValue] {
        self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a ParamValue)> {
        self.columns.iter().map(String::as_str).zip(self.cells.iter())
    }
}

/// Full product of the axes. The first declared axis varies fastest, so
/// `a = [0, 1]`, `b = [10, 20]` gives (0,10), (1,10), (0,20), (1,20).
fn cartesian_rows(axes: &[Axis]) -> Vec<Vec<ParamValue>> {
    if axes.is_empty() {
        return Vec::new();
    }
    let total: usize = axes.iter().map(Axis::len).product();
    let mut rows = Vec::with_capacity(total);
    for index in 0..total {
        let mut rem = index;
        let mut row = Vec::with_capacity(axes.len());
        for axis in axes {
            row.push(axis.values()[rem % axis.len()].clone());
            rem /= axis.len();
        }
        rows.push(row);
    }
    rows
}

fn paired_rows(axes: &[Axis]) -> Result<Vec<Vec<ParamValue>>> {
    let Some(first) = axes.first() else {
        return Ok(Vec::new());
    };
    if let Some(odd) = axes.iter().find(|a| a.len() != first.len()) {
        return Err(LatticeError::configuration(format!(
            "paired lattice needs equal-length axes: {} has {} values, {} has {}",
            first.name(),
            first.len(),
            odd.name(),
            odd.len()
        )));
    }
    Ok((0..first.len())
        .map(|i| axes.iter().map(|a| a.values()[i].clone()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(name: &str, values: &[i64]) -> Axis {
        Axis::single(name.to_string(), false, values.iter().map(|v| ParamValue::Int(*v)).collect())
    }

    fn ints(table: &LatticeTable) -> Vec<Vec<i64>> {
        table
            .rows()
            .map(|r| {
                r.cells()
                    .iter()
                    .map(|c| c.as_f64().unwrap() as i64)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_cartesian_first_axis_fastest() {
        let table =
            LatticeTable::build(&[axis("a", &[0, 1]), axis("b", &[10, 20])], ExpansionMode::Combinatorial)
                .unwrap();
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(ints(&table), vec![vec![0, 10], vec![1, 10], vec![0, 20], vec![1, 20]]);
    }

    #[test]
    fn test_cartesian_row_count_is_product() {
        let axes = [axis("a", &[1, 2, 3]), axis("b", &[1, 2]), axis("c", &[7, 8, 9, 10])];
        let table = LatticeTable::build(&axes, ExpansionMode::Combinatorial).unwrap();
        assert_eq!(table.len(), 24);
    }

    #[test]
    fn test_paired_zips_and_rejects_ragged() {
        let table =
            LatticeTable::build(&[axis("a", &[0, 1]), axis("b", &[10, 20])], ExpansionMode::Paired).unwrap();
        assert_eq!(ints(&table), vec![vec![0, 10], vec![1, 20]]);

        let err = LatticeTable::build(&[axis("a", &[0, 1]), axis("b", &[10])], ExpansionMode::Paired)
            .unwrap_err();
        assert!(matches!(err, LatticeError::Configuration { .. }));
    }

    #[test]
    fn test_mask_keeps_order_and_checks_length() {
        let mut table =
            LatticeTable::build(&[axis("a", &[0, 1]), axis("b", &[10, 20])], ExpansionMode::Combinatorial)
                .unwrap();
        assert!(matches!(
            table.retain_mask(&[true]),
            Err(LatticeError::MaskLengthMismatch { mask: 1, rows: 4 })
        ));

        table.retain_mask(&[false, true, false, true]).unwrap();
        assert_eq!(ints(&table), vec![vec![1, 10], vec![1, 20]]);
    }

    #[test]
    fn test_row_lookup_by_name() {
        let table = LatticeTable::build(&[axis("a", &[5]), axis("b", &[6])], ExpansionMode::Combinatorial)
            .unwrap();
        let row = table.row(0).unwrap();
        assert_eq!(row.get("b"), Some(&ParamValue::Int(6)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(table.column("a").unwrap(), vec![&ParamValue::Int(5)]);
    }
}
