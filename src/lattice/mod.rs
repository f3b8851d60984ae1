//! Parameter Lattice
//!
//! Declares sweep dimensions and expands them into a table of run
//! configurations, one row per clone.

mod axis;
mod builder;
mod table;
mod value;

pub use axis::{Axis, AxisSpec, GROUP_DELIMITER};
pub use builder::LatticeBuilder;
pub use table::{ExpansionMode, LatticeTable, Row};
pub use value::{linspace, ParamValue};
