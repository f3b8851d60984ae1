//! Namelist Core
//!
//! Structured model for the line-oriented `key = value` files that CIME
//! cases read their user namelist overrides from (`user_nl_cam`, `user_nl_eam`, ...).
//! Untouched lines survive a parse/serialize round trip byte for byte.

mod document;
mod error;

pub use document::{Line, NamelistDocument};
pub use error::{NamelistError, Result};
