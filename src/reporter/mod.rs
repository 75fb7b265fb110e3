//! Output formats for diagnostics.

pub mod console;
pub mod json;
pub mod sarif;
