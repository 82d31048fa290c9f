//! Output formatting module.

pub mod status;
pub mod table;

pub use status::*;
pub use table::*;
