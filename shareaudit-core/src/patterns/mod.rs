//! Single-pass filename classifier driven from the `sensitive_patterns`
//! table, with a built-in default set used when that table is empty.

mod defaults;
mod registry;

pub use defaults::default_patterns;
pub use registry::{ClassifierMatch, PatternSet};
