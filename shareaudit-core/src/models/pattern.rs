use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sensitivity-matching rule as stored in `sensitive_patterns`. Compiled
/// by the pattern registry into a `regex::Regex`; kept here as the plain
/// data shape the store round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: Uuid,
    pub regex: String,
    pub category: String,
    pub description: String,
    pub enabled: bool,
}

impl Pattern {
    pub fn new(
        regex: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            regex: regex.into(),
            category: category.into(),
            description: description.into(),
            enabled: true,
        }
    }
}
