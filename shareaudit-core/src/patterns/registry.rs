use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::models::Pattern;

/// One matching category returned by `classify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierMatch {
    pub category: String,
    pub description: String,
}

struct CompiledPattern {
    regex: Regex,
    category: String,
    description: String,
}

/// An immutable, compiled pattern set. Built once by `PatternSet::load` and
/// frozen behind an `Arc` for the lifetime of a scan run (see the open
/// question decision in SPEC_FULL.md §9: refreshing mid-run would let two
/// concurrently-scanning hosts disagree about the classification of the
/// same filename).
pub struct PatternSet {
    compiled: Vec<CompiledPattern>,
    /// Early-out alternation of all enabled patterns. A filename that
    /// doesn't match this can't match any individual pattern, so the N
    /// individual regex evaluations below are skipped entirely.
    combined: Regex,
}

impl PatternSet {
    /// Compiles `patterns`, skipping (and logging) any entry whose regex
    /// fails to compile or is disabled. Never fails the scan: a pattern set
    /// with zero valid entries simply classifies nothing.
    pub fn load(patterns: &[Pattern]) -> Self {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if !pattern.enabled {
                continue;
            }
            match RegexBuilder::new(&pattern.regex).case_insensitive(true).build() {
                Ok(regex) => compiled.push(CompiledPattern {
                    regex,
                    category: pattern.category.clone(),
                    description: pattern.description.clone(),
                }),
                Err(err) => {
                    warn!(
                        pattern_id = %pattern.id,
                        category = %pattern.category,
                        error = %err,
                        "skipping pattern with invalid regex"
                    );
                }
            }
        }

        let combined = build_combined(&compiled);
        Self { compiled, combined }
    }

    /// Classifies `name` against every enabled pattern, returning every
    /// distinct category that matched (not just the first). Matching is
    /// case-insensitive and may match anywhere in the string.
    pub fn classify(&self, name: &str) -> Vec<ClassifierMatch> {
        if self.compiled.is_empty() || !self.combined.is_match(name) {
            return Vec::new();
        }

        let mut matches = Vec::new();
        let mut seen_categories = std::collections::HashSet::new();
        for pattern in &self.compiled {
            if pattern.regex.is_match(name) && seen_categories.insert(pattern.category.clone()) {
                matches.push(ClassifierMatch {
                    category: pattern.category.clone(),
                    description: pattern.description.clone(),
                });
            }
        }
        matches
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }
}

fn build_combined(compiled: &[CompiledPattern]) -> Regex {
    if compiled.is_empty() {
        // Matches nothing; `classify` short-circuits on emptiness anyway,
        // this just keeps `combined` total.
        return RegexBuilder::new(r"$^").build().expect("static regex");
    }
    let alternation = compiled
        .iter()
        .map(|p| format!("(?:{})", p.regex.as_str()))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|_| RegexBuilder::new(r"$^").build().expect("static regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::default_patterns;

    #[test]
    fn classifies_credential_filename() {
        let set = PatternSet::load(&default_patterns());
        let matches = set.classify("passwords.txt");
        assert!(matches.iter().any(|m| m.category == "credential"));
    }

    #[test]
    fn classification_is_case_insensitive() {
        let set = PatternSet::load(&default_patterns());
        assert!(!set.classify("PASSWORD.BAK").is_empty());
    }

    #[test]
    fn no_match_returns_empty() {
        let set = PatternSet::load(&default_patterns());
        assert!(set.classify("readme.md").is_empty());
    }

    #[test]
    fn filename_can_match_multiple_categories() {
        let set = PatternSet::load(&default_patterns());
        let matches = set.classify("confidential_payroll_backup.zip");
        let categories: std::collections::HashSet<_> =
            matches.iter().map(|m| m.category.as_str()).collect();
        assert!(categories.contains("classification"));
        assert!(categories.contains("hr"));
        assert!(categories.contains("backup"));
    }

    #[test]
    fn invalid_regex_is_skipped_not_fatal() {
        let mut patterns = default_patterns();
        patterns.push(Pattern::new("(unterminated", "broken", "bad regex"));
        let set = PatternSet::load(&patterns);
        assert_eq!(set.len(), default_patterns().len());
    }

    #[test]
    fn disabled_pattern_is_not_compiled() {
        let mut patterns = default_patterns();
        for p in &mut patterns {
            p.enabled = false;
        }
        let set = PatternSet::load(&patterns);
        assert!(set.is_empty());
        assert!(set.classify("password.txt").is_empty());
    }

    #[test]
    fn key_material_extension_matches_security_category() {
        let set = PatternSet::load(&default_patterns());
        let matches = set.classify("server.pem");
        assert!(matches.iter().any(|m| m.category == "security"));
    }

    #[test]
    fn classification_is_deterministic_across_calls() {
        let set = PatternSet::load(&default_patterns());
        let first = set.classify("passwords.txt");
        let second = set.classify("passwords.txt");
        assert_eq!(first, second);
    }
}
