use crate::models::Pattern;

/// Built-in pattern set used when the store's `sensitive_patterns` table is
/// empty (fresh install) or unreachable at load time. Grounded on the
/// categories enumerated in SPEC_FULL.md §4.1.
pub fn default_patterns() -> Vec<Pattern> {
    const RULES: &[(&str, &str, &str)] = &[
        (
            r"pass(word|wd)?|secret|credential|key|token|api.?key",
            "credential",
            "Credential-related file",
        ),
        (
            r"ssn|social.?security|tax|ein|itin|passport",
            "pii",
            "Government ID related",
        ),
        (
            r"bank|account|routing|swift|iban|credit.?card|debit.?card",
            "financial",
            "Financial information",
        ),
        (
            r"salary|payroll|compensation|benefits|employee",
            "hr",
            "HR/Personnel information",
        ),
        (
            r"medical|health|diagnosis|patient|rx|prescription",
            "health",
            "Healthcare information",
        ),
        (
            r"driver.?s?.?license|birth.?certificate|national.?id",
            "identity",
            "Identity documents",
        ),
        (
            r"confidential|private|sensitive|restricted|internal",
            "classification",
            "Explicitly marked sensitive",
        ),
        (r"contract|agreement|nda|legal", "legal", "Legal documents"),
        (
            r"backup|dump|export|archive",
            "backup",
            "Backup/export files",
        ),
        (
            r"config|settings|\benv\b|\.properties",
            "configuration",
            "Configuration files",
        ),
        (
            r"\.(key|pem|pfx|p12|kdb|kdbx)$",
            "security",
            "Key material / credential store file extension",
        ),
    ];

    RULES
        .iter()
        .map(|(regex, category, description)| Pattern::new(*regex, *category, *description))
        .collect()
}
