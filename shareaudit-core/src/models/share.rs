use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of root entries retained verbatim on a `ShareRecord`.
/// Full counts (`total_files`, `total_dirs`, `hidden_files`) always
/// reflect the entire root listing, not just the retained prefix.
pub const MAX_ROOT_FILES: usize = 20;

/// Column limits enforced by the `sensitive_files` table's CHECK constraints
/// and the `shares`/`root_files` varchar columns.
pub const MAX_PATH_LEN: usize = 4096;
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DETECTION_TYPE_LEN: usize = 50;

/// Outcome of the access-level probe in `share_scanner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    FullAccess,
    ReadOnly,
    Denied,
    Error,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::FullAccess => "full_access",
            AccessLevel::ReadOnly => "read_only",
            AccessLevel::Denied => "denied",
            AccessLevel::Error => "error",
        }
    }

    /// Whether the recursive sensitive walk is allowed to run against a
    /// share probed at this level.
    pub fn is_readable(&self) -> bool {
        matches!(self, AccessLevel::FullAccess | AccessLevel::ReadOnly)
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_access" => Ok(AccessLevel::FullAccess),
            "read_only" => Ok(AccessLevel::ReadOnly),
            "denied" => Ok(AccessLevel::Denied),
            "error" => Ok(AccessLevel::Error),
            other => Err(format!("unknown access level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// Attribute bits as inferred from the SMB directory entry. `Hidden` maps
/// the protocol's `FILE_ATTRIBUTE_HIDDEN` (0x2) bit explicitly, rather than
/// being left permanently unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryAttribute {
    ReadOnly,
    Hidden,
    Directory,
}

pub type EntryAttributes = std::collections::BTreeSet<EntryAttribute>;

/// One entry from a share's root listing. At most `MAX_ROOT_FILES` of
/// these survive onto a `ShareRecord`; the listing is otherwise unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootFile {
    pub name: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub attributes: EntryAttributes,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// One filename that matched a pattern during the recursive walk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensitiveFile {
    pub path: String,
    pub name: String,
    pub detection_type: String,
    pub description: String,
}

impl SensitiveFile {
    /// Constructs a sensitive-file record, truncating any field that would
    /// otherwise violate the store's column limits. The scanner always
    /// calls this rather than building the struct literal directly, so the
    /// invariant in §8 ("every persisted `s` satisfies the length bounds")
    /// holds by construction instead of being re-checked at store time.
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        detection_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: truncate_chars(path.into(), MAX_PATH_LEN),
            name: truncate_chars(name.into(), MAX_NAME_LEN),
            detection_type: truncate_chars(detection_type.into(), MAX_DETECTION_TYPE_LEN),
            description: description.into(),
        }
    }
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if s.chars().count() > max {
        s = s.chars().take(max).collect();
    }
    s
}

/// One (hostname, share_name, scan_time) observation. Created by the share
/// scanner, mutated only until the owning host scan returns, immutable
/// thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub hostname: String,
    pub share_name: String,
    pub access_level: AccessLevel,
    pub error_message: Option<String>,
    pub total_files: u64,
    pub total_dirs: u64,
    pub hidden_files: u64,
    pub scan_time: DateTime<Utc>,
    pub session_id: Uuid,
    pub root_files: Vec<RootFile>,
    pub sensitive_files: Vec<SensitiveFile>,
}

impl ShareRecord {
    pub fn new(hostname: impl Into<String>, share_name: impl Into<String>, session_id: Uuid) -> Self {
        Self {
            hostname: hostname.into(),
            share_name: share_name.into(),
            access_level: AccessLevel::Error,
            error_message: None,
            total_files: 0,
            total_dirs: 0,
            hidden_files: 0,
            scan_time: Utc::now(),
            session_id,
            root_files: Vec::new(),
            sensitive_files: Vec::new(),
        }
    }

    pub fn with_error(mut self, level: AccessLevel, message: impl Into<String>) -> Self {
        self.access_level = level;
        self.error_message = Some(message.into());
        self
    }

    /// Appends a root entry, updating the full counts unconditionally but
    /// only retaining the entry itself up to `MAX_ROOT_FILES`.
    pub fn push_root_entry(&mut self, entry: RootFile) {
        match entry.kind {
            EntryKind::Directory => self.total_dirs += 1,
            EntryKind::File => self.total_files += 1,
        }
        if entry.attributes.contains(&EntryAttribute::Hidden) {
            self.hidden_files += 1;
        }
        if self.root_files.len() < MAX_ROOT_FILES {
            self.root_files.push(entry);
        }
    }

    /// Marks this record as the product of a `SCAN_TIMEOUT` expiry mid-walk.
    /// Folded into `error_message` rather than a new column, per the open
    /// question decision recorded in SPEC_FULL.md §9.
    pub fn mark_partial(&mut self, reason: &str) {
        let note = format!("partial: {reason}");
        self.error_message = Some(match self.error_message.take() {
            Some(existing) => format!("{existing}; {note}"),
            None => note,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_entries_cap_at_twenty_but_counts_reflect_all() {
        let mut record = ShareRecord::new("host1", "Public", Uuid::new_v4());
        for i in 0..50 {
            record.push_root_entry(RootFile {
                name: format!("file{i}.txt"),
                kind: EntryKind::File,
                size_bytes: 0,
                attributes: EntryAttributes::new(),
                created_at: None,
                modified_at: None,
            });
        }
        assert_eq!(record.root_files.len(), MAX_ROOT_FILES);
        assert_eq!(record.total_files, 50);
    }

    #[test]
    fn hidden_attribute_increments_hidden_count() {
        let mut record = ShareRecord::new("host1", "Public", Uuid::new_v4());
        let mut attrs = EntryAttributes::new();
        attrs.insert(EntryAttribute::Hidden);
        record.push_root_entry(RootFile {
            name: ".secret".into(),
            kind: EntryKind::File,
            size_bytes: 1,
            attributes: attrs,
            created_at: None,
            modified_at: None,
        });
        assert_eq!(record.hidden_files, 1);
    }

    #[test]
    fn sensitive_file_truncates_oversized_fields() {
        let long_path = "a".repeat(MAX_PATH_LEN + 100);
        let sf = SensitiveFile::new(long_path, "name.txt", "credential", "desc");
        assert_eq!(sf.path.chars().count(), MAX_PATH_LEN);
    }
}
