//! Per-share access probe, root inventory, and recursive sensitive walk.
//! An SMB session is not safe to share concurrently across shares, so the
//! Host Scanner invokes one share scan at a time against its own session.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::models::{AccessLevel, EntryAttribute, EntryAttributes, EntryKind, RootFile, ShareRecord};
use crate::patterns::PatternSet;
use crate::smb::{DirEntry, EntryAttributeBits, SmbError, SmbSession};

/// Per-run knobs the Share Scanner needs; owned by the orchestrator and
/// threaded down through the Host Scanner.
#[derive(Debug, Clone)]
pub struct ShareScanConfig {
    pub max_scan_depth: u32,
    pub scan_timeout: Duration,
    pub scan_for_sensitive: bool,
}

/// Scans a single opened share to completion or until `scan_timeout`/
/// cancellation cuts it short, returning a fully-populated `ShareRecord`.
#[instrument(skip(session, patterns, cancel), fields(hostname, share_name = %share_name))]
pub fn scan_share(
    session: &mut dyn SmbSession,
    hostname: &str,
    share_name: &str,
    session_id: Uuid,
    patterns: &PatternSet,
    config: &ShareScanConfig,
    cancel: &CancellationToken,
) -> ShareRecord {
    let deadline = Instant::now() + config.scan_timeout;
    let mut record = ShareRecord::new(hostname, share_name, session_id);

    let access = match probe_access(session, share_name) {
        Ok(level) => level,
        Err(SmbError::AccessDenied(msg)) => {
            return record.with_error(AccessLevel::Denied, msg);
        }
        Err(err) => {
            return record.with_error(AccessLevel::Error, err.to_string());
        }
    };
    record.access_level = access;

    let root_entries = match session.list_path(share_name, "") {
        Ok(entries) => entries,
        Err(err) => {
            return record.with_error(AccessLevel::Error, err.to_string());
        }
    };

    for entry in &root_entries {
        if entry.is_dot_entry() {
            continue;
        }
        record.push_root_entry(to_root_file(entry));
    }

    if !access.is_readable() || !config.scan_for_sensitive {
        return record;
    }

    if Instant::now() >= deadline || cancel.is_cancelled() {
        record.mark_partial("scan timeout");
        return record;
    }

    let mut sensitive = Vec::new();
    let timed_out = walk(
        session,
        share_name,
        "",
        0,
        config.max_scan_depth,
        deadline,
        cancel,
        patterns,
        &mut sensitive,
    );
    record.sensitive_files = sensitive;
    if timed_out {
        record.mark_partial("scan timeout");
    }
    record
}

/// 1. List root; access-denied → `Denied`, any other failure → `Error`.
/// 2. Create then delete a uniquely-named probe file; success → `FullAccess`,
///    failure → `ReadOnly`. Per SPEC_FULL.md §4.5.
fn probe_access(session: &mut dyn SmbSession, share_name: &str) -> Result<AccessLevel, SmbError> {
    session.list_path(share_name, "")?;

    let probe_name = format!("test_{}.tmp", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    match session
        .create_file(share_name, &probe_name)
        .and_then(|()| session.delete_file(share_name, &probe_name))
    {
        Ok(()) => Ok(AccessLevel::FullAccess),
        Err(_) => Ok(AccessLevel::ReadOnly),
    }
}

fn to_root_file(entry: &DirEntry) -> RootFile {
    RootFile {
        name: entry.name.clone(),
        kind: if entry.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        size_bytes: entry.size,
        attributes: to_attribute_set(entry.attributes),
        created_at: entry.created_at,
        modified_at: entry.modified_at,
    }
}

fn to_attribute_set(bits: EntryAttributeBits) -> EntryAttributes {
    let mut attrs = EntryAttributes::new();
    if bits.contains(EntryAttributeBits::READONLY) {
        attrs.insert(EntryAttribute::ReadOnly);
    }
    if bits.contains(EntryAttributeBits::HIDDEN) {
        attrs.insert(EntryAttribute::Hidden);
    }
    if bits.contains(EntryAttributeBits::DIRECTORY) {
        attrs.insert(EntryAttribute::Directory);
    }
    attrs
}

/// Depth-first walk from `path` at `depth`, returns `true` if it was cut
/// short by the deadline or cancellation. Permission errors abandon the
/// subtree silently; other errors are logged and the subtree is abandoned.
#[allow(clippy::too_many_arguments)]
fn walk(
    session: &mut dyn SmbSession,
    share_name: &str,
    path: &str,
    depth: u32,
    max_depth: u32,
    deadline: Instant,
    cancel: &CancellationToken,
    patterns: &PatternSet,
    sensitive: &mut Vec<crate::models::SensitiveFile>,
) -> bool {
    if depth > max_depth {
        return false;
    }
    if Instant::now() >= deadline || cancel.is_cancelled() {
        return true;
    }

    let entries = match session.list_path(share_name, path) {
        Ok(entries) => entries,
        Err(SmbError::AccessDenied(_)) => return false,
        Err(err) => {
            warn!(share = %share_name, %path, error = %err, "walk error, abandoning subtree");
            return false;
        }
    };

    for entry in entries {
        if entry.is_dot_entry() {
            continue;
        }
        if cancel.is_cancelled() || Instant::now() >= deadline {
            return true;
        }

        let child_path = if path.is_empty() {
            entry.name.clone()
        } else {
            format!("{path}/{}", entry.name)
        };

        if entry.is_directory() {
            if depth + 1 <= max_depth {
                let cut_short = walk(
                    session, share_name, &child_path, depth + 1, max_depth, deadline, cancel,
                    patterns, sensitive,
                );
                if cut_short {
                    return true;
                }
            }
            continue;
        }

        for m in patterns.classify(&entry.name) {
            sensitive.push(crate::models::SensitiveFile::new(
                child_path.clone(),
                entry.name.clone(),
                m.category,
                m.description,
            ));
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pattern;
    use std::collections::HashMap;

    /// In-memory `SmbSession` fixture: a flat map of "share/path" -> entries,
    /// plus toggles for access-denied/probe-write behavior.
    struct FakeSession {
        tree: HashMap<String, Vec<DirEntry>>,
        deny_list: bool,
        deny_write: bool,
    }

    fn key(share: &str, path: &str) -> String {
        if path.is_empty() {
            share.to_string()
        } else {
            format!("{share}/{path}")
        }
    }

    fn file(name: &str) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            size: 10,
            attributes: EntryAttributeBits::empty(),
            created_at: None,
            modified_at: None,
        }
    }

    fn dir(name: &str) -> DirEntry {
        DirEntry {
            name: name.to_string(),
            size: 0,
            attributes: EntryAttributeBits::DIRECTORY,
            created_at: None,
            modified_at: None,
        }
    }

    impl SmbSession for FakeSession {
        fn list_shares(&mut self) -> crate::smb::SmbResult<Vec<String>> {
            Ok(vec![])
        }

        fn list_path(&mut self, share: &str, path: &str) -> crate::smb::SmbResult<Vec<DirEntry>> {
            if self.deny_list {
                return Err(SmbError::AccessDenied("denied".into()));
            }
            Ok(self.tree.get(&key(share, path)).cloned().unwrap_or_default())
        }

        fn create_file(&mut self, _share: &str, _path: &str) -> crate::smb::SmbResult<()> {
            if self.deny_write {
                Err(SmbError::AccessDenied("read only".into()))
            } else {
                Ok(())
            }
        }

        fn delete_file(&mut self, _share: &str, _path: &str) -> crate::smb::SmbResult<()> {
            Ok(())
        }
    }

    fn patterns() -> PatternSet {
        PatternSet::load(&[Pattern::new(r"password", "credential", "password file")])
    }

    fn config() -> ShareScanConfig {
        ShareScanConfig {
            max_scan_depth: 5,
            scan_timeout: Duration::from_secs(30),
            scan_for_sensitive: true,
        }
    }

    #[test]
    fn denied_share_returns_denied_access_level() {
        let mut session = FakeSession {
            tree: HashMap::new(),
            deny_list: true,
            deny_write: false,
        };
        let record = scan_share(
            &mut session,
            "host1",
            "Public",
            Uuid::new_v4(),
            &patterns(),
            &config(),
            &CancellationToken::new(),
        );
        assert_eq!(record.access_level, AccessLevel::Denied);
    }

    #[test]
    fn read_only_share_with_sensitive_match() {
        let mut tree = HashMap::new();
        tree.insert("Public".to_string(), vec![file("passwords.txt")]);
        let mut session = FakeSession {
            tree,
            deny_list: false,
            deny_write: true,
        };
        let record = scan_share(
            &mut session,
            "host1",
            "Public",
            Uuid::new_v4(),
            &patterns(),
            &config(),
            &CancellationToken::new(),
        );
        assert_eq!(record.access_level, AccessLevel::ReadOnly);
        assert_eq!(record.sensitive_files.len(), 1);
        assert_eq!(record.sensitive_files[0].detection_type, "credential");
    }

    #[test]
    fn full_access_share_respects_depth_cap() {
        let mut tree = HashMap::new();
        tree.insert("Public".to_string(), vec![dir("a")]);
        tree.insert("Public/a".to_string(), vec![dir("b")]);
        tree.insert("Public/a/b".to_string(), vec![dir("c")]);
        tree.insert("Public/a/b/c".to_string(), vec![dir("d")]);
        tree.insert("Public/a/b/c/d".to_string(), vec![dir("e")]);
        tree.insert("Public/a/b/c/d/e".to_string(), vec![dir("f")]);
        tree.insert(
            "Public/a/b/c/d/e/f".to_string(),
            vec![file("password_deep.txt")],
        );
        let mut session = FakeSession {
            tree,
            deny_list: false,
            deny_write: false,
        };
        let mut cfg = config();
        cfg.max_scan_depth = 2;
        let record = scan_share(
            &mut session,
            "host1",
            "Public",
            Uuid::new_v4(),
            &patterns(),
            &cfg,
            &CancellationToken::new(),
        );
        assert_eq!(record.access_level, AccessLevel::FullAccess);
        assert!(record.sensitive_files.is_empty());
    }

    #[test]
    fn cancellation_returns_partial_results_not_error() {
        let mut tree = HashMap::new();
        tree.insert("Public".to_string(), vec![file("readme.txt")]);
        let mut session = FakeSession {
            tree,
            deny_list: false,
            deny_write: false,
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let record = scan_share(
            &mut session,
            "host1",
            "Public",
            Uuid::new_v4(),
            &patterns(),
            &config(),
            &cancel,
        );
        assert!(record.error_message.as_deref().unwrap_or("").contains("partial"));
    }
}
