//! Fake SMB/LDAP/store backends for integration tests, mirroring the
//! fixture style of the teacher's `tests/support` helpers.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shareaudit_core::directory::DirectorySource;
use shareaudit_core::models::{SessionStatus, SessionTotals, ShareRecord};
use shareaudit_core::orchestrator::ResultSink;
use shareaudit_core::smb::{DirEntry, SmbConnector, SmbError, SmbResult, SmbSession};
use uuid::Uuid;

pub struct FakeDirectorySource {
    pub hosts: Vec<String>,
}

#[async_trait]
impl DirectorySource for FakeDirectorySource {
    async fn discover_hosts(&self) -> shareaudit_core::Result<Vec<String>> {
        Ok(self.hosts.clone())
    }
}

/// In-memory SMB fixture, keyed by `"share/path"`. Supports per-host
/// failure injection so tests can exercise auth-failure/timeout paths.
pub struct FakeSmbSession {
    pub tree: HashMap<String, Vec<DirEntry>>,
}

impl SmbSession for FakeSmbSession {
    fn list_shares(&mut self) -> SmbResult<Vec<String>> {
        Ok(self
            .tree
            .keys()
            .filter(|k| !k.contains('/'))
            .cloned()
            .collect())
    }

    fn list_path(&mut self, share: &str, path: &str) -> SmbResult<Vec<DirEntry>> {
        let key = if path.is_empty() {
            share.to_string()
        } else {
            format!("{share}/{path}")
        };
        Ok(self.tree.get(&key).cloned().unwrap_or_default())
    }

    fn create_file(&mut self, _share: &str, _path: &str) -> SmbResult<()> {
        Ok(())
    }

    fn delete_file(&mut self, _share: &str, _path: &str) -> SmbResult<()> {
        Ok(())
    }
}

pub struct FakeConnector {
    pub fixtures: Mutex<HashMap<String, HashMap<String, Vec<DirEntry>>>>,
}

impl SmbConnector for FakeConnector {
    fn connect_anonymous(&self, address: &str) -> SmbResult<Box<dyn SmbSession>> {
        let fixtures = self.fixtures.lock().unwrap();
        match fixtures.get(address) {
            Some(tree) => Ok(Box::new(FakeSmbSession { tree: tree.clone() })),
            None => Err(SmbError::Connect(format!("no fixture for {address}"))),
        }
    }

    fn connect_with_credentials(
        &self,
        address: &str,
        _domain_user: &str,
        _password: &str,
    ) -> SmbResult<Box<dyn SmbSession>> {
        self.connect_anonymous(address)
    }
}

/// Store double that can be made to fail every `store_batch` call, to
/// exercise the "batched store failure" scenario from SPEC_FULL.md §8.
#[derive(Default)]
pub struct FlakyStore {
    pub fail_batches: bool,
    pub batches_seen: Mutex<Vec<usize>>,
}

#[async_trait]
impl ResultSink for FlakyStore {
    async fn begin_session(&self, _domain: &str) -> shareaudit_core::Result<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn store_batch(
        &self,
        records: Vec<ShareRecord>,
        _session_id: Uuid,
    ) -> shareaudit_core::Result<(u64, u64)> {
        if self.fail_batches {
            return Err(shareaudit_core::error::StoreError::Permanent {
                attempts: 3,
                cause: "simulated store outage".into(),
            }
            .into());
        }
        self.batches_seen.lock().unwrap().push(records.len());
        Ok((records.len() as u64, 0))
    }

    async fn end_session(
        &self,
        _session_id: Uuid,
        _totals: SessionTotals,
        _status: SessionStatus,
    ) -> shareaudit_core::Result<()> {
        Ok(())
    }
}
