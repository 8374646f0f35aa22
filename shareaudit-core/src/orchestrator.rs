//! Top-level coordinator: pulls hosts from the Directory Source, fans out
//! to a bounded worker pool of Host Scanners, and forwards accumulated
//! `ShareRecord`s to the Result Store in storage-sized batches.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::ScanConfig;
use crate::directory::DirectorySource;
use crate::host_scanner::{scan_host, HostScannerConfig};
use crate::models::{SessionStatus, SessionTotals};
use crate::patterns::PatternSet;
use crate::progress::ProgressSink;
use crate::smb::SmbConnector;

/// Abstraction over the Result Store's session/batch lifecycle, narrowed
/// to what the orchestrator needs. The real implementation is `store::Store`;
/// tests can substitute an in-memory recorder.
#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn begin_session(&self, domain: &str) -> crate::error::Result<Uuid>;
    async fn store_batch(
        &self,
        records: Vec<crate::models::ShareRecord>,
        session_id: Uuid,
    ) -> crate::error::Result<(u64, u64)>;
    async fn end_session(
        &self,
        session_id: Uuid,
        totals: SessionTotals,
        status: SessionStatus,
    ) -> crate::error::Result<()>;
}

pub struct Orchestrator {
    directory: Arc<dyn DirectorySource>,
    connector: Arc<dyn SmbConnector>,
    store: Arc<dyn ResultSink>,
    patterns: Arc<PatternSet>,
    scan_config: ScanConfig,
    host_config: Arc<HostScannerConfig>,
    domain: String,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
}

pub struct OrchestratorRun {
    pub session_id: Uuid,
    pub totals: SessionTotals,
    pub status: SessionStatus,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        directory: Arc<dyn DirectorySource>,
        connector: Arc<dyn SmbConnector>,
        store: Arc<dyn ResultSink>,
        patterns: Arc<PatternSet>,
        scan_config: ScanConfig,
        host_config: Arc<HostScannerConfig>,
        domain: impl Into<String>,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            directory,
            connector,
            store,
            patterns,
            scan_config,
            host_config,
            domain: domain.into(),
            progress,
            cancel,
        }
    }

    /// Drives one complete scan session: begin → discover hosts → scan in
    /// bounded-concurrency batches → flush residual buffer → end. Never
    /// propagates per-host/per-share failures as `Err` — only pre-flight
    /// failures (directory discovery, session begin) abort the run.
    #[instrument(skip(self))]
    pub async fn run(&self) -> crate::error::Result<OrchestratorRun> {
        let session_id = self.store.begin_session(&self.domain).await?;
        info!(%session_id, "scan session started");

        let hosts = match self.directory.discover_hosts().await {
            Ok(hosts) => hosts,
            Err(err) => {
                self.fail_session(session_id, SessionTotals::default()).await;
                return Err(err);
            }
        };
        let total = hosts.len() as u64;
        info!(total, "discovered hosts, beginning scan");

        let mut totals = SessionTotals::default();
        totals.total_hosts = total;
        let mut processed: u64 = 0;
        let mut buffer: Vec<crate::models::ShareRecord> = Vec::new();
        let semaphore = Arc::new(Semaphore::new(self.scan_config.threads.max(1)));

        for chunk in hosts.chunks(self.scan_config.batch_size.max(1)) {
            if self.cancel.is_cancelled() {
                break;
            }

            let mut tasks = Vec::with_capacity(chunk.len());
            for hostname in chunk {
                if self.cancel.is_cancelled() {
                    break;
                }
                let permit = semaphore.clone().acquire_owned().await;
                let Ok(permit) = permit else { break };
                let hostname = hostname.clone();
                let connector = self.connector.clone();
                let patterns = self.patterns.clone();
                let host_config = self.host_config.clone();
                let cancel = self.cancel.clone();
                tasks.push(tokio::spawn(async move {
                    let records = scan_host(&hostname, connector, patterns, host_config, cancel, session_id).await;
                    drop(permit);
                    (hostname, records)
                }));
            }

            for task in tasks {
                match task.await {
                    Ok((hostname, records)) => {
                        processed += 1;
                        totals.total_shares += records.len() as u64;
                        totals.total_sensitive +=
                            records.iter().map(|r| r.sensitive_files.len() as u64).sum::<u64>();
                        buffer.extend(records);
                        self.progress.report(&hostname, processed, total);
                    }
                    Err(join_err) => {
                        warn!(error = %join_err, "host scan task panicked");
                        processed += 1;
                    }
                }

                if buffer.len() >= self.scan_config.storage_batch {
                    self.flush(&mut buffer, session_id).await;
                }
            }
        }

        self.flush(&mut buffer, session_id).await;

        let status = if self.cancel.is_cancelled() {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
        self.store.end_session(session_id, totals.clone(), status).await?;
        info!(%session_id, ?status, "scan session finished");

        Ok(OrchestratorRun { session_id, totals, status })
    }

    async fn flush(&self, buffer: &mut Vec<crate::models::ShareRecord>, session_id: Uuid) {
        if buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(buffer);
        let count = batch.len();
        match self.store.store_batch(batch, session_id).await {
            Ok((written, sensitive)) => {
                info!(count, written, sensitive, "stored batch");
            }
            Err(err) => {
                warn!(count, error = %err, "batch store failed permanently, records dropped");
            }
        }
    }

    async fn fail_session(&self, session_id: Uuid, totals: SessionTotals) {
        if let Err(err) = self.store.end_session(session_id, totals, SessionStatus::Failed).await {
            warn!(%session_id, error = %err, "failed to seal session after pre-flight failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShareRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeDirectory(Vec<String>);
    #[async_trait]
    impl DirectorySource for FakeDirectory {
        async fn discover_hosts(&self) -> crate::error::Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct NoopConnector;
    impl SmbConnector for NoopConnector {
        fn connect_anonymous(&self, _address: &str) -> crate::smb::SmbResult<Box<dyn crate::smb::SmbSession>> {
            Err(crate::smb::SmbError::Connect("no fixture".into()))
        }
        fn connect_with_credentials(
            &self,
            _address: &str,
            _domain_user: &str,
            _password: &str,
        ) -> crate::smb::SmbResult<Box<dyn crate::smb::SmbSession>> {
            Err(crate::smb::SmbError::Connect("no fixture".into()))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ResultSink for RecordingStore {
        async fn begin_session(&self, _domain: &str) -> crate::error::Result<Uuid> {
            Ok(Uuid::new_v4())
        }
        async fn store_batch(
            &self,
            records: Vec<ShareRecord>,
            _session_id: Uuid,
        ) -> crate::error::Result<(u64, u64)> {
            let len = records.len();
            self.batches.lock().unwrap().push(len);
            Ok((len as u64, 0))
        }
        async fn end_session(
            &self,
            _session_id: Uuid,
            _totals: SessionTotals,
            _status: SessionStatus,
        ) -> crate::error::Result<()> {
            Ok(())
        }
    }

    struct NoopSink;
    impl ProgressSink for NoopSink {
        fn report(&self, _host: &str, _done: u64, _total: u64) {}
    }

    #[tokio::test]
    async fn unresolvable_hosts_still_produce_error_records_and_complete() {
        let store = Arc::new(RecordingStore::default());
        let orchestrator = Orchestrator::new(
            Arc::new(FakeDirectory(vec!["".to_string(), "[]".to_string()])),
            Arc::new(NoopConnector),
            store.clone(),
            Arc::new(PatternSet::load(&[])),
            ScanConfig::default(),
            Arc::new(HostScannerConfig {
                allow_anonymous: true,
                domain_user: String::new(),
                domain_password: String::new(),
                excluded_shares: Default::default(),
                host_scan_timeout: std::time::Duration::from_secs(5),
                share: crate::share_scanner::ShareScanConfig {
                    max_scan_depth: 5,
                    scan_timeout: std::time::Duration::from_secs(5),
                    scan_for_sensitive: true,
                },
            }),
            "example.com",
            Arc::new(NoopSink),
            CancellationToken::new(),
        );

        let run = orchestrator.run().await.unwrap();
        assert_eq!(run.status, SessionStatus::Completed);
        assert_eq!(run.totals.total_hosts, 2);
        let record_count: usize = store.batches.lock().unwrap().iter().sum();
        assert_eq!(record_count, 2);
    }
}
