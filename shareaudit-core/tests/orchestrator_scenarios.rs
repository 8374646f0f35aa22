mod support;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shareaudit_core::config::ScanConfig;
use shareaudit_core::host_scanner::HostScannerConfig;
use shareaudit_core::models::SessionStatus;
use shareaudit_core::orchestrator::Orchestrator;
use shareaudit_core::patterns::PatternSet;
use shareaudit_core::progress::NoopProgressSink;
use shareaudit_core::share_scanner::ShareScanConfig;
use shareaudit_core::smb::DirEntry;
use support::{FakeConnector, FakeDirectorySource, FlakyStore};
use tokio_util::sync::CancellationToken;

fn host_config() -> Arc<HostScannerConfig> {
    Arc::new(HostScannerConfig {
        allow_anonymous: true,
        domain_user: String::new(),
        domain_password: String::new(),
        excluded_shares: ["ADMIN$", "IPC$", "print$"].into_iter().map(String::from).collect(),
        host_scan_timeout: Duration::from_secs(5),
        share: ShareScanConfig {
            max_scan_depth: 5,
            scan_timeout: Duration::from_secs(5),
            scan_for_sensitive: true,
        },
    })
}

#[tokio::test]
async fn batched_store_failure_does_not_fail_the_run() {
    let mut fixtures = HashMap::new();
    let mut tree = HashMap::new();
    tree.insert(
        "Public".to_string(),
        vec![DirEntry {
            name: "passwords.txt".into(),
            size: 12,
            attributes: shareaudit_core::smb::EntryAttributeBits::empty(),
            created_at: None,
            modified_at: None,
        }],
    );
    fixtures.insert("host1".to_string(), tree);

    let store = Arc::new(FlakyStore {
        fail_batches: true,
        batches_seen: Mutex::new(Vec::new()),
    });

    let orchestrator = Orchestrator::new(
        Arc::new(FakeDirectorySource {
            hosts: vec!["host1".to_string()],
        }),
        Arc::new(FakeConnector {
            fixtures: Mutex::new(fixtures),
        }),
        store.clone(),
        Arc::new(PatternSet::load(&shareaudit_core::patterns::default_patterns())),
        ScanConfig::default(),
        host_config(),
        "example.com",
        Arc::new(NoopProgressSink),
        CancellationToken::new(),
    );

    let run = orchestrator.run().await.expect("run completes despite store failure");
    assert_eq!(run.status, SessionStatus::Completed);
    assert!(store.batches_seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_host_yields_error_record_without_aborting_run() {
    let store = Arc::new(FlakyStore::default());

    let orchestrator = Orchestrator::new(
        Arc::new(FakeDirectorySource {
            hosts: vec!["unreachable-host".to_string()],
        }),
        Arc::new(FakeConnector {
            fixtures: Mutex::new(HashMap::new()),
        }),
        store.clone(),
        Arc::new(PatternSet::load(&[])),
        ScanConfig::default(),
        host_config(),
        "example.com",
        Arc::new(NoopProgressSink),
        CancellationToken::new(),
    );

    let run = orchestrator.run().await.expect("run completes");
    assert_eq!(run.status, SessionStatus::Completed);
    assert_eq!(run.totals.total_hosts, 1);
    assert_eq!(run.totals.total_shares, 1);
}
