//! Per-host state machine: resolve, connect, authenticate, enumerate
//! shares, and invoke the Share Scanner for each non-excluded share.

use std::collections::BTreeSet;
use std::net::{IpAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::models::{AccessLevel, ShareRecord};
use crate::patterns::PatternSet;
use crate::share_scanner::{scan_share, ShareScanConfig};
use crate::smb::SmbConnector;

/// Anonymous-then-domain-credentialed is the default order implied by the
/// source; a deployment that must forbid anonymous fallback sets
/// `allow_anonymous = false`. See SPEC_FULL.md §9 decision 4.
#[derive(Debug, Clone)]
pub struct HostScannerConfig {
    pub allow_anonymous: bool,
    pub domain_user: String,
    pub domain_password: String,
    pub excluded_shares: BTreeSet<String>,
    pub host_scan_timeout: Duration,
    pub share: ShareScanConfig,
}

/// Scans one host end-to-end, returning whatever `ShareRecord`s were
/// produced before success, failure, or deadline expiry. Never returns
/// `Err`: every failure mode is folded into the returned records or
/// (for pre-enumeration failures) a single synthetic error record.
#[instrument(skip(connector, patterns, cancel, config), fields(hostname = %hostname))]
pub async fn scan_host(
    hostname: &str,
    connector: Arc<dyn SmbConnector>,
    patterns: Arc<PatternSet>,
    config: Arc<HostScannerConfig>,
    cancel: CancellationToken,
    session_id: Uuid,
) -> Vec<ShareRecord> {
    let deadline = Instant::now() + config.host_scan_timeout;

    if hostname.is_empty() || hostname == "[]" {
        return vec![error_record(hostname, session_id, "unresolvable")];
    }

    let host_timeout = config.host_scan_timeout;
    let resolved = tokio::time::timeout(host_timeout, resolve(hostname)).await;
    match resolved {
        Ok(Some(_)) => {}
        _ => return vec![error_record(hostname, session_id, "unresolvable")],
    }

    let connect_result = tokio::time::timeout(
        host_timeout,
        connect_and_list_shares(hostname.to_string(), connector.clone(), config.clone()),
    )
    .await;

    let (mut session, shares) = match connect_result {
        Ok(Ok(pair)) => pair,
        Ok(Err(message)) => return vec![error_record(hostname, session_id, &message)],
        Err(_) => return vec![error_record(hostname, session_id, "host deadline exceeded")],
    };

    let mut records = Vec::with_capacity(shares.len());
    for share_name in shares {
        if config.excluded_shares.contains(&share_name) {
            continue;
        }
        if cancel.is_cancelled() {
            break;
        }
        if Instant::now() >= deadline {
            warn!(hostname, "host deadline exceeded, stopping share enumeration");
            let mut record = ShareRecord::new(hostname, &share_name, session_id);
            record.mark_partial("host deadline exceeded");
            records.push(record);
            break;
        }

        let hostname_owned = hostname.to_string();
        let share_owned = share_name.clone();
        let patterns_clone = patterns.clone();
        let share_cfg = config.share.clone();
        let cancel_clone = cancel.clone();
        let remaining = deadline.saturating_duration_since(Instant::now());

        let scan_result = tokio::time::timeout(
            remaining,
            task::spawn_blocking(move || {
                let record = scan_share(
                    session.as_mut(),
                    &hostname_owned,
                    &share_owned,
                    session_id,
                    &patterns_clone,
                    &share_cfg,
                    &cancel_clone,
                );
                (session, record)
            }),
        )
        .await;

        match scan_result {
            Ok(Ok((returned_session, record))) => {
                session = returned_session;
                records.push(record);
            }
            Ok(Err(join_err)) => {
                warn!(hostname, share = %share_name, error = %join_err, "share scan task panicked");
                records.push(error_record_for_share(hostname, &share_name, session_id, "share scan task failed"));
                break;
            }
            Err(_elapsed) => {
                warn!(hostname, share = %share_name, "share scan exceeded host deadline");
                records.push(error_record_for_share(hostname, &share_name, session_id, "partial: scan timeout"));
                break;
            }
        }
    }

    records
}

async fn connect_and_list_shares(
    hostname: String,
    connector: Arc<dyn SmbConnector>,
    config: Arc<HostScannerConfig>,
) -> Result<(Box<dyn crate::smb::SmbSession>, Vec<String>), String> {
    task::spawn_blocking(move || {
        let mut last_error = None;

        if config.allow_anonymous {
            match connector.connect_anonymous(&hostname) {
                Ok(mut session) => match session.list_shares() {
                    Ok(shares) => return Ok((session, shares)),
                    Err(err) => last_error = Some(err.to_string()),
                },
                Err(err) => last_error = Some(err.to_string()),
            }
        }

        if !config.domain_user.is_empty() {
            match connector.connect_with_credentials(&hostname, &config.domain_user, &config.domain_password) {
                Ok(mut session) => match session.list_shares() {
                    Ok(shares) => return Ok((session, shares)),
                    Err(err) => last_error = Some(err.to_string()),
                },
                Err(err) => last_error = Some(err.to_string()),
            }
        }

        Err(last_error.unwrap_or_else(|| "auth failed".to_string()))
    })
    .await
    .unwrap_or_else(|join_err| Err(format!("connect task failed: {join_err}")))
}

/// Resolves `hostname`: a literal IP address passes through; anything else
/// goes through system DNS (pushed onto `spawn_blocking`, since
/// `ToSocketAddrs` resolution is a blocking syscall). Returns `None` when
/// resolution fails or the lookup task itself panics.
async fn resolve(hostname: &str) -> Option<IpAddr> {
    if let Ok(ip) = hostname.parse::<IpAddr>() {
        return Some(ip);
    }
    let hostname = hostname.to_string();
    task::spawn_blocking(move || {
        format!("{hostname}:445")
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .map(|addr| addr.ip())
    })
    .await
    .ok()
    .flatten()
}

fn error_record(hostname: &str, session_id: Uuid, message: &str) -> ShareRecord {
    ShareRecord::new(hostname, "", session_id).with_error(AccessLevel::Error, message)
}

fn error_record_for_share(hostname: &str, share_name: &str, session_id: Uuid, message: &str) -> ShareRecord {
    ShareRecord::new(hostname, share_name, session_id).with_error(AccessLevel::Error, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_hostname_returns_unresolvable_error() {
        let records = scan_host(
            "",
            Arc::new(EmptyConnector),
            Arc::new(PatternSet::load(&[])),
            Arc::new(test_config()),
            CancellationToken::new(),
            Uuid::new_v4(),
        )
        .await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error_message.as_deref(), Some("unresolvable"));
    }

    struct EmptyConnector;
    impl SmbConnector for EmptyConnector {
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

    fn test_config() -> HostScannerConfig {
        HostScannerConfig {
            allow_anonymous: true,
            domain_user: String::new(),
            domain_password: String::new(),
            excluded_shares: BTreeSet::new(),
            host_scan_timeout: Duration::from_secs(5),
            share: ShareScanConfig {
                max_scan_depth: 5,
                scan_timeout: Duration::from_secs(5),
                scan_for_sensitive: true,
            },
        }
    }
}
