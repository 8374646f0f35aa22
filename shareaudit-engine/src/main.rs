mod args;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use shareaudit_core::directory::LdapDirectorySource;
use shareaudit_core::host_scanner::HostScannerConfig;
use shareaudit_core::models::SessionStatus;
use shareaudit_core::orchestrator::Orchestrator;
use shareaudit_core::patterns::PatternSet;
use shareaudit_core::progress::{CountingProgressSink, ProgressCounters, ProgressSink};
use shareaudit_core::share_scanner::ShareScanConfig;
use shareaudit_core::smb::PavaoConnector;
use shareaudit_core::store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shareaudit_core=info,shareaudit_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "scan run failed");
            ExitCode::FAILURE
        }
    }
}

/// Delegate sink for `CountingProgressSink`: logs one line per completed
/// host rather than doing nothing with the counters it wraps.
struct LoggingProgressSink;

impl ProgressSink for LoggingProgressSink {
    fn report(&self, host: &str, done: u64, total: u64) {
        info!(host, done, total, "host scan complete");
    }
}

async fn run() -> anyhow::Result<()> {
    let args = args::Args::parse();

    let mut config = shareaudit_core::config::load(args.config.as_deref())
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    args.apply(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let store = Store::connect(&config.database).await?;
    store.init().await?;
    info!("connected to result store and applied schema");

    let patterns = store.list_patterns().await?;
    let pattern_set = Arc::new(PatternSet::load(&patterns));
    info!(count = pattern_set.len(), "loaded sensitivity patterns");

    let directory = Arc::new(LdapDirectorySource::new(config.directory.clone()));
    let connector = Arc::new(PavaoConnector);
    let host_config = Arc::new(HostScannerConfig {
        allow_anonymous: config.scan.allow_anonymous,
        domain_user: config.directory.ldap_user.clone(),
        domain_password: config.directory.ldap_password.clone(),
        excluded_shares: config.scan.excluded_shares.clone(),
        host_scan_timeout: config.scan.host_scan_timeout(),
        share: ShareScanConfig {
            max_scan_depth: config.scan.max_scan_depth,
            scan_timeout: config.scan.scan_timeout(),
            scan_for_sensitive: config.scan.scan_for_sensitive,
        },
    });

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, cancelling in-flight scans");
            cancel_for_signal.cancel();
        }
    });

    let orchestrator = Orchestrator::new(
        directory,
        connector,
        Arc::new(store),
        pattern_set,
        config.scan.clone(),
        host_config,
        config.directory.ldap_domain.clone(),
        Arc::new(CountingProgressSink::new(
            Arc::new(ProgressCounters::new(0)),
            LoggingProgressSink,
        )),
        cancel,
    );

    let outcome = orchestrator.run().await?;
    println!(
        "session {} finished: {:?}, hosts={}, shares={}, sensitive={}",
        outcome.session_id,
        outcome.status,
        outcome.totals.total_hosts,
        outcome.totals.total_shares,
        outcome.totals.total_sensitive,
    );

    if outcome.status == SessionStatus::Failed {
        anyhow::bail!("scan session ended with failed status");
    }
    Ok(())
}
