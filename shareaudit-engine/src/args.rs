use std::path::PathBuf;

use clap::Parser;

/// Runs exactly one scan session to completion against a directory/SMB
/// fleet and a PostgreSQL-compatible result store. Flags mirror every
/// configuration option the scan engine exposes; anything left unset
/// falls back to the config file, then the built-in defaults.
#[derive(Parser, Debug)]
#[command(name = "shareaudit-engine")]
#[command(about = "Scans SMB shares across a directory fleet for access misconfiguration and sensitive filenames")]
pub struct Args {
    /// Path to a TOML config file, applied over the built-in defaults and
    /// under `SHAREAUDIT_`-prefixed environment variables.
    #[arg(long, env = "SHAREAUDIT_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SHAREAUDIT_LDAP_SERVER")]
    pub ldap_server: Option<String>,

    #[arg(long, env = "SHAREAUDIT_LDAP_DOMAIN")]
    pub ldap_domain: Option<String>,

    #[arg(long, env = "SHAREAUDIT_LDAP_PORT")]
    pub ldap_port: Option<u16>,

    #[arg(long, env = "SHAREAUDIT_LDAP_USER")]
    pub ldap_user: Option<String>,

    /// Read from the environment, never prompted — interactive credential
    /// prompting is an external collaborator's concern, not this binary's.
    #[arg(long, env = "SHAREAUDIT_LDAP_PASSWORD")]
    pub ldap_password: Option<String>,

    #[arg(long, env = "SHAREAUDIT_SEARCH_OU")]
    pub search_ou: Option<String>,

    #[arg(long, env = "SHAREAUDIT_THREADS")]
    pub threads: Option<usize>,

    #[arg(long, env = "SHAREAUDIT_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    #[arg(long, env = "SHAREAUDIT_MAX_SCAN_DEPTH")]
    pub max_scan_depth: Option<u32>,

    #[arg(long, env = "SHAREAUDIT_SCAN_TIMEOUT_SECS")]
    pub scan_timeout_secs: Option<u64>,

    #[arg(long, env = "SHAREAUDIT_HOST_SCAN_TIMEOUT_SECS")]
    pub host_scan_timeout_secs: Option<u64>,

    #[arg(long, env = "SHAREAUDIT_MAX_COMPUTERS")]
    pub max_computers: Option<u64>,

    #[arg(long, env = "SHAREAUDIT_DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "SHAREAUDIT_DB_PORT")]
    pub db_port: Option<u16>,

    #[arg(long, env = "SHAREAUDIT_DB_NAME")]
    pub db_name: Option<String>,

    #[arg(long, env = "SHAREAUDIT_DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "SHAREAUDIT_DB_PASSWORD")]
    pub db_password: Option<String>,

    #[arg(long, env = "SHAREAUDIT_DB_MIN_CONNECTIONS")]
    pub db_min_connections: Option<u32>,

    #[arg(long, env = "SHAREAUDIT_DB_MAX_CONNECTIONS")]
    pub db_max_connections: Option<u32>,

    /// Disables anonymous-first SMB auth, requiring domain credentials.
    #[arg(long)]
    pub no_anonymous: bool,

    /// Skips the recursive sensitive-filename walk, keeping only root
    /// inventories and access-level probes.
    #[arg(long)]
    pub no_sensitive_scan: bool,
}

impl Args {
    /// Layers CLI overrides on top of a loaded `Config`, mirroring the
    /// precedence `ferrex-server`'s `main.rs` applies to its own `Args`.
    pub fn apply(&self, config: &mut shareaudit_core::config::Config) {
        if let Some(v) = &self.ldap_server {
            config.directory.ldap_server = v.clone();
        }
        if let Some(v) = &self.ldap_domain {
            config.directory.ldap_domain = v.clone();
        }
        if let Some(v) = self.ldap_port {
            config.directory.ldap_port = v;
        }
        if let Some(v) = &self.ldap_user {
            config.directory.ldap_user = v.clone();
        }
        if let Some(v) = &self.ldap_password {
            config.directory.ldap_password = v.clone();
        }
        if let Some(v) = &self.search_ou {
            config.directory.search_ou = Some(v.clone());
        }
        if let Some(v) = self.max_computers {
            config.directory.max_computers = v;
        }
        if let Some(v) = self.threads {
            config.scan.threads = v;
        }
        if let Some(v) = self.batch_size {
            config.scan.batch_size = v;
            config.scan.storage_batch = v;
        }
        if let Some(v) = self.max_scan_depth {
            config.scan.max_scan_depth = v;
        }
        if let Some(v) = self.scan_timeout_secs {
            config.scan.scan_timeout_secs = v;
        }
        if let Some(v) = self.host_scan_timeout_secs {
            config.scan.host_scan_timeout_secs = v;
        }
        if let Some(v) = &self.db_host {
            config.database.host = v.clone();
        }
        if let Some(v) = self.db_port {
            config.database.port = v;
        }
        if let Some(v) = &self.db_name {
            config.database.name = v.clone();
        }
        if let Some(v) = &self.db_user {
            config.database.user = v.clone();
        }
        if let Some(v) = &self.db_password {
            config.database.password = v.clone();
        }
        if let Some(v) = self.db_min_connections {
            config.database.min_connections = v;
        }
        if let Some(v) = self.db_max_connections {
            config.database.max_connections = v;
        }
        if self.no_anonymous {
            config.scan.allow_anonymous = false;
        }
        if self.no_sensitive_scan {
            config.scan.scan_for_sensitive = false;
        }
    }
}
