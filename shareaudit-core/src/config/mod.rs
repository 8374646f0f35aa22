//! Scan-engine configuration: the enumerated options from SPEC_FULL.md §6,
//! layered defaults → TOML file → `SHAREAUDIT_`-prefixed environment
//! variables, mirroring `ferrex-server`'s config loader shape but using the
//! `config` crate directly rather than hand-rolled layering.

mod loader;

pub use loader::{ConfigLoadError, load};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

fn default_excluded_shares() -> BTreeSet<String> {
    ["ADMIN$", "IPC$", "print$"].into_iter().map(String::from).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub ldap_server: String,
    pub ldap_domain: String,
    pub ldap_port: u16,
    pub ldap_user: String,
    pub ldap_password: String,
    pub search_ou: Option<String>,
    pub max_computers: u64,
    pub search_timeout_secs: u64,
    pub bind_retries: u32,
    pub page_size: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            ldap_server: String::new(),
            ldap_domain: String::new(),
            ldap_port: 389,
            ldap_user: String::new(),
            ldap_password: String::new(),
            search_ou: None,
            max_computers: 800_000,
            search_timeout_secs: 300,
            bind_retries: 3,
            page_size: 5_000,
        }
    }
}

impl DirectoryConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub statement_timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            name: "shareaudit".into(),
            user: "shareaudit".into(),
            password: String::new(),
            min_connections: 10,
            max_connections: 100,
            statement_timeout_secs: 30,
            batch_size: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            urlencode(&self.user),
            urlencode(&self.password),
            self.host,
            self.port,
            self.name
        )
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub threads: usize,
    pub batch_size: usize,
    pub storage_batch: usize,
    pub max_scan_depth: u32,
    pub scan_timeout_secs: u64,
    pub host_scan_timeout_secs: u64,
    pub excluded_shares: BTreeSet<String>,
    pub scan_for_sensitive: bool,
    pub allow_anonymous: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            batch_size: 1_000,
            storage_batch: 1_000,
            max_scan_depth: 5,
            scan_timeout_secs: 30,
            host_scan_timeout_secs: 300,
            excluded_shares: default_excluded_shares(),
            scan_for_sensitive: true,
            allow_anonymous: true,
        }
    }
}

impl ScanConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn host_scan_timeout(&self) -> Duration {
        Duration::from_secs(self.host_scan_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub database: DatabaseConfig,
    pub scan: ScanConfig,
}

impl Config {
    /// Pre-flight validation run once at startup; a failure here is fatal
    /// and must never surface mid-run as a per-host error.
    pub fn validate(&self) -> Result<(), String> {
        if self.directory.ldap_server.is_empty() {
            return Err("directory.ldap_server must be set".into());
        }
        if self.directory.ldap_domain.is_empty() {
            return Err("directory.ldap_domain must be set".into());
        }
        if self.scan.threads == 0 {
            return Err("scan.threads must be > 0".into());
        }
        if self.scan.batch_size == 0 {
            return Err("scan.batch_size must be > 0".into());
        }
        if self.scan.host_scan_timeout_secs <= self.scan.scan_timeout_secs {
            return Err(
                "scan.host_scan_timeout_secs must exceed scan.scan_timeout_secs (nested deadlines)"
                    .into(),
            );
        }
        if self.directory.search_timeout_secs <= self.scan.host_scan_timeout_secs {
            return Err(
                "directory.search_timeout_secs must exceed scan.host_scan_timeout_secs (nested deadlines)"
                    .into(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excluded_shares_matches_spec() {
        let cfg = ScanConfig::default();
        assert!(cfg.excluded_shares.contains("ADMIN$"));
        assert!(cfg.excluded_shares.contains("IPC$"));
        assert!(cfg.excluded_shares.contains("print$"));
    }

    #[test]
    fn validate_rejects_missing_ldap_server() {
        let cfg = Config::default();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_deadlines() {
        let mut cfg = Config::default();
        cfg.directory.ldap_server = "dc01.example.com".into();
        cfg.directory.ldap_domain = "example.com".into();
        cfg.scan.scan_timeout_secs = 400;
        cfg.scan.host_scan_timeout_secs = 300;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_config() {
        let mut cfg = Config::default();
        cfg.directory.ldap_server = "dc01.example.com".into();
        cfg.directory.ldap_domain = "example.com".into();
        assert!(cfg.validate().is_ok());
    }
}
