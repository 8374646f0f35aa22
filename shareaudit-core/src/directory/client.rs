use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use ldap3::adapters::{EntriesOnly, PagedResults};
use ldap3::{LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{info, instrument, warn};

use crate::config::DirectoryConfig;
use crate::error::{Result, ScanError};

use super::ntlm::{format_domain_user, NtlmHandshake};

/// Produces the list of hostnames to scan. Abstracted behind a trait so the
/// orchestrator can be driven by a fake directory in tests without standing
/// up a real domain controller.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn discover_hosts(&self) -> Result<Vec<String>>;
}

pub struct LdapDirectorySource {
    config: DirectoryConfig,
}

impl LdapDirectorySource {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    fn base_dn(&self) -> String {
        self.config
            .ldap_domain
            .split('.')
            .map(|part| format!("DC={part}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn search_base(&self) -> String {
        match &self.config.search_ou {
            Some(ou) if ou.to_uppercase().contains("DC=") => ou.clone(),
            Some(ou) => {
                let ou_component = if ou.to_uppercase().starts_with("OU=") {
                    ou.clone()
                } else {
                    format!("OU={ou}")
                };
                format!("{ou_component},{}", self.base_dn())
            }
            None => self.base_dn(),
        }
    }

    /// Binds with up to `bind_retries` attempts (linear 2s backoff),
    /// verified by a single-entry domain object lookup, per SPEC_FULL.md
    /// §4.3. A bind failure after all retries is fatal to the run.
    #[instrument(skip(self), fields(server = %self.config.ldap_server))]
    async fn bind(&self) -> Result<ldap3::Ldap> {
        let mut last_error = None;
        for attempt in 1..=self.config.bind_retries.max(1) {
            match self.bind_once().await {
                Ok(ldap) => return Ok(ldap),
                Err(err) => {
                    warn!(attempt, error = %err, "directory bind attempt failed");
                    last_error = Some(err);
                    if attempt < self.config.bind_retries {
                        tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
                    }
                }
            }
        }
        Err(ScanError::DirectoryBind(
            last_error.map(|e| e.to_string()).unwrap_or_else(|| "unknown".into()),
        ))
    }

    async fn bind_once(&self) -> Result<ldap3::Ldap> {
        let url = format!("ldap://{}:{}", self.config.ldap_server, self.config.ldap_port);
        let (conn, mut ldap) = LdapConnAsync::with_settings(LdapConnSettings::new(), &url)
            .await
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?;
        ldap3::drive!(conn);

        self.authenticate(&mut ldap).await?;
        self.verify_bind(&mut ldap).await?;
        Ok(ldap)
    }

    async fn authenticate(&self, ldap: &mut ldap3::Ldap) -> Result<()> {
        let domain_user = format_domain_user(&self.config.ldap_user, &self.config.ldap_domain);

        match self.ntlm_bind(ldap, &domain_user).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(error = %err, "NTLM bind failed, falling back to simple bind");
                ldap.simple_bind(&domain_user, &self.config.ldap_password)
                    .await
                    .map_err(|e| ScanError::DirectoryBind(e.to_string()))?
                    .success()
                    .map_err(|e| ScanError::DirectoryBind(e.to_string()))?;
                Ok(())
            }
        }
    }

    async fn ntlm_bind(&self, ldap: &mut ldap3::Ldap, domain_user: &str) -> Result<()> {
        let mut handshake = NtlmHandshake::new(domain_user, &self.config.ldap_password)?;
        let negotiate = handshake.negotiate()?;

        let challenge = ldap
            .sasl_bind("NTLM", None, Some(negotiate))
            .await
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?;

        let authenticate = handshake.authenticate(&challenge.1.unwrap_or_default())?;
        ldap.sasl_bind("NTLM", None, Some(authenticate))
            .await
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?
            .success()
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?;
        Ok(())
    }

    /// A successful test query (single-entry domain object lookup) is
    /// required before `bind` returns, per SPEC_FULL.md §4.3.
    async fn verify_bind(&self, ldap: &mut ldap3::Ldap) -> Result<()> {
        let (entries, _) = ldap
            .search(&self.base_dn(), Scope::Base, "(objectClass=domain)", vec!["dc"])
            .await
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?
            .success()
            .map_err(|e| ScanError::DirectoryBind(e.to_string()))?;

        if entries.is_empty() {
            return Err(ScanError::DirectoryBind(
                "test query returned no domain object".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectorySource for LdapDirectorySource {
    /// Paged search for `(objectClass=computer)`, stopping at whichever of
    /// `MAX_COMPUTERS` or `SEARCH_TIMEOUT` is hit first and returning the
    /// partial result rather than an error, per SPEC_FULL.md §4.3.
    #[instrument(skip(self))]
    async fn discover_hosts(&self) -> Result<Vec<String>> {
        let mut ldap = self.bind().await?;
        let search_base = self.search_base();
        let deadline = Instant::now() + self.config.search_timeout();

        info!(base_dn = %search_base, "starting computer search");

        let adapters = vec![
            Box::new(EntriesOnly::new()) as Box<_>,
            Box::new(PagedResults::new(self.config.page_size as i32)) as Box<_>,
        ];

        let mut stream = ldap
            .streaming_search_with(
                adapters,
                &search_base,
                Scope::Subtree,
                "(objectClass=computer)",
                vec!["dNSHostName", "name"],
            )
            .await
            .map_err(|e| ScanError::DirectorySearch(e.to_string()))?;

        let mut hosts = Vec::new();
        loop {
            if Instant::now() >= deadline {
                warn!("directory search deadline reached, returning partial result");
                break;
            }
            if hosts.len() as u64 >= self.config.max_computers {
                warn!(
                    limit = self.config.max_computers,
                    "reached maximum computer limit, returning partial result"
                );
                break;
            }

            let next = tokio::time::timeout(
                deadline.saturating_duration_since(Instant::now()).max(Duration::from_millis(1)),
                stream.next(),
            )
            .await;

            let entry = match next {
                Ok(Ok(Some(entry))) => entry,
                Ok(Ok(None)) => break,
                Ok(Err(err)) => {
                    warn!(error = %err, "directory search entry failed, stopping");
                    break;
                }
                Err(_) => {
                    warn!("directory search deadline reached mid-page, returning partial result");
                    break;
                }
            };

            let search_entry = SearchEntry::construct(entry);
            if let Some(hostname) = pick_hostname(&search_entry) {
                hosts.push(hostname);
            }
        }

        let _ = stream.finish().await;
        info!(count = hosts.len(), "computer search complete");
        Ok(hosts)
    }
}

fn pick_hostname(entry: &SearchEntry) -> Option<String> {
    let from_attr = |key: &str| -> Option<String> {
        entry
            .attrs
            .get(key)
            .and_then(|values| values.first())
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty() && s != "[]")
    };
    from_attr("dNSHostName").or_else(|| from_attr("name"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_dn_splits_domain_into_dc_components() {
        let source = LdapDirectorySource::new(DirectoryConfig {
            ldap_domain: "corp.example.com".into(),
            ..Default::default()
        });
        assert_eq!(source.base_dn(), "DC=corp,DC=example,DC=com");
    }

    #[test]
    fn search_base_prefixes_ou_when_given_bare_name() {
        let source = LdapDirectorySource::new(DirectoryConfig {
            ldap_domain: "corp.example.com".into(),
            search_ou: Some("Workstations".into()),
            ..Default::default()
        });
        assert_eq!(
            source.search_base(),
            "OU=Workstations,DC=corp,DC=example,DC=com"
        );
    }

    #[test]
    fn search_base_respects_fully_qualified_ou() {
        let source = LdapDirectorySource::new(DirectoryConfig {
            ldap_domain: "corp.example.com".into(),
            search_ou: Some("OU=Servers,DC=corp,DC=example,DC=com".into()),
            ..Default::default()
        });
        assert_eq!(
            source.search_base(),
            "OU=Servers,DC=corp,DC=example,DC=com"
        );
    }
}
