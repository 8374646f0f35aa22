//! `pavao` (libsmbclient bindings)-backed `SmbSession`/`SmbConnector`.
//!
//! `pavao::SmbClient` is a synchronous, per-share-path client: it is
//! constructed with credentials up front and addresses shares by full
//! `smb://host/share/path` URL rather than exposing a TreeConnect step.
//! `PavaoSession` adapts that shape onto the `SmbSession` trait by holding
//! the resolved host address and re-deriving the URL per call.

use pavao::{SmbClient, SmbCredentials, SmbDirentType, SmbMode, SmbOptions};

use super::client::{DirEntry, EntryAttributeBits, SmbError, SmbResult, SmbSession};
use super::client::SmbConnector as SmbConnectorTrait;

pub struct PavaoSession {
    host: String,
    client: SmbClient,
}

impl PavaoSession {
    fn share_url(&self, share: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            format!("smb://{}/{}", self.host, share)
        } else {
            format!("smb://{}/{}/{}", self.host, share, path)
        }
    }

    fn map_error(err: pavao::SmbError) -> SmbError {
        let message = err.to_string();
        if message.to_ascii_uppercase().contains("ACCESS_DENIED") || message.contains("Permission denied") {
            SmbError::AccessDenied(message)
        } else {
            SmbError::Other(message)
        }
    }
}

impl SmbSession for PavaoSession {
    fn list_shares(&mut self) -> SmbResult<Vec<String>> {
        let root = format!("smb://{}", self.host);
        let entries = self
            .client
            .list_dir(&root)
            .map_err(Self::map_error)?;
        Ok(entries
            .into_iter()
            .filter(|e| matches!(e.get_type(), SmbDirentType::FileShare))
            .map(|e| e.name().to_string())
            .collect())
    }

    fn list_path(&mut self, share: &str, path: &str) -> SmbResult<Vec<DirEntry>> {
        let url = self.share_url(share, path);
        let entries = self.client.list_dir(&url).map_err(Self::map_error)?;

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.name().to_string();
            if name == "." || name == ".." {
                continue;
            }

            let mut attrs = EntryAttributeBits::empty();
            if matches!(entry.get_type(), SmbDirentType::Dir) {
                attrs |= EntryAttributeBits::DIRECTORY;
            }
            if name.starts_with('.') {
                // libsmbclient does not surface DOS hidden bits through
                // `list_dir`; dotfile convention is the best-effort proxy.
                attrs |= EntryAttributeBits::HIDDEN;
            }

            let stat_url = self.share_url(share, &format!("{path}/{name}"));
            let (size, created_at, modified_at) = match self.client.stat(&stat_url) {
                Ok(stat) => (
                    stat.size() as u64,
                    stat.created().map(chrono_from_system_time),
                    stat.modified().map(chrono_from_system_time),
                ),
                Err(_) => (0, None, None),
            };

            out.push(DirEntry {
                name,
                size,
                attributes: attrs,
                created_at,
                modified_at,
            });
        }
        Ok(out)
    }

    fn create_file(&mut self, share: &str, path: &str) -> SmbResult<()> {
        let url = self.share_url(share, path);
        self.client
            .open_with(&url, SmbMode::O_CREAT | SmbMode::O_WRONLY)
            .map(|_| ())
            .map_err(Self::map_error)
    }

    fn delete_file(&mut self, share: &str, path: &str) -> SmbResult<()> {
        let url = self.share_url(share, path);
        self.client.unlink(&url).map_err(Self::map_error)
    }
}

fn chrono_from_system_time(time: std::time::SystemTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::from(time)
}

/// Connects to a host either anonymously (empty user/password/workgroup)
/// or with domain credentials, per the fallback order in the Host Scanner
/// state machine.
pub struct PavaoConnector;

impl SmbConnectorTrait for PavaoConnector {
    fn connect_anonymous(&self, address: &str) -> SmbResult<Box<dyn SmbSession>> {
        let credentials = SmbCredentials::default()
            .server(format!("smb://{address}"))
            .share("")
            .username("")
            .password("")
            .workgroup("");
        let client = SmbClient::new(credentials, SmbOptions::default())
            .map_err(PavaoSession::map_error)?;
        Ok(Box::new(PavaoSession {
            host: address.to_string(),
            client,
        }))
    }

    fn connect_with_credentials(
        &self,
        address: &str,
        domain_user: &str,
        password: &str,
    ) -> SmbResult<Box<dyn SmbSession>> {
        let (domain, username) = domain_user.split_once('\\').unwrap_or(("", domain_user));
        let credentials = SmbCredentials::default()
            .server(format!("smb://{address}"))
            .share("")
            .username(username)
            .password(password)
            .workgroup(domain);
        let client = SmbClient::new(credentials, SmbOptions::default())
            .map_err(PavaoSession::map_error)?;
        Ok(Box::new(PavaoSession {
            host: address.to_string(),
            client,
        }))
    }
}
