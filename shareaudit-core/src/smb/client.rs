use thiserror::Error;

/// SMB-layer failures, distinguished so callers can map them onto the
/// access-level taxonomy in SPEC_FULL.md §4.5 (`STATUS_ACCESS_DENIED`
/// becomes `Denied`, anything else becomes `Error`).
#[derive(Debug, Error, Clone)]
pub enum SmbError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("smb connect failed: {0}")]
    Connect(String),

    #[error("smb operation failed: {0}")]
    Other(String),
}

pub type SmbResult<T> = std::result::Result<T, SmbError>;

bitflags::bitflags! {
    /// Raw SMB directory-entry attribute bits, as read off the wire. Only
    /// the three bits the spec cares about are named; everything else is
    /// ignored. `HIDDEN` maps `FILE_ATTRIBUTE_HIDDEN` (0x2) explicitly —
    /// the source this was ported from read this field but never actually
    /// populated it (see SPEC_FULL.md §9 decision 3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryAttributeBits: u32 {
        const READONLY  = 0x1;
        const HIDDEN    = 0x2;
        const DIRECTORY = 0x10;
    }
}

/// One entry returned by `list_path`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub size: u64,
    pub attributes: EntryAttributeBits,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub modified_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(EntryAttributeBits::DIRECTORY)
    }

    pub fn is_dot_entry(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// One live SMB session against a single host, exclusive to the Host
/// Scanner that opened it for its lifetime. Blocking by design (mirrors
/// the underlying libsmbclient bindings); callers push invocations onto
/// `spawn_blocking`.
pub trait SmbSession: Send {
    fn list_shares(&mut self) -> SmbResult<Vec<String>>;
    fn list_path(&mut self, share: &str, path: &str) -> SmbResult<Vec<DirEntry>>;
    fn create_file(&mut self, share: &str, path: &str) -> SmbResult<()>;
    fn delete_file(&mut self, share: &str, path: &str) -> SmbResult<()>;
}

/// Establishes SMB sessions against a resolved address. Implementations
/// try anonymous first, falling back to domain credentials, per the state
/// machine in SPEC_FULL.md §4.4; this trait only exposes the primitive the
/// state machine needs, the fallback order itself lives in `host_scanner`.
pub trait SmbConnector: Send + Sync {
    fn connect_anonymous(&self, address: &str) -> SmbResult<Box<dyn SmbSession>>;
    fn connect_with_credentials(
        &self,
        address: &str,
        domain_user: &str,
        password: &str,
    ) -> SmbResult<Box<dyn SmbSession>>;
}
