use thiserror::Error;

/// Crate-wide error type. Each variant corresponds to one of the failure
/// classes in the error handling taxonomy: validation failures are fatal at
/// startup, directory/store failures are retried before surfacing, and
/// per-host/per-share failures are folded into `ShareRecord` data rather
/// than reaching this type at all (see `host_scanner`/`share_scanner`).
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("directory bind failed after retries: {0}")]
    DirectoryBind(String),

    #[error("directory search failed: {0}")]
    DirectorySearch(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("scan cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors surfaced by the Result Store. Transient variants are retried by
/// the store's own retry wrapper before being converted into `Permanent`;
/// only `Permanent` ever escapes `store_batch`/`begin_session`/`end_session`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("statement deadline exceeded after {0:?}")]
    Deadline(std::time::Duration),

    #[error("store operation failed permanently after {attempts} attempts: {cause}")]
    Permanent { attempts: u32, cause: String },
}

impl StoreError {
    /// Transient failures (connection drops, deadline misses) are worth
    /// retrying; constraint violations and programmer errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::PoolTimedOut)
            | StoreError::Database(sqlx::Error::Io(_))
            | StoreError::Database(sqlx::Error::PoolClosed) => true,
            StoreError::Deadline(_) => true,
            StoreError::Database(_) => false,
            StoreError::Permanent { .. } => false,
        }
    }
}
