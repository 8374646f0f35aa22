//! SMB client abstraction. The real backend wraps `pavao` (libsmbclient
//! bindings), which is a blocking/synchronous API — every call is pushed
//! onto `tokio::task::spawn_blocking` at the call site in `host_scanner`/
//! `share_scanner` rather than inside this module, so the abstraction
//! itself stays runtime-agnostic and easy to fake in tests.

mod client;
mod pavao_backend;

pub use client::{
    DirEntry, EntryAttributeBits, SmbConnector, SmbError, SmbResult, SmbSession,
};
pub use pavao_backend::{PavaoConnector, PavaoSession};
