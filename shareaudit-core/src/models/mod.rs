//! Value types shared by every component of the scan engine.
//!
//! A `ShareRecord` owns its `RootFile`/`SensitiveFile` children outright;
//! the tree has no back-pointers and no cycles, so plain `Vec`s are enough.

mod pattern;
mod session;
mod share;

pub use pattern::Pattern;
pub use session::{ScanSession, SessionStatus, SessionTotals};
pub use share::{
    AccessLevel, EntryAttribute, EntryAttributes, EntryKind, RootFile, SensitiveFile, ShareRecord,
};
