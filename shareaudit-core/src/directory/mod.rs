//! Directory Source: authenticates to the directory server and produces a
//! finite, capped list of computer DNS names via paged search.

mod client;
mod ntlm;

pub use client::{DirectorySource, LdapDirectorySource};
