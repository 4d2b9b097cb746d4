//! rstore-rsync: rsync storage kind for rstore
//!
//! Implements the `StorageProvider` and `StorageObject` traits from
//! rstore-core for `rsync://` queries, transferring with the external
//! rsync program.

pub mod backend;
pub mod glob;
pub mod object;
pub mod provider;

pub use backend::RsyncBackend;
pub use glob::list_candidates;
pub use object::{RsyncObject, TIMESTAMP_FILE};
pub use provider::{RsyncProvider, SCHEME};
