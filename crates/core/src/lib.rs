//! rstore-core: Core library for rstore
//!
//! This crate provides the backend-independent pieces:
//! - Query validation and resolution
//! - The shared inventory cache
//! - Retry with backoff for remote-facing operations
//! - Configuration management
//! - StorageProvider / StorageObject / TransferBackend traits
//!
//! Concrete storage kinds (rsync) live in their own crates.

pub mod config;
pub mod error;
pub mod inventory;
pub mod query;
pub mod retry;
pub mod traits;

pub use config::{Config, ConfigManager, RetryConfig, RsyncConfig};
pub use error::{Error, Result};
pub use inventory::{InventoryCache, Mtime};
pub use query::{
    CacheKey, QueryValidation, ResolvedQuery, constant_prefix, has_wildcards, local_suffix,
    validate_query,
};
pub use retry::{RetryBuilder, is_retryable_error, retry_with_backoff};
pub use traits::{
    Capabilities, ExampleQuery, Operation, QueryType, StorageObject, StorageProvider,
    TransferBackend,
};
