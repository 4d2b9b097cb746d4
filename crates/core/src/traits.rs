//! Storage traits
//!
//! A storage kind is a [`StorageProvider`] that validates queries and builds
//! [`StorageObject`]s. Objects delegate the actual byte movement to a
//! [`TransferBackend`], which keeps the transport swappable.

use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::inventory::InventoryCache;
use crate::query::{CacheKey, QueryValidation};

/// What a storage object can do, fixed per storage kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// exists / mtime / size / retrieve / inventory
    pub read: bool,
    /// store / remove
    pub write: bool,
    /// list_candidate_matches
    pub glob: bool,
    /// touch
    pub touch: bool,
}

/// Operations a rate limiter may be keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Exists,
    Mtime,
    Size,
    Retrieve,
    Store,
    Remove,
    Touch,
    Glob,
    Inventory,
}

/// Whether an example query is meant for inputs, outputs or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Input,
    Output,
    Any,
}

/// A documented example of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleQuery {
    pub query: String,
    pub description: String,
    #[serde(rename = "type")]
    pub query_type: QueryType,
}

/// Entry point of a storage kind
pub trait StorageProvider: Send + Sync {
    /// Scheme tag, e.g. `rsync`
    fn name(&self) -> &str;

    fn is_valid_query(&self, query: &str) -> QueryValidation;

    fn example_queries(&self) -> Vec<ExampleQuery>;

    /// Key grouping queries that share a rate limit
    fn rate_limiter_key(&self, query: &str, operation: Operation) -> String;

    fn default_max_requests_per_second(&self) -> f64;

    fn use_rate_limiter(&self) -> bool;
}

/// One object in remote storage, resolved from a query
#[async_trait]
pub trait StorageObject: Send + Sync {
    fn query(&self) -> &str;

    /// Key of this object in the [`InventoryCache`]
    fn cache_key(&self) -> CacheKey;

    /// Deterministic suffix for the object's local working copy
    fn local_suffix(&self) -> String;

    /// Working copy location supplied by the caller
    fn local_path(&self) -> &Path;

    /// Parent whose inventory would cover this object, if any
    fn inventory_parent(&self) -> Option<String> {
        None
    }

    fn capabilities(&self) -> Capabilities;

    /// Remove local remainders other than the working copy
    fn cleanup(&self) {}

    async fn exists(&self) -> Result<bool>;

    async fn mtime(&self) -> Result<Timestamp>;

    async fn size(&self) -> Result<u64>;

    /// Record existence, mtime and size in `cache`, once per key
    async fn inventory(&self, cache: &InventoryCache) -> Result<()>;

    /// Copy the object to [`local_path`](Self::local_path)
    async fn retrieve(&self) -> Result<()>;

    /// Copy [`local_path`](Self::local_path) to the object
    async fn store(&self) -> Result<()>;

    async fn remove(&self) -> Result<()>;

    /// Mark the object as modified now
    async fn touch(&self) -> Result<()>;

    /// Concrete paths that could match this object's wildcard query
    async fn list_candidate_matches(&self) -> Result<Vec<String>>;
}

/// Moves bytes between a remote location and a local path
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Pull `remote` into `local`
    async fn retrieve(&self, remote: &Path, local: &Path) -> Result<()>;

    /// Push `local` to `remote`
    async fn store(&self, local: &Path, remote: &Path) -> Result<()>;

    /// Delete `remote`
    async fn remove(&self, remote: &Path) -> Result<()>;
}
