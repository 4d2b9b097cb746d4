//! rsync storage object
//!
//! The remote side of an rsync query is reachable as a path from this host,
//! so metadata comes straight from the filesystem. Every probe goes to the
//! filesystem again; the caller's [`InventoryCache`] is the only memo.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use jiff::Timestamp;
use rstore_core::{
    CacheKey, Capabilities, Error, InventoryCache, Mtime, ResolvedQuery, Result, RetryConfig,
    StorageObject, TransferBackend, is_retryable_error, retry_with_backoff,
};

use crate::glob;
use crate::provider::SCHEME;

/// Marker file whose mtime stands in for its directory's mtime
pub const TIMESTAMP_FILE: &str = ".snakemake_timestamp";

const CAPABILITIES: Capabilities = Capabilities {
    read: true,
    write: true,
    glob: true,
    touch: true,
};

/// An object addressed by an `rsync://` query
pub struct RsyncObject {
    resolved: ResolvedQuery,
    query_path: PathBuf,
    local_path: PathBuf,
    retry: RetryConfig,
    backend: Arc<dyn TransferBackend>,
}

impl std::fmt::Debug for RsyncObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsyncObject")
            .field("query", &self.resolved.query())
            .field("query_path", &self.query_path)
            .field("local_path", &self.local_path)
            .finish_non_exhaustive()
    }
}

impl RsyncObject {
    pub(crate) fn new(
        resolved: ResolvedQuery,
        local_path: PathBuf,
        retry: RetryConfig,
        backend: Arc<dyn TransferBackend>,
    ) -> Self {
        let query_path = resolved.query_path();
        Self {
            resolved,
            query_path,
            local_path,
            retry,
            backend,
        }
    }

    /// Location of the object on the storage side
    pub fn query_path(&self) -> &Path {
        &self.query_path
    }

    pub fn scheme(&self) -> &str {
        self.resolved.scheme()
    }

    fn timestamp_path(&self) -> PathBuf {
        self.query_path.join(TIMESTAMP_FILE)
    }

    async fn is_dir(&self) -> bool {
        tokio::fs::metadata(&self.query_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn probe_exists(&self) -> Result<bool> {
        tracing::debug!(path = %self.query_path.display(), "Probing existence");
        match tokio::fs::metadata(&self.query_path).await {
            Ok(_) => Ok(true),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(false)
            }
            // A link that cannot be resolved (loop, overlong chain) does
            // not exist from the caller's point of view
            Err(e) => match tokio::fs::symlink_metadata(&self.query_path).await {
                Ok(meta) if meta.file_type().is_symlink() => {
                    tracing::debug!(
                        path = %self.query_path.display(),
                        error = %e,
                        "Unresolvable symlink"
                    );
                    Ok(false)
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn stat(&self, follow_symlinks: bool) -> Result<Metadata> {
        let meta = if follow_symlinks {
            tokio::fs::metadata(&self.query_path).await?
        } else {
            tokio::fs::symlink_metadata(&self.query_path).await?
        };
        Ok(meta)
    }

    /// mtime from `meta`, unless the object is a directory carrying a
    /// timestamp file
    async fn stat_to_mtime(&self, meta: &Metadata) -> Result<Timestamp> {
        if self.is_dir().await {
            match tokio::fs::symlink_metadata(self.timestamp_path()).await {
                Ok(sentinel) => return to_timestamp(sentinel.modified()?),
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }
        to_timestamp(meta.modified()?)
    }

    async fn probe_mtime(&self) -> Result<Timestamp> {
        let lstat = self.stat(false).await?;
        self.stat_to_mtime(&lstat).await
    }

    async fn probe_size(&self) -> Result<u64> {
        Ok(self.stat(true).await?.len())
    }

    /// mtime and size in one pass; a symlink reports its own mtime
    async fn probe_inventory(&self) -> Result<(Timestamp, u64)> {
        let stat = self.stat(true).await?;
        let lstat = self.stat(false).await?;
        let mtime_source = if lstat.file_type().is_symlink() {
            &lstat
        } else {
            &stat
        };
        let mtime = self.stat_to_mtime(mtime_source).await?;
        Ok((mtime, stat.len()))
    }

    async fn touch_now(&self) -> Result<()> {
        let target = if self.is_dir().await {
            let sentinel = self.timestamp_path();
            tokio::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .open(&sentinel)
                .await?;
            sentinel
        } else {
            self.query_path.clone()
        };

        let now = filetime::FileTime::now();
        filetime::set_symlink_file_times(&target, now, now)?;
        tracing::debug!(path = %target.display(), "Touched");
        Ok(())
    }
}

fn to_timestamp(time: SystemTime) -> Result<Timestamp> {
    Timestamp::try_from(time).map_err(|e| Error::General(format!("mtime out of range: {e}")))
}

#[async_trait]
impl StorageObject for RsyncObject {
    fn query(&self) -> &str {
        self.resolved.query()
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey::new(SCHEME, self.resolved.query())
    }

    fn local_suffix(&self) -> String {
        self.resolved.local_suffix()
    }

    fn local_path(&self) -> &Path {
        &self.local_path
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    async fn exists(&self) -> Result<bool> {
        retry_with_backoff(&self.retry, || self.probe_exists(), is_retryable_error).await
    }

    async fn mtime(&self) -> Result<Timestamp> {
        retry_with_backoff(&self.retry, || self.probe_mtime(), is_retryable_error).await
    }

    async fn size(&self) -> Result<u64> {
        retry_with_backoff(&self.retry, || self.probe_size(), is_retryable_error).await
    }

    async fn inventory(&self, cache: &InventoryCache) -> Result<()> {
        let key = self.cache_key();
        if cache.contains(&key) {
            tracing::trace!(key = %key, "Already inventoried");
            return Ok(());
        }

        if !self.exists().await? {
            cache.record_missing(&key);
            return Ok(());
        }

        let (mtime, size) =
            retry_with_backoff(&self.retry, || self.probe_inventory(), is_retryable_error).await?;
        cache.record_present(&key, Mtime::storage(mtime), size);
        tracing::debug!(key = %key, size = size, mtime = %mtime, "Inventoried");
        Ok(())
    }

    async fn retrieve(&self) -> Result<()> {
        retry_with_backoff(
            &self.retry,
            || self.backend.retrieve(&self.query_path, &self.local_path),
            is_retryable_error,
        )
        .await
    }

    async fn store(&self) -> Result<()> {
        retry_with_backoff(
            &self.retry,
            || self.backend.store(&self.local_path, &self.query_path),
            is_retryable_error,
        )
        .await
    }

    async fn remove(&self) -> Result<()> {
        retry_with_backoff(
            &self.retry,
            || self.backend.remove(&self.query_path),
            is_retryable_error,
        )
        .await
    }

    async fn touch(&self) -> Result<()> {
        retry_with_backoff(&self.retry, || self.touch_now(), is_retryable_error).await
    }

    async fn list_candidate_matches(&self) -> Result<Vec<String>> {
        let pattern = self.resolved.local_suffix();
        retry_with_backoff(
            &self.retry,
            || glob::list_candidates(&pattern),
            is_retryable_error,
        )
        .await
    }
}
