//! rsync storage provider

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rstore_core::{
    Config, Error, ExampleQuery, Operation, QueryType, QueryValidation, ResolvedQuery, Result,
    StorageProvider, TransferBackend, validate_query,
};

use crate::backend::RsyncBackend;
use crate::object::RsyncObject;

/// Scheme tag of rsync queries
pub const SCHEME: &str = "rsync";

/// Builds [`RsyncObject`]s that share one config and one transfer backend
#[derive(Clone)]
pub struct RsyncProvider {
    config: Config,
    backend: Arc<dyn TransferBackend>,
}

impl RsyncProvider {
    /// Provider using the rsync program described by `config`
    pub fn new(config: Config) -> Self {
        let backend = Arc::new(RsyncBackend::new(&config.rsync));
        Self { config, backend }
    }

    /// Provider with a custom transfer backend
    pub fn with_backend(config: Config, backend: Arc<dyn TransferBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate and resolve `query` into an object whose working copy is
    /// `local_path`
    pub fn object(&self, query: &str, local_path: impl Into<PathBuf>) -> Result<RsyncObject> {
        self.is_valid_query(query).into_result()?;
        let resolved = ResolvedQuery::parse(query)?;
        Ok(RsyncObject::new(
            resolved,
            local_path.into(),
            self.config.retry.clone(),
            Arc::clone(&self.backend),
        ))
    }

    /// Default working copy location for `query` below `local_prefix`
    pub fn local_path_for(local_prefix: &Path, query: &str) -> Result<PathBuf> {
        let suffix = rstore_core::local_suffix(query)?;
        let relative = suffix.trim_start_matches('/');
        if relative.is_empty() {
            return Err(Error::InvalidQuery(format!("{query} (empty path)")));
        }
        Ok(local_prefix.join(relative))
    }
}

impl Default for RsyncProvider {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for RsyncProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsyncProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StorageProvider for RsyncProvider {
    fn name(&self) -> &str {
        SCHEME
    }

    fn is_valid_query(&self, query: &str) -> QueryValidation {
        validate_query(query, SCHEME)
    }

    fn example_queries(&self) -> Vec<ExampleQuery> {
        vec![ExampleQuery {
            query: "rsync://path/to/file.txt".to_string(),
            description: "A file or directory reachable via rsync".to_string(),
            query_type: QueryType::Any,
        }]
    }

    /// Queries against the same host share a limiter
    fn rate_limiter_key(&self, query: &str, _operation: Operation) -> String {
        ResolvedQuery::parse(query)
            .map(|r| r.authority().to_string())
            .unwrap_or_default()
    }

    fn default_max_requests_per_second(&self) -> f64 {
        100.0
    }

    fn use_rate_limiter(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstore_core::StorageObject;

    #[test]
    fn test_examples_are_valid() {
        let provider = RsyncProvider::default();
        let examples = provider.example_queries();
        assert!(!examples.is_empty());
        for example in examples {
            assert!(provider.is_valid_query(&example.query).valid, "{}", example.query);
        }
    }

    #[test]
    fn test_object_rejects_invalid_query() {
        let provider = RsyncProvider::default();
        let err = provider.object("s3://bucket/key", "/tmp/x").unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
        assert!(err.to_string().contains("scheme must be rsync"));
    }

    #[test]
    fn test_object_resolution() {
        let provider = RsyncProvider::default();
        let object = provider
            .object("rsync:///srv/data/reads.fq", "/work/srv/data/reads.fq")
            .unwrap();
        assert_eq!(object.query_path(), Path::new("/srv/data/reads.fq"));
        assert_eq!(object.scheme(), "rsync");
        assert_eq!(object.local_suffix(), "/srv/data/reads.fq");
        assert_eq!(object.local_path(), Path::new("/work/srv/data/reads.fq"));
        assert_eq!(object.cache_key().as_str(), "rsync+rsync:///srv/data/reads.fq");
        assert!(object.inventory_parent().is_none());
        let caps = object.capabilities();
        assert!(caps.read && caps.write && caps.glob && caps.touch);
    }

    #[test]
    fn test_local_path_for() {
        let prefix = Path::new("/work/.rstore");
        assert_eq!(
            RsyncProvider::local_path_for(prefix, "rsync:///srv/a.txt").unwrap(),
            PathBuf::from("/work/.rstore/srv/a.txt")
        );
        assert_eq!(
            RsyncProvider::local_path_for(prefix, "rsync://host/srv/a.txt").unwrap(),
            PathBuf::from("/work/.rstore/host/srv/a.txt")
        );
    }

    #[test]
    fn test_rate_limiter_key() {
        let provider = RsyncProvider::default();
        assert_eq!(
            provider.rate_limiter_key("rsync://backup/srv/a.txt", Operation::Retrieve),
            "backup"
        );
        assert_eq!(provider.rate_limiter_key("rsync:///srv/a.txt", Operation::Exists), "");
        assert!(!provider.use_rate_limiter());
    }
}
