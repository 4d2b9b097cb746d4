//! Shared inventory cache
//!
//! The workflow engine owns one [`InventoryCache`] per run and hands it to
//! every storage object it inventories. Objects only ever add entries; an
//! entry for a key is written at most once.

use dashmap::DashMap;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::query::CacheKey;

/// Modification times recorded for an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mtime {
    /// Modification time on the storage side
    pub storage: Timestamp,
}

impl Mtime {
    pub fn storage(storage: Timestamp) -> Self {
        Self { storage }
    }
}

/// Existence, mtime and size keyed by [`CacheKey`]
///
/// Writes for one key are independent of every other key; concurrent
/// population of the same key is harmless because both writers observe the
/// same remote state.
#[derive(Debug, Default)]
pub struct InventoryCache {
    exists_in_storage: DashMap<CacheKey, bool>,
    mtime: DashMap<CacheKey, Mtime>,
    size: DashMap<CacheKey, u64>,
}

impl InventoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entry for `key` was already recorded (either way)
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.exists_in_storage.contains_key(key)
    }

    pub fn exists_in_storage(&self, key: &CacheKey) -> Option<bool> {
        self.exists_in_storage.get(key).map(|v| *v)
    }

    pub fn mtime(&self, key: &CacheKey) -> Option<Mtime> {
        self.mtime.get(key).map(|v| *v)
    }

    pub fn size(&self, key: &CacheKey) -> Option<u64> {
        self.size.get(key).map(|v| *v)
    }

    /// Record that the object does not exist
    ///
    /// Does nothing if the key already has an entry.
    pub fn record_missing(&self, key: &CacheKey) {
        if self.contains(key) {
            return;
        }
        self.exists_in_storage.insert(key.clone(), false);
    }

    /// Record an existing object
    ///
    /// `exists_in_storage` is written last, so anyone who sees it set to
    /// `true` also sees the mtime and size. Does nothing if the key already
    /// has an entry.
    pub fn record_present(&self, key: &CacheKey, mtime: Mtime, size: u64) {
        if self.contains(key) {
            return;
        }
        self.mtime.insert(key.clone(), mtime);
        self.size.insert(key.clone(), size);
        self.exists_in_storage.insert(key.clone(), true);
    }

    /// Number of keys with an existence entry
    pub fn len(&self) -> usize {
        self.exists_in_storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exists_in_storage.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::new("rsync", &format!("rsync:///data/{name}"))
    }

    #[test]
    fn test_record_missing_leaves_metadata_unset() {
        let cache = InventoryCache::new();
        let k = key("gone.txt");

        cache.record_missing(&k);

        assert_eq!(cache.exists_in_storage(&k), Some(false));
        assert!(cache.mtime(&k).is_none());
        assert!(cache.size(&k).is_none());
    }

    #[test]
    fn test_record_present() {
        let cache = InventoryCache::new();
        let k = key("there.txt");
        let ts = Timestamp::from_second(1_700_000_000).unwrap();

        cache.record_present(&k, Mtime::storage(ts), 42);

        assert_eq!(cache.exists_in_storage(&k), Some(true));
        assert_eq!(cache.mtime(&k), Some(Mtime::storage(ts)));
        assert_eq!(cache.size(&k), Some(42));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_second_write_is_ignored() {
        let cache = InventoryCache::new();
        let k = key("once.txt");
        let first = Timestamp::from_second(1_700_000_000).unwrap();
        let second = Timestamp::from_second(1_800_000_000).unwrap();

        cache.record_present(&k, Mtime::storage(first), 1);
        cache.record_present(&k, Mtime::storage(second), 2);
        cache.record_missing(&k);

        assert_eq!(cache.exists_in_storage(&k), Some(true));
        assert_eq!(cache.mtime(&k), Some(Mtime::storage(first)));
        assert_eq!(cache.size(&k), Some(1));
    }
}
