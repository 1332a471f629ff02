//! In-memory tile store using DashMap.
//!
//! Entries live for the lifetime of the store. Useful for tests and for
//! embedding where durability is handled elsewhere.
//!
//! DashMap shards its locks, so puts to different keys rarely contend and a
//! put to the same key is a single atomic replace of the shard entry.

use std::collections::BTreeSet;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::cache::traits::{validate_key, validate_region_tag, BoxFuture, StoreError, TileStore};
use crate::cache::types::{CachedTile, StorageUsage};

/// In-memory tile store.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    entries: DashMap<String, CachedTile>,
    /// Reported quota in bytes; 0 means unbounded.
    quota_bytes: u64,
}

impl MemoryTileStore {
    /// Create an unbounded memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store that reports `quota_bytes` as its quota.
    ///
    /// The quota is informational; writes are never rejected.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            quota_bytes,
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn used_bytes(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size()).sum()
    }
}

impl TileStore for MemoryTileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        let result = self.entries.get(key).map(|entry| entry.bytes.clone());
        Box::pin(async move { Ok(result) })
    }

    fn get_entry(&self, key: &str) -> BoxFuture<'_, Result<Option<CachedTile>, StoreError>> {
        let result = self.entries.get(key).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(result) })
    }

    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        region: Option<&str>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        let region = region.map(str::to_string);
        Box::pin(async move {
            validate_key(&key)?;
            validate_region_tag(region.as_deref())?;
            match self.entries.entry(key) {
                Entry::Occupied(mut occupied) => occupied.get_mut().overwrite(bytes, region),
                Entry::Vacant(vacant) => {
                    let key = vacant.key().clone();
                    vacant.insert(CachedTile::new(key, bytes, region));
                }
            }
            Ok(())
        })
    }

    fn clear_region(&self, region: &str) -> BoxFuture<'_, Result<usize, StoreError>> {
        let region = region.to_string();
        Box::pin(async move {
            let before = self.entries.len();
            self.entries
                .retain(|_, entry| entry.region.as_deref() != Some(region.as_str()));
            Ok(before.saturating_sub(self.entries.len()))
        })
    }

    fn clear_all(&self) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move {
            let removed = self.entries.len();
            self.entries.clear();
            Ok(removed)
        })
    }

    fn list_regions(&self) -> BoxFuture<'_, Result<BTreeSet<String>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .entries
                .iter()
                .filter_map(|entry| entry.region.clone())
                .collect())
        })
    }

    fn usage_estimate(&self) -> BoxFuture<'_, StorageUsage> {
        Box::pin(async move {
            StorageUsage {
                used: self.used_bytes(),
                quota: self.quota_bytes,
            }
        })
    }
}
