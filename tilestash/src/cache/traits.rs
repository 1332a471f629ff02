//! Core traits for the tile store.
//!
//! The `TileStore` trait is the four-operation storage contract the rest of
//! the crate relies on: keyed get/put, region-scoped and full eviction,
//! region enumeration, and a best-effort usage estimate. Nothing outside a
//! provider knows how entries are laid out on the substrate.
//!
//! # Example
//!
//! ```ignore
//! use tilestash::cache::{DiskTileStore, DiskStoreConfig, TileStore};
//!
//! let store = DiskTileStore::open(DiskStoreConfig::new("/var/cache/tiles")).await?;
//! store.put("14/8466/5498", bytes, Some("aachen")).await?;
//! let cached = store.get("14/8466/5498").await?;
//! store.clear_region("aachen").await?;
//! ```

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::types::{CachedTile, StorageUsage};

/// Errors that can occur during store operations.
///
/// Apart from the input checks (`InvalidKey`, `InvalidRegion`) every variant
/// is a storage failure: the substrate is unavailable or its contents are
/// unreadable. Callers should not retry these.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error on the underlying substrate.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored entry could not be decoded.
    #[error("Corrupt entry for key '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// The key is empty or otherwise unusable.
    #[error("Invalid key: '{0}'")]
    InvalidKey(String),

    /// A region tag was supplied but is blank.
    #[error("Invalid region label: '{0}'")]
    InvalidRegion(String),

    /// A blocking store task failed to complete.
    #[error("Store task failed: {0}")]
    Task(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Persistent keyed storage for tile bytes with region-scoped eviction.
///
/// # Upsert Semantics
///
/// There is at most one live entry per key. `put` replaces bytes and
/// timestamp; the region tag is replaced when one is supplied and kept
/// otherwise.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and tolerate concurrent `put` and
/// `get` calls from many tasks. Concurrent puts to the same key resolve
/// last-write-wins and never expose a partially written entry.
///
/// # Dyn Compatibility
///
/// Async methods return [`BoxFuture`] so stores can be shared as
/// `Arc<dyn TileStore>`.
pub trait TileStore: Send + Sync {
    /// Retrieve tile bytes by key.
    ///
    /// A missing key is `Ok(None)`, never an error.
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>>;

    /// Retrieve the full entry, including region tag and timestamp.
    fn get_entry(&self, key: &str) -> BoxFuture<'_, Result<Option<CachedTile>, StoreError>>;

    /// Insert or replace the entry for `key`.
    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        region: Option<&str>,
    ) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Delete every entry tagged with `region`.
    ///
    /// Entries with a different or absent tag are untouched. Returns the
    /// number of entries removed.
    fn clear_region(&self, region: &str) -> BoxFuture<'_, Result<usize, StoreError>>;

    /// Delete every entry. Returns the number of entries removed.
    fn clear_all(&self) -> BoxFuture<'_, Result<usize, StoreError>>;

    /// The distinct region tags currently present.
    fn list_regions(&self) -> BoxFuture<'_, Result<BTreeSet<String>, StoreError>>;

    /// Best-effort storage usage.
    ///
    /// Returns `StorageUsage::default()` (`{0, 0}`) when the substrate cannot
    /// report usage. This never fails.
    fn usage_estimate(&self) -> BoxFuture<'_, StorageUsage>;
}

/// Rejects keys no provider can store.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.trim().is_empty() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Rejects a supplied region tag that is blank.
pub(crate) fn validate_region_tag(region: Option<&str>) -> Result<(), StoreError> {
    match region {
        Some(region) if region.trim().is_empty() => {
            Err(StoreError::InvalidRegion(region.to_string()))
        }
        _ => Ok(()),
    }
}
