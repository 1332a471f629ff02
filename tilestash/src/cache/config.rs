//! Configuration types for tile store providers.

use std::path::PathBuf;

/// Default reported quota for the disk store (2 GB).
pub const DEFAULT_DISK_QUOTA: u64 = 2 * 1024 * 1024 * 1024;

/// Configuration for opening a [`DiskTileStore`](super::DiskTileStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskStoreConfig {
    /// Directory for tile records.
    pub directory: PathBuf,

    /// Quota reported by `usage_estimate`.
    ///
    /// The store does not evict on its own; clearing is driven by callers.
    pub max_size_bytes: u64,
}

impl DiskStoreConfig {
    /// Create a disk store configuration with the default quota.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            max_size_bytes: DEFAULT_DISK_QUOTA,
        }
    }

    /// Set the reported quota in bytes.
    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }
}
