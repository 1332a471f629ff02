//! Persistent tile storage.
//!
//! Tiles are stored under their `"{zoom}/{x}/{y}"` key with an optional
//! region tag. The tag lets a whole downloaded area be evicted at once
//! without touching tiles cached for other areas.
//!
//! # Architecture
//!
//! ```text
//! OfflineTiles / BatchDownloader
//!              │
//!              ▼
//!     Arc<dyn TileStore>
//!        │          │
//!        ▼          ▼
//! DiskTileStore  MemoryTileStore
//! ```

mod config;
mod providers;
mod traits;
mod types;

pub use config::{DiskStoreConfig, DEFAULT_DISK_QUOTA};
pub use providers::{DiskTileStore, MemoryTileStore};
pub use traits::{BoxFuture, StoreError, TileStore};
pub use types::{format_size, CachedTile, StorageUsage};
