//! Offline tile service facade.
//!
//! [`OfflineTiles`] bundles a tile store and a tile source behind the
//! operations an application needs: start a region download, look up and
//! write single tiles, evict by region or entirely, and report usage.
//! Every background download is tracked by its own [`DownloadHandle`].

mod handle;
mod offline;

pub use handle::DownloadHandle;
pub use offline::OfflineTiles;
