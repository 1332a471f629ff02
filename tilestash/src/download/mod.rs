//! Offline region download.
//!
//! [`BatchDownloader`] expands a bounding box into tiles, fetches them from a
//! [`TileSource`](crate::provider::TileSource) in paced batches, and stores
//! every success in a [`TileStore`](crate::cache::TileStore) tagged with the
//! region label.

mod config;
mod downloader;
mod error;
mod progress;

pub use config::{
    DownloadOptions, DEFAULT_BACKOFF_MS, DEFAULT_BATCH_DELAY_MS, DEFAULT_FETCH_TIMEOUT_SECS,
    DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_TILES, DEFAULT_RETRY_COUNT,
};
pub use downloader::{BatchDownloader, COMPLETION_THRESHOLD};
pub use error::{DownloadError, ErrorKind};
pub use progress::{DownloadProgress, DownloadStatus, DownloadSummary, ProgressCallback};

pub(crate) use downloader::{plan_tiles, validate_region};
