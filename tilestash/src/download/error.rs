//! Download error types.

use thiserror::Error;

use crate::cache::StoreError;
use crate::coord::CoordError;

/// Coarse classification of a [`DownloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any work started.
    InvalidInput,
    /// The store failed; the job was aborted.
    Storage,
    /// The job was cancelled.
    Cancellation,
    /// Too few tiles were downloaded.
    Completion,
    /// The job's task failed.
    Internal,
}

/// Terminal errors of a download job.
///
/// Network failures of individual tiles are not here: they are retried,
/// logged and counted, and only surface through [`DownloadError::Incomplete`].
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The region label is empty.
    #[error("Invalid region label: '{0}'")]
    InvalidRegion(String),

    /// The bounding box or zoom list cannot be mapped to tiles.
    #[error("Invalid bounds: {0}")]
    InvalidBounds(#[from] CoordError),

    /// The area covers more tiles than the job limit allows.
    #[error("Area covers {count} tiles, more than the limit of {limit}")]
    TooManyTiles { count: u64, limit: u64 },

    /// Writing to the store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// The job was cancelled. Tiles already stored stay cached.
    #[error("Download cancelled after {downloaded} of {total} tiles")]
    Cancelled { downloaded: usize, total: usize },

    /// Fewer than the completion threshold of tiles were stored.
    #[error("Download incomplete: only {downloaded} of {total} tiles downloaded ({percentage}%)")]
    Incomplete {
        downloaded: usize,
        total: usize,
        percentage: u8,
    },

    /// The background task running the job failed.
    #[error("Download task failed: {0}")]
    Task(String),
}

impl DownloadError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::InvalidRegion(_)
            | DownloadError::InvalidBounds(_)
            | DownloadError::TooManyTiles { .. } => ErrorKind::InvalidInput,
            DownloadError::Storage(_) => ErrorKind::Storage,
            DownloadError::Cancelled { .. } => ErrorKind::Cancellation,
            DownloadError::Incomplete { .. } => ErrorKind::Completion,
            DownloadError::Task(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }
}
