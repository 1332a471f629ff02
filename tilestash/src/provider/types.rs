//! Tile source types and traits

use std::future::Future;

use thiserror::Error;

use crate::coord::TileCoord;

/// Errors that can occur while fetching a tile.
///
/// Every variant except [`FetchError::Cancelled`] is a network failure and
/// may be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The attempt did not finish in time.
    #[error("Request timed out")]
    Timeout,

    /// The fetch was abandoned because the job was cancelled.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether this error came from cooperative cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !self.is_cancellation()
    }
}

/// A remote source of tile imagery.
///
/// Implementors return the raw encoded bytes of one tile (PNG, JPEG, ...).
/// The downloader never inspects the payload.
pub trait TileSource: Send + Sync {
    /// Fetches the bytes of a single tile.
    fn fetch(&self, tile: &TileCoord) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Returns the source's name for logging and identification.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancellation_is_not_retryable() {
        assert!(FetchError::Http("reset".to_string()).is_retryable());
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Status {
            status: 503,
            url: "https://tiles.example.com/1/0/0.png".to_string()
        }
        .is_retryable());

        assert!(FetchError::Cancelled.is_cancellation());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::Timeout.is_cancellation());
    }

    #[test]
    fn test_status_display() {
        let err = FetchError::Status {
            status: 404,
            url: "https://tiles.example.com/3/1/2.png".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://tiles.example.com/3/1/2.png");
    }
}
