//! Download job configuration.

use std::time::Duration;

/// Default number of tiles fetched concurrently per batch.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default number of fetch attempts per tile (including the first).
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default pause between batches (100ms).
pub const DEFAULT_BATCH_DELAY_MS: u64 = 100;

/// Default backoff unit (100ms).
pub const DEFAULT_BACKOFF_MS: u64 = 100;

/// Default per-attempt fetch timeout (30 seconds).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default cap on the number of tiles one job may cover.
pub const DEFAULT_MAX_TILES: u64 = 100_000;

/// Largest backoff exponent; keeps the delay arithmetic bounded.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Options for one download job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Tiles fetched concurrently per batch. Values below 1 act as 1.
    pub max_concurrent: usize,

    /// Total fetch attempts per tile. Values below 1 act as 1.
    pub retry_count: u32,

    /// Pause between consecutive batches.
    pub batch_delay: Duration,

    /// Base delay for exponential backoff between attempts.
    pub backoff_unit: Duration,

    /// Upper bound on a single fetch attempt.
    pub fetch_timeout: Duration,

    /// Count tiles already in the store as downloaded without fetching.
    pub skip_cached: bool,

    /// Largest number of tiles a job may cover. Larger areas are rejected
    /// before any tile list is built.
    pub max_tiles: u64,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            retry_count: DEFAULT_RETRY_COUNT,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
            backoff_unit: Duration::from_millis(DEFAULT_BACKOFF_MS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            skip_cached: false,
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

impl DownloadOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the batch size.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the total attempts per tile.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the pause between batches.
    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    /// Set the backoff unit.
    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    /// Set the per-attempt fetch timeout.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Enable or disable skipping tiles that are already cached.
    pub fn with_skip_cached(mut self, skip_cached: bool) -> Self {
        self.skip_cached = skip_cached;
        self
    }

    /// Set the tile count limit.
    pub fn with_max_tiles(mut self, max_tiles: u64) -> Self {
        self.max_tiles = max_tiles;
        self
    }

    /// Effective batch size.
    pub fn batch_size(&self) -> usize {
        self.max_concurrent.max(1)
    }

    /// Effective attempt count.
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.max(1)
    }

    /// Delay before the retry that follows failed attempt `attempt`
    /// (zero-based): `backoff_unit * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_EXPONENT))
    }
}
