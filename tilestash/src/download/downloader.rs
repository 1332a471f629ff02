//! Batched tile downloader.
//!
//! Tiles are fetched in sequential batches of `max_concurrent`. Inside a
//! batch every tile runs concurrently with its own retry loop; the next
//! batch starts only after the whole batch has settled and the pacing delay
//! has elapsed.
//!
//! # Cancellation
//!
//! The job token is checked before each batch and before each tile, and
//! races every in-flight fetch, backoff sleep and pacing sleep. Tiles
//! already stored when the token fires stay cached.
//!
//! # Failure Handling
//!
//! - Fetch failures are retried with exponential backoff. A tile that
//!   exhausts its attempts is logged and counted; the job continues.
//! - Store failures abort the job immediately.

use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::DownloadOptions;
use super::error::DownloadError;
use super::progress::{percentage_of, DownloadStatus, DownloadSummary, ProgressCallback, ProgressTracker};
use crate::cache::{StoreError, TileStore};
use crate::coord::{compute_tiles, count_tiles, BoundingBox, TileCoord};
use crate::provider::{FetchError, TileSource};

/// Minimum share of tiles that must be stored for a job to succeed.
pub const COMPLETION_THRESHOLD: f64 = 0.9;

/// How a single tile ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileOutcome {
    Downloaded,
    Skipped,
    Failed,
    Cancelled,
}

/// Rejects blank region labels, returning the label unchanged otherwise.
pub(crate) fn validate_region(region: &str) -> Result<&str, DownloadError> {
    if region.trim().is_empty() {
        return Err(DownloadError::InvalidRegion(region.to_string()));
    }
    Ok(region)
}

/// Rejects jobs larger than `options.max_tiles`.
fn check_tile_count(count: u64, options: &DownloadOptions) -> Result<(), DownloadError> {
    if count > options.max_tiles {
        return Err(DownloadError::TooManyTiles {
            count,
            limit: options.max_tiles,
        });
    }
    Ok(())
}

/// Computes the tiles of a job, sizing it before allocating the list.
pub(crate) fn plan_tiles(
    bounds: &BoundingBox,
    zoom_levels: &[u8],
    options: &DownloadOptions,
) -> Result<Vec<TileCoord>, DownloadError> {
    check_tile_count(count_tiles(bounds, zoom_levels)?, options)?;
    Ok(compute_tiles(bounds, zoom_levels)?)
}

/// Fetches tiles from a source into a store.
pub struct BatchDownloader<S: TileSource> {
    source: Arc<S>,
    store: Arc<dyn TileStore>,
}

impl<S: TileSource> Clone for BatchDownloader<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TileSource> BatchDownloader<S> {
    /// Create a downloader writing into `store`.
    pub fn new(source: Arc<S>, store: Arc<dyn TileStore>) -> Self {
        Self { source, store }
    }

    /// Download every tile covering `bounds` at `zoom_levels`, tagging each
    /// stored tile with `region`.
    ///
    /// # Errors
    ///
    /// - [`DownloadError::InvalidRegion`], [`DownloadError::InvalidBounds`] or
    ///   [`DownloadError::TooManyTiles`] before any fetch
    /// - [`DownloadError::Storage`] when a write fails
    /// - [`DownloadError::Cancelled`] when `cancel` fires
    /// - [`DownloadError::Incomplete`] when fewer than 90% of tiles were stored
    pub async fn download_region(
        &self,
        bounds: &BoundingBox,
        zoom_levels: &[u8],
        region: &str,
        options: &DownloadOptions,
        cancel: &CancellationToken,
        on_progress: Option<ProgressCallback>,
    ) -> Result<DownloadSummary, DownloadError> {
        let region = validate_region(region)?;
        let tiles = plan_tiles(bounds, zoom_levels, options)?;

        info!(
            region = %region,
            bounds = %bounds,
            zooms = ?zoom_levels,
            tiles = tiles.len(),
            source = self.source.name(),
            "Starting region download"
        );

        self.download_tiles(&tiles, region, options, cancel, on_progress)
            .await
    }

    /// Download a precomputed list of tiles.
    pub async fn download_tiles(
        &self,
        tiles: &[TileCoord],
        region: &str,
        options: &DownloadOptions,
        cancel: &CancellationToken,
        on_progress: Option<ProgressCallback>,
    ) -> Result<DownloadSummary, DownloadError> {
        let region = validate_region(region)?;
        check_tile_count(tiles.len() as u64, options)?;
        let started = Instant::now();
        let total = tiles.len();
        let progress = ProgressTracker::new(total, on_progress);
        progress.emit(DownloadStatus::Downloading);

        let batch_size = options.batch_size();
        let batch_count = total.div_ceil(batch_size);
        let mut cancelled = false;

        for (index, batch) in tiles.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            debug!(
                batch = index + 1,
                batches = batch_count,
                tiles = batch.len(),
                "Running batch"
            );

            let outcomes = try_join_all(
                batch
                    .iter()
                    .map(|tile| self.download_tile(tile, region, options, cancel, &progress)),
            )
            .await?;

            if outcomes.contains(&TileOutcome::Cancelled) {
                cancelled = true;
                break;
            }

            let is_last = index + 1 == batch_count;
            if !is_last && !options.batch_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(options.batch_delay) => {}
                }
            }
        }

        let downloaded = progress.downloaded();

        if cancelled {
            progress.emit(DownloadStatus::Cancelled);
            info!(region = %region, downloaded, total, "Download cancelled");
            return Err(DownloadError::Cancelled { downloaded, total });
        }

        let final_progress = progress.emit(DownloadStatus::Completed);
        info!(
            region = %region,
            downloaded,
            failed = final_progress.failed,
            skipped = final_progress.skipped,
            total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Download completed"
        );

        if (downloaded as f64) < total as f64 * COMPLETION_THRESHOLD {
            return Err(DownloadError::Incomplete {
                downloaded,
                total,
                percentage: percentage_of(downloaded, total),
            });
        }

        Ok(progress.summary(started.elapsed()))
    }

    /// Fetch and store one tile.
    ///
    /// Only store failures are returned as errors; everything else is an
    /// outcome.
    async fn download_tile(
        &self,
        tile: &TileCoord,
        region: &str,
        options: &DownloadOptions,
        cancel: &CancellationToken,
        progress: &ProgressTracker,
    ) -> Result<TileOutcome, DownloadError> {
        if cancel.is_cancelled() {
            return Ok(TileOutcome::Cancelled);
        }

        let key = tile.cache_key();

        if options.skip_cached {
            match self.store.get(&key).await {
                Ok(Some(_)) => {
                    debug!(tile = %key, "Tile already cached, skipping");
                    progress.record_skipped();
                    return Ok(TileOutcome::Skipped);
                }
                Ok(None) => {}
                // Overwritten by the fetch below
                Err(StoreError::Corrupt { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        match self.fetch_with_retry(tile, options, cancel).await {
            Ok(bytes) => {
                self.store.put(&key, bytes, Some(region)).await?;
                progress.record_downloaded();
                Ok(TileOutcome::Downloaded)
            }
            Err(FetchError::Cancelled) => Ok(TileOutcome::Cancelled),
            Err(e) => {
                warn!(
                    tile = %key,
                    attempts = options.max_attempts(),
                    error = %e,
                    "Tile download failed, skipping"
                );
                progress.record_failed();
                Ok(TileOutcome::Failed)
            }
        }
    }

    /// Fetch a tile, retrying retryable failures with exponential backoff.
    async fn fetch_with_retry(
        &self,
        tile: &TileCoord,
        options: &DownloadOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let max_attempts = options.max_attempts();
        let mut attempt = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                result = tokio::time::timeout(options.fetch_timeout, self.source.fetch(tile)) => {
                    result.unwrap_or(Err(FetchError::Timeout))
                }
            };

            let error = match result {
                Ok(bytes) => return Ok(bytes),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt + 1 >= max_attempts {
                return Err(error);
            }

            let delay = options.backoff_for(attempt);
            debug!(
                tile = %tile,
                attempt = attempt + 1,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Tile fetch failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoxFuture, CachedTile, MemoryTileStore, StorageUsage};
    use crate::download::{DownloadProgress, ErrorKind, DEFAULT_MAX_TILES};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted tile source that records attempts and peak concurrency.
    #[derive(Default)]
    struct StubSource {
        delay: Duration,
        /// Failures before a tile succeeds; `usize::MAX` never succeeds.
        failures: HashMap<TileCoord, usize>,
        attempts: Mutex<HashMap<TileCoord, usize>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl StubSource {
        fn with_delay(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        fn failing(mut self, tile: TileCoord, failures: usize) -> Self {
            self.failures.insert(tile, failures);
            self
        }

        fn attempts_for(&self, tile: &TileCoord) -> usize {
            self.attempts.lock().unwrap().get(tile).copied().unwrap_or(0)
        }
    }

    impl TileSource for StubSource {
        async fn fetch(&self, tile: &TileCoord) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let count = attempts.entry(*tile).or_insert(0);
                *count += 1;
                *count
            };

            if attempt <= self.failures.get(tile).copied().unwrap_or(0) {
                return Err(FetchError::Status {
                    status: 503,
                    url: format!("https://tiles.example.com/{}.png", tile),
                });
            }
            Ok(tile.cache_key().into_bytes())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// Store whose writes always fail.
    struct BrokenStore;

    impl TileStore for BrokenStore {
        fn get(&self, _key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
            Box::pin(async { Ok(None) })
        }

        fn get_entry(&self, _key: &str) -> BoxFuture<'_, Result<Option<CachedTile>, StoreError>> {
            Box::pin(async { Ok(None) })
        }

        fn put(
            &self,
            _key: &str,
            _bytes: Vec<u8>,
            _region: Option<&str>,
        ) -> BoxFuture<'_, Result<(), StoreError>> {
            Box::pin(async {
                Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )))
            })
        }

        fn clear_region(&self, _region: &str) -> BoxFuture<'_, Result<usize, StoreError>> {
            Box::pin(async { Ok(0) })
        }

        fn clear_all(&self) -> BoxFuture<'_, Result<usize, StoreError>> {
            Box::pin(async { Ok(0) })
        }

        fn list_regions(&self) -> BoxFuture<'_, Result<BTreeSet<String>, StoreError>> {
            Box::pin(async { Ok(BTreeSet::new()) })
        }

        fn usage_estimate(&self) -> BoxFuture<'_, StorageUsage> {
            Box::pin(async { StorageUsage::default() })
        }
    }

    fn row(count: u32) -> Vec<TileCoord> {
        (0..count).map(|x| TileCoord::new(5, x, 11)).collect()
    }

    fn fast_options(max_concurrent: usize) -> DownloadOptions {
        DownloadOptions::new()
            .with_max_concurrent(max_concurrent)
            .with_batch_delay(Duration::ZERO)
            .with_backoff_unit(Duration::from_millis(1))
    }

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<DownloadProgress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(*p));
        (callback, events)
    }

    fn setup(source: StubSource) -> (Arc<StubSource>, Arc<MemoryTileStore>, BatchDownloader<StubSource>) {
        let source = Arc::new(source);
        let store = Arc::new(MemoryTileStore::new());
        let downloader = BatchDownloader::new(Arc::clone(&source), store.clone());
        (source, store, downloader)
    }

    #[tokio::test]
    async fn test_five_tiles_in_batches_of_two() {
        let (source, store, downloader) = setup(StubSource::with_delay(Duration::from_millis(10)));
        let (callback, events) = recorder();

        let summary = downloader
            .download_tiles(&row(5), "test", &fast_options(2), &CancellationToken::new(), Some(callback))
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(store.len(), 5);
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
        assert_eq!(source.peak.load(Ordering::SeqCst), 2);

        let events = events.lock().unwrap();
        let downloaded: Vec<_> = events.iter().map(|p| p.downloaded).collect();
        assert_eq!(downloaded, vec![0, 1, 2, 3, 4, 5, 5]);
        let last = events.last().unwrap();
        assert_eq!(last.status, DownloadStatus::Completed);
        assert_eq!(last.percentage, 100);
    }

    #[tokio::test]
    async fn test_stored_tiles_carry_region() {
        let (_source, store, downloader) = setup(StubSource::default());

        downloader
            .download_tiles(&row(2), "alps", &fast_options(5), &CancellationToken::new(), None)
            .await
            .unwrap();

        let entry = store.get_entry("5/1/11").await.unwrap().unwrap();
        assert_eq!(entry.bytes, b"5/1/11".to_vec());
        assert_eq!(entry.region.as_deref(), Some("alps"));
    }

    #[tokio::test]
    async fn test_below_threshold_is_incomplete() {
        let tiles = row(5);
        let source = StubSource::default().failing(tiles[3], usize::MAX);
        let (source, store, downloader) = setup(source);
        let (callback, events) = recorder();

        let result = downloader
            .download_tiles(
                &tiles,
                "test",
                &fast_options(5).with_retry_count(2),
                &CancellationToken::new(),
                Some(callback),
            )
            .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Incomplete {
                downloaded: 4,
                total: 5,
                percentage: 80
            }
        ));
        assert!(err.to_string().contains("4 of 5"));
        assert_eq!(err.kind(), ErrorKind::Completion);
        assert_eq!(source.attempts_for(&tiles[3]), 2);
        assert_eq!(store.len(), 4);

        let last = *events.lock().unwrap().last().unwrap();
        assert_eq!(last.status, DownloadStatus::Completed);
        assert_eq!(last.failed, 1);
        assert_eq!(last.percentage, 80);
    }

    #[tokio::test]
    async fn test_at_threshold_succeeds_with_failures() {
        let tiles = row(10);
        let source = StubSource::default().failing(tiles[9], usize::MAX);
        let (_source, _store, downloader) = setup(source);

        let summary = downloader
            .download_tiles(
                &tiles,
                "test",
                &fast_options(5).with_retry_count(1),
                &CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 9);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_cancel_after_first_batch() {
        let (source, store, downloader) = setup(StubSource::default());
        let (recorded, events) = recorder();
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let callback: ProgressCallback = Arc::new(move |p| {
            recorded(p);
            if p.downloaded == 2 {
                token.cancel();
            }
        });

        let options = fast_options(2).with_batch_delay(Duration::from_millis(50));
        let result = downloader
            .download_tiles(&row(5), "test", &options, &cancel, Some(callback))
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::Cancelled {
                downloaded: 2,
                total: 5
            })
        ));
        assert_eq!(store.len(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        let last = *events.lock().unwrap().last().unwrap();
        assert_eq!(last.status, DownloadStatus::Cancelled);
        assert_eq!(last.downloaded, 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (source, store, downloader) = setup(StubSource::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = downloader
            .download_tiles(&row(3), "test", &fast_options(2), &cancel, None)
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::Cancelled {
                downloaded: 0,
                total: 3
            })
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_fetch() {
        let (_source, store, downloader) = setup(StubSource::with_delay(Duration::from_secs(30)));
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            downloader.download_tiles(&row(3), "test", &fast_options(3), &cancel, None),
        )
        .await
        .expect("cancellation should interrupt the fetch");

        assert!(matches!(result, Err(DownloadError::Cancelled { downloaded: 0, .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt() {
        let tile = TileCoord::new(7, 64, 42);
        let (source, store, downloader) = setup(StubSource::default().failing(tile, 2));

        let summary = downloader
            .download_tiles(
                &[tile],
                "test",
                &fast_options(1).with_retry_count(3),
                &CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(source.attempts_for(&tile), 3);
        assert_eq!(store.get("7/64/42").await.unwrap(), Some(b"7/64/42".to_vec()));
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let tile = TileCoord::new(7, 64, 42);
        let (source, store, downloader) = setup(StubSource::default().failing(tile, 2));

        let result = downloader
            .download_tiles(
                &[tile],
                "test",
                &fast_options(1).with_retry_count(2),
                &CancellationToken::new(),
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::Incomplete {
                downloaded: 0,
                total: 1,
                ..
            })
        ));
        assert_eq!(source.attempts_for(&tile), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        let (_source, _store, downloader) = setup(StubSource::with_delay(Duration::from_millis(500)));

        let options = fast_options(1)
            .with_retry_count(1)
            .with_fetch_timeout(Duration::from_millis(20));
        let result = downloader
            .download_tiles(&row(1), "test", &options, &CancellationToken::new(), None)
            .await;

        assert!(matches!(result, Err(DownloadError::Incomplete { downloaded: 0, .. })));
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_limit() {
        let (source, _store, downloader) = setup(StubSource::with_delay(Duration::from_millis(10)));

        downloader
            .download_tiles(&row(12), "test", &fast_options(3), &CancellationToken::new(), None)
            .await
            .unwrap();

        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {}", peak);
        assert_eq!(peak, 3);
    }

    #[tokio::test]
    async fn test_skip_cached_tiles() {
        let tiles = row(5);
        let (source, store, downloader) = setup(StubSource::default());
        store.put(&tiles[0].cache_key(), vec![1], None).await.unwrap();
        store.put(&tiles[1].cache_key(), vec![2], None).await.unwrap();

        let summary = downloader
            .download_tiles(
                &tiles,
                "test",
                &fast_options(5).with_skip_cached(true),
                &CancellationToken::new(),
                None,
            )
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 5);
        assert_eq!(summary.skipped, 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.get(&tiles[0].cache_key()).await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_cached_tiles_refetched_by_default() {
        let tiles = row(2);
        let (source, store, downloader) = setup(StubSource::default());
        store.put(&tiles[0].cache_key(), vec![1], None).await.unwrap();

        downloader
            .download_tiles(&tiles, "test", &fast_options(5), &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        let entry = store.get_entry(&tiles[0].cache_key()).await.unwrap().unwrap();
        assert_eq!(entry.bytes, tiles[0].cache_key().into_bytes());
        assert_eq!(entry.region.as_deref(), Some("test"));
    }

    #[tokio::test]
    async fn test_storage_error_aborts_job() {
        let source = Arc::new(StubSource::default());
        let downloader = BatchDownloader::new(Arc::clone(&source), Arc::new(BrokenStore));

        let result = downloader
            .download_tiles(&row(6), "test", &fast_options(2), &CancellationToken::new(), None)
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, DownloadError::Storage(StoreError::Io(_))));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(source.calls.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_blank_region_rejected() {
        let (source, _store, downloader) = setup(StubSource::default());

        let result = downloader
            .download_tiles(&row(1), "  ", &fast_options(1), &CancellationToken::new(), None)
            .await;

        assert!(matches!(result, Err(DownloadError::InvalidRegion(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_region_maps_bounds() {
        let (_source, store, downloader) = setup(StubSource::default());
        let aachen = BoundingBox::new(50.811, 50.7492, 6.1649, 6.031);

        let summary = downloader
            .download_region(&aachen, &[10], "aachen", &fast_options(5), &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(store.get("10/529/343").await.unwrap(), Some(b"10/529/343".to_vec()));
    }

    #[tokio::test]
    async fn test_download_region_rejects_bad_bounds() {
        let (_source, _store, downloader) = setup(StubSource::default());
        let bounds = BoundingBox::new(10.0, 0.0, 200.0, 0.0);

        let result = downloader
            .download_region(&bounds, &[3], "test", &fast_options(5), &CancellationToken::new(), None)
            .await;

        assert!(matches!(result, Err(DownloadError::InvalidBounds(_))));
    }

    #[tokio::test]
    async fn test_whole_world_at_high_zoom_is_rejected() {
        let (source, store, downloader) = setup(StubSource::default());
        let world = BoundingBox::new(85.0, -85.0, 180.0, -180.0);

        let result = downloader
            .download_region(&world, &[20], "world", &fast_options(5), &CancellationToken::new(), None)
            .await;

        match result {
            Err(DownloadError::TooManyTiles { count, limit }) => {
                assert!(count > 1_000_000_000_000);
                assert_eq!(limit, DEFAULT_MAX_TILES);
            }
            other => panic!("expected TooManyTiles, got {other:?}"),
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_tile_limit_applies_to_tile_lists() {
        let (source, _store, downloader) = setup(StubSource::default());
        let options = fast_options(5).with_max_tiles(3);

        let over = downloader
            .download_tiles(&row(4), "test", &options, &CancellationToken::new(), None)
            .await;
        assert!(matches!(
            over,
            Err(DownloadError::TooManyTiles { count: 4, limit: 3 })
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        let at_limit = downloader
            .download_tiles(&row(3), "test", &options, &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(at_limit.downloaded, 3);
    }

    #[tokio::test]
    async fn test_empty_job_completes() {
        let (_source, _store, downloader) = setup(StubSource::default());
        let (callback, events) = recorder();

        let summary = downloader
            .download_tiles(&[], "test", &fast_options(5), &CancellationToken::new(), Some(callback))
            .await
            .unwrap();

        assert_eq!(summary.total, 0);
        let last = *events.lock().unwrap().last().unwrap();
        assert_eq!(last.status, DownloadStatus::Completed);
        assert_eq!(last.percentage, 100);
    }
}
