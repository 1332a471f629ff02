//! Caller-facing offline tile service.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handle::DownloadHandle;
use crate::cache::{StorageUsage, StoreError, TileStore};
use crate::coord::BoundingBox;
use crate::download::{
    plan_tiles, validate_region, BatchDownloader, DownloadError, DownloadOptions, DownloadProgress,
    DownloadSummary, ProgressCallback,
};
use crate::provider::TileSource;

/// Offline tile service: region downloads plus cache lookup and eviction.
///
/// # Example
///
/// ```ignore
/// use tilestash::service::OfflineTiles;
///
/// let tiles = OfflineTiles::new(store, source);
/// let handle = tiles.start_download(&bounds, &[12, 13, 14], "aachen")?;
/// println!("{}", handle.progress());
/// let summary = handle.wait().await?;
/// ```
pub struct OfflineTiles<S: TileSource> {
    store: Arc<dyn TileStore>,
    downloader: BatchDownloader<S>,
    options: DownloadOptions,
}

impl<S: TileSource + 'static> OfflineTiles<S> {
    /// Create a service with default download options.
    pub fn new(store: Arc<dyn TileStore>, source: Arc<S>) -> Self {
        Self {
            downloader: BatchDownloader::new(source, Arc::clone(&store)),
            store,
            options: DownloadOptions::default(),
        }
    }

    /// Replace the default download options.
    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    /// Default download options.
    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn TileStore> {
        &self.store
    }

    /// Start downloading a region in the background with default options.
    ///
    /// Input is validated before the job is spawned, so a bad region or
    /// bounding box is reported here rather than through the handle.
    pub fn start_download(
        &self,
        bounds: &BoundingBox,
        zoom_levels: &[u8],
        region: &str,
    ) -> Result<DownloadHandle, DownloadError> {
        self.start_download_with(bounds, zoom_levels, region, self.options.clone())
    }

    /// Start downloading a region in the background with explicit options.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_download_with(
        &self,
        bounds: &BoundingBox,
        zoom_levels: &[u8],
        region: &str,
        options: DownloadOptions,
    ) -> Result<DownloadHandle, DownloadError> {
        let region = validate_region(region)?.to_string();
        let tiles = plan_tiles(bounds, zoom_levels, &options)?;
        let runtime = Handle::try_current().map_err(|e| DownloadError::Task(e.to_string()))?;

        info!(
            region = %region,
            bounds = %bounds,
            zooms = ?zoom_levels,
            tiles = tiles.len(),
            "Starting background download"
        );

        let (progress_tx, progress_rx) = watch::channel(DownloadProgress::starting(tiles.len()));
        let on_progress: ProgressCallback = Arc::new(move |progress| {
            progress_tx.send_replace(*progress);
        });

        let cancellation = CancellationToken::new();
        let cancel_token = cancellation.clone();
        let downloader = self.downloader.clone();
        let job_region = region.clone();

        let task = runtime.spawn(async move {
            downloader
                .download_tiles(&tiles, &job_region, &options, &cancel_token, Some(on_progress))
                .await
        });

        Ok(DownloadHandle::new(region, progress_rx, cancellation, task))
    }

    /// Download a region inline, driven by the caller's token.
    pub async fn download_region(
        &self,
        bounds: &BoundingBox,
        zoom_levels: &[u8],
        region: &str,
        cancel: &CancellationToken,
        on_progress: Option<ProgressCallback>,
    ) -> Result<DownloadSummary, DownloadError> {
        self.downloader
            .download_region(bounds, zoom_levels, region, &self.options, cancel, on_progress)
            .await
    }

    /// Look up a cached tile by its `"{zoom}/{x}/{y}"` key.
    pub async fn get_cached_tile(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.store.get(key).await
    }

    /// Store a tile directly.
    pub async fn cache_tile(
        &self,
        key: &str,
        bytes: Vec<u8>,
        region: Option<&str>,
    ) -> Result<(), StoreError> {
        self.store.put(key, bytes, region).await
    }

    /// Remove every tile tagged with `region`.
    pub async fn clear_region_tiles(&self, region: &str) -> Result<usize, StoreError> {
        self.store.clear_region(region).await
    }

    /// Remove every cached tile.
    pub async fn clear_all_tiles(&self) -> Result<usize, StoreError> {
        self.store.clear_all().await
    }

    /// Region labels present in the cache, sorted.
    pub async fn get_cached_regions(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.store.list_regions().await?.into_iter().collect())
    }

    /// Best-effort storage usage.
    pub async fn get_storage_usage(&self) -> StorageUsage {
        self.store.usage_estimate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTileStore;
    use crate::coord::TileCoord;
    use crate::download::DownloadStatus;
    use crate::provider::FetchError;
    use std::time::Duration;

    /// Source that returns the tile key after a fixed delay.
    struct SlowSource {
        delay: Duration,
    }

    impl TileSource for SlowSource {
        async fn fetch(&self, tile: &TileCoord) -> Result<Vec<u8>, FetchError> {
            tokio::time::sleep(self.delay).await;
            Ok(tile.cache_key().into_bytes())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn service(delay: Duration) -> (Arc<MemoryTileStore>, OfflineTiles<SlowSource>) {
        let store = Arc::new(MemoryTileStore::new());
        let options = DownloadOptions::new()
            .with_max_concurrent(1)
            .with_batch_delay(Duration::ZERO);
        let tiles = OfflineTiles::new(store.clone(), Arc::new(SlowSource { delay })).with_options(options);
        (store, tiles)
    }

    fn world() -> BoundingBox {
        BoundingBox::new(85.0, -85.0, 180.0, -180.0)
    }

    #[tokio::test]
    async fn test_start_download_completes() {
        let (store, tiles) = service(Duration::ZERO);

        let handle = tiles.start_download(&world(), &[1], "world").unwrap();
        let mut progress = handle.subscribe();
        let summary = handle.wait().await.unwrap();

        assert_eq!(summary.downloaded, 4);
        assert_eq!(store.len(), 4);
        let last = *progress.borrow_and_update();
        assert_eq!(last.status, DownloadStatus::Completed);
        assert_eq!(last.percentage, 100);
    }

    #[tokio::test]
    async fn test_jobs_cancel_independently() {
        let (store, tiles) = service(Duration::from_millis(20));

        let first = tiles.start_download(&world(), &[1], "first").unwrap();
        let second = tiles.start_download(&world(), &[1], "second").unwrap();

        assert!(first.cancel());
        assert!(!second.cancellation_token().is_cancelled());

        let first_result = first.wait().await;
        let second_result = second.wait().await;

        assert!(matches!(first_result, Err(DownloadError::Cancelled { .. })));
        assert_eq!(second_result.unwrap().downloaded, 4);

        let regions = tiles.get_cached_regions().await.unwrap();
        assert!(regions.contains(&"second".to_string()));
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_cancel_after_finish_returns_false() {
        let (_store, tiles) = service(Duration::ZERO);
        let handle = tiles.start_download(&world(), &[0], "tiny").unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while handle.is_downloading() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(!handle.cancel());
        assert!(handle.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_start_download_validates_input() {
        let (_store, tiles) = service(Duration::ZERO);

        let result = tiles.start_download(&world(), &[1], "");
        assert!(matches!(result, Err(DownloadError::InvalidRegion(_))));

        let result = tiles.start_download(&world(), &[40], "world");
        assert!(matches!(result, Err(DownloadError::InvalidBounds(_))));
    }

    #[tokio::test]
    async fn test_start_download_rejects_oversized_area() {
        let (store, tiles) = service(Duration::ZERO);

        let result = tiles.start_download(&world(), &[20], "world");
        assert!(matches!(result, Err(DownloadError::TooManyTiles { .. })));

        let options = tiles.options().clone().with_max_tiles(3);
        let result = tiles.start_download_with(&world(), &[1], "world", options);
        assert!(matches!(
            result,
            Err(DownloadError::TooManyTiles { count: 4, limit: 3 })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_inline_download_region() {
        let (_store, tiles) = service(Duration::ZERO);

        let summary = tiles
            .download_region(&world(), &[0, 1], "world", &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(tiles.get_cached_tile("0/0/0").await.unwrap(), Some(b"0/0/0".to_vec()));
    }

    #[tokio::test]
    async fn test_cache_operations() {
        let (_store, tiles) = service(Duration::ZERO);

        tiles.cache_tile("3/1/2", vec![1, 2], Some("B")).await.unwrap();
        tiles.cache_tile("3/1/3", vec![3], Some("A")).await.unwrap();
        tiles.cache_tile("3/1/4", vec![4], None).await.unwrap();

        assert_eq!(tiles.get_cached_regions().await.unwrap(), vec!["A", "B"]);
        assert_eq!(tiles.get_storage_usage().await.used, 4);

        assert_eq!(tiles.clear_region_tiles("A").await.unwrap(), 1);
        assert!(tiles.get_cached_tile("3/1/3").await.unwrap().is_none());
        assert_eq!(tiles.get_cached_tile("3/1/2").await.unwrap(), Some(vec![1, 2]));

        assert_eq!(tiles.clear_all_tiles().await.unwrap(), 2);
        assert!(tiles.get_cached_regions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cache_tile_validates_input() {
        let (_store, tiles) = service(Duration::ZERO);

        assert!(matches!(
            tiles.cache_tile("", vec![1], None).await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            tiles.cache_tile("1/0/0", vec![1], Some("  ")).await,
            Err(StoreError::InvalidRegion(_))
        ));
    }
}
