//! End-to-end tests for region downloads into an on-disk cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tilestash::cache::{DiskStoreConfig, DiskTileStore, TileStore};
use tilestash::coord::{count_tiles, BoundingBox, TileCoord};
use tilestash::download::{DownloadOptions, DownloadStatus};
use tilestash::provider::{FetchError, TileSource};
use tilestash::service::OfflineTiles;

/// Serves the tile key as its payload.
#[derive(Default)]
struct KeySource {
    calls: AtomicUsize,
}

impl TileSource for KeySource {
    async fn fetch(&self, tile: &TileCoord) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(tile.cache_key().into_bytes())
    }

    fn name(&self) -> &str {
        "key-source"
    }
}

fn aachen() -> BoundingBox {
    BoundingBox::new(50.811, 50.7492, 6.1649, 6.031)
}

fn options() -> DownloadOptions {
    DownloadOptions::new()
        .with_batch_delay(Duration::ZERO)
        .with_backoff_unit(Duration::from_millis(1))
}

async fn open_tiles(dir: &TempDir, source: Arc<KeySource>) -> OfflineTiles<KeySource> {
    let store = DiskTileStore::open(DiskStoreConfig::new(dir.path()))
        .await
        .unwrap();
    OfflineTiles::new(Arc::new(store), source).with_options(options())
}

#[tokio::test]
async fn test_background_download_fills_disk_cache() {
    let temp = TempDir::new().unwrap();
    let source = Arc::new(KeySource::default());
    let tiles = open_tiles(&temp, Arc::clone(&source)).await;
    let expected = count_tiles(&aachen(), &[12, 13]).unwrap() as usize;

    let handle = tiles.start_download(&aachen(), &[12, 13], "aachen").unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.total, expected);
    assert_eq!(summary.downloaded, expected);
    assert_eq!(source.calls.load(Ordering::SeqCst), expected);

    let tile = TileCoord::new(13, 4234, 2749);
    let bytes = tiles.get_cached_tile(&tile.cache_key()).await.unwrap();
    assert_eq!(bytes, Some(tile.cache_key().into_bytes()));
    assert_eq!(tiles.get_cached_regions().await.unwrap(), vec!["aachen"]);
    assert!(tiles.get_storage_usage().await.used > 0);
}

#[tokio::test]
async fn test_progress_reaches_completed() {
    let temp = TempDir::new().unwrap();
    let tiles = open_tiles(&temp, Arc::new(KeySource::default())).await;

    let handle = tiles.start_download(&aachen(), &[14], "aachen").unwrap();
    let progress = handle.subscribe();
    handle.wait().await.unwrap();

    let last = *progress.borrow();
    assert_eq!(last.status, DownloadStatus::Completed);
    assert_eq!(last.percentage, 100);
    assert_eq!(last.downloaded, last.total);
}

#[tokio::test]
async fn test_cache_survives_reopen_and_skips_refetch() {
    let temp = TempDir::new().unwrap();
    let first = Arc::new(KeySource::default());
    let tiles = open_tiles(&temp, Arc::clone(&first)).await;
    tiles
        .start_download(&aachen(), &[12], "aachen")
        .unwrap()
        .wait()
        .await
        .unwrap();
    drop(tiles);

    let second = Arc::new(KeySource::default());
    let tiles = open_tiles(&temp, Arc::clone(&second))
        .await
        .with_options(options().with_skip_cached(true));
    let summary = tiles
        .start_download(&aachen(), &[12], "aachen")
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    assert_eq!(summary.skipped, summary.total);
}

#[tokio::test]
async fn test_clear_region_leaves_other_regions() {
    let temp = TempDir::new().unwrap();
    let tiles = open_tiles(&temp, Arc::new(KeySource::default())).await;

    tiles
        .download_region(&aachen(), &[12], "aachen", &Default::default(), None)
        .await
        .unwrap();
    tiles
        .cache_tile("3/4/2", b"manual".to_vec(), Some("europe"))
        .await
        .unwrap();

    let removed = tiles.clear_region_tiles("aachen").await.unwrap();

    assert_eq!(removed, count_tiles(&aachen(), &[12]).unwrap() as usize);
    assert_eq!(tiles.get_cached_regions().await.unwrap(), vec!["europe"]);
    assert_eq!(
        tiles.store().get("3/4/2").await.unwrap(),
        Some(b"manual".to_vec())
    );

    assert_eq!(tiles.clear_all_tiles().await.unwrap(), 1);
    assert!(tiles.get_cached_regions().await.unwrap().is_empty());
}
