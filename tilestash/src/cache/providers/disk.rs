//! On-disk tile store.
//!
//! Each entry is one file holding a bincode-encoded record of key, region
//! tag, timestamp and tile bytes. Region-scoped operations scan the
//! directory tree on the blocking pool.
//!
//! # File Layout
//!
//! ```text
//! {directory}/{h[0..2]}/{h}.tile
//! ```
//!
//! where `h` is the lowercase SHA-256 hex digest of the key. The digest is
//! stable across builds and platforms, so a store written by one binary can
//! be read by another.
//!
//! # Atomic Writes
//!
//! Records are written to a uniquely named temp file in the same directory
//! and renamed into place. Concurrent writers of the same key race
//! last-write-wins; readers never observe a partially written record.

use std::collections::BTreeSet;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cache::config::DiskStoreConfig;
use crate::cache::traits::{validate_key, validate_region_tag, BoxFuture, StoreError, TileStore};
use crate::cache::types::{CachedTile, StorageUsage};

/// Extension for committed records.
const RECORD_EXTENSION: &str = "tile";

/// Extension for in-progress writes.
const TEMP_EXTENSION: &str = "tmp";

/// Upper bound on an encoded record header; larger length prefixes are
/// treated as corruption instead of being allocated.
const MAX_HEADER_BYTES: u64 = 64 * 1024;

/// On-disk record format.
///
/// `key` and `region` lead so scans can decode [`RecordHeader`] alone.
#[derive(Debug, Serialize, Deserialize)]
struct TileRecord {
    key: String,
    region: Option<String>,
    stored_at_ms: i64,
    bytes: Vec<u8>,
}

/// Leading fields of a [`TileRecord`].
#[derive(Debug, Deserialize)]
struct RecordHeader {
    #[allow(dead_code)]
    key: String,
    region: Option<String>,
}

impl TileRecord {
    fn into_cached_tile(self) -> CachedTile {
        CachedTile {
            key: self.key,
            bytes: self.bytes,
            stored_at: DateTime::from_timestamp_millis(self.stored_at_ms).unwrap_or_default(),
            region: self.region,
        }
    }
}

/// On-disk tile store.
#[derive(Debug)]
pub struct DiskTileStore {
    /// Root directory for records.
    directory: PathBuf,

    /// Reported quota in bytes.
    max_size_bytes: u64,

    /// Source of unique temp file suffixes.
    write_seq: AtomicU64,
}

impl DiskTileStore {
    /// Open a disk store, creating its directory if needed.
    pub async fn open(config: DiskStoreConfig) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&config.directory).await?;

        info!(
            dir = %config.directory.display(),
            max_bytes = config.max_size_bytes,
            "Disk tile store opened"
        );

        Ok(Self {
            directory: config.directory,
            max_size_bytes: config.max_size_bytes,
            write_seq: AtomicU64::new(0),
        })
    }

    /// Root directory of this store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Hex digest naming the record file for a key.
    fn key_digest(key: &str) -> String {
        let digest = Sha256::digest(key.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Get the record path for a cache key.
    fn key_path(&self, key: &str) -> PathBuf {
        let digest = Self::key_digest(key);
        self.directory
            .join(&digest[..2])
            .join(format!("{}.{}", digest, RECORD_EXTENSION))
    }

    /// Unique temp path next to `path`.
    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!(
            "{}.{}.{}",
            std::process::id(),
            seq,
            TEMP_EXTENSION
        ))
    }

    fn decode(key: &str, data: &[u8]) -> Result<TileRecord, StoreError> {
        bincode::deserialize(data).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    async fn read_record(&self, key: &str) -> Result<Option<TileRecord>, StoreError> {
        let path = self.key_path(key);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let record = Self::decode(key, &data)?;
        if record.key != key {
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: format!("record belongs to key '{}'", record.key),
            });
        }
        Ok(Some(record))
    }

    /// Run a blocking scan over the store directory.
    async fn scan<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
    {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || f(&directory))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Collect all committed record files with their sizes.
    ///
    /// Shards or records that vanish mid-scan are skipped; any other read
    /// failure is returned.
    fn collect_records(dir: &Path) -> io::Result<Vec<(PathBuf, u64)>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                Self::collect_records_in(&entry.path(), &mut files)?;
            }
        }
        Ok(files)
    }

    fn collect_records_in(dir: &Path, files: &mut Vec<(PathBuf, u64)>) -> io::Result<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let is_record = path
                .extension()
                .is_some_and(|ext| ext == RECORD_EXTENSION);
            if !is_record {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) => files.push((path, metadata.len())),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Read the region tag of a record file without loading its payload.
    ///
    /// Returns `Ok(None)` for a record that vanished or cannot be decoded.
    fn read_region(path: &Path) -> Result<Option<Option<String>>, StoreError> {
        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let options = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(MAX_HEADER_BYTES);
        match options.deserialize_from::<_, RecordHeader>(BufReader::new(file)) {
            Ok(header) => Ok(Some(header.region)),
            Err(e) => match *e {
                bincode::ErrorKind::Io(err) if err.kind() != io::ErrorKind::UnexpectedEof => {
                    Err(StoreError::Io(err))
                }
                other => {
                    warn!(path = %path.display(), error = %other, "Skipping corrupt record");
                    Ok(None)
                }
            },
        }
    }

    fn remove_record(path: &Path) -> Result<bool, StoreError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Remove empty shard directories after deletions.
    fn cleanup_empty_dirs(dir: &Path) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                // Fails silently if the directory is not empty
                let _ = std::fs::remove_dir(&path);
            }
        }
    }

    fn clear_region_blocking(dir: &Path, region: &str) -> Result<usize, StoreError> {
        let mut removed = 0;
        for (path, _) in Self::collect_records(dir)? {
            if Self::read_region(&path)?.flatten().as_deref() == Some(region)
                && Self::remove_record(&path)?
            {
                removed += 1;
            }
        }
        Self::cleanup_empty_dirs(dir);
        Ok(removed)
    }

    fn clear_all_blocking(dir: &Path) -> Result<usize, StoreError> {
        let mut removed = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            let mut files = Vec::new();
            Self::collect_records_in(&path, &mut files)?;
            for (file, _) in files {
                if Self::remove_record(&file)? {
                    removed += 1;
                }
            }
            // Drop the shard along with any abandoned temp files
            std::fs::remove_dir_all(&path).or_else(|e| match e.kind() {
                io::ErrorKind::NotFound => Ok(()),
                _ => Err(e),
            })?;
        }
        Ok(removed)
    }

    fn list_regions_blocking(dir: &Path) -> Result<BTreeSet<String>, StoreError> {
        let mut regions = BTreeSet::new();
        for (path, _) in Self::collect_records(dir)? {
            if let Some(region) = Self::read_region(&path)?.flatten() {
                regions.insert(region);
            }
        }
        Ok(regions)
    }

    /// Write `data` to `temp_path` and rename it over `path`.
    ///
    /// The temp file is removed on any failure, including a partial write.
    async fn commit(temp_path: &Path, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let result = match tokio::fs::write(temp_path, data).await {
            Ok(()) => tokio::fs::rename(temp_path, path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(temp_path).await;
            return Err(StoreError::Io(e));
        }
        Ok(())
    }
}

impl TileStore for DiskTileStore {
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.read_record(&key).await?.map(|record| record.bytes)) })
    }

    fn get_entry(&self, key: &str) -> BoxFuture<'_, Result<Option<CachedTile>, StoreError>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .read_record(&key)
                .await?
                .map(TileRecord::into_cached_tile))
        })
    }

    fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        region: Option<&str>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = key.to_string();
        let region = region.map(str::to_string);
        Box::pin(async move {
            validate_key(&key)?;
            validate_region_tag(region.as_deref())?;

            // An untagged write keeps the existing tag
            let region = match region {
                Some(region) => Some(region),
                None => match self.read_record(&key).await {
                    Ok(existing) => existing.and_then(|record| record.region),
                    Err(StoreError::Corrupt { .. }) => None,
                    Err(e) => return Err(e),
                },
            };

            let record = TileRecord {
                key: key.clone(),
                region,
                stored_at_ms: Utc::now().timestamp_millis(),
                bytes,
            };
            let data = bincode::serialize(&record).map_err(|e| StoreError::Corrupt {
                key: key.clone(),
                reason: e.to_string(),
            })?;

            let path = self.key_path(&key);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let temp_path = self.temp_path(&path);
            Self::commit(&temp_path, &path, &data).await?;

            debug!(tile = %key, bytes = data.len(), "Stored tile record");
            Ok(())
        })
    }

    fn clear_region(&self, region: &str) -> BoxFuture<'_, Result<usize, StoreError>> {
        let region = region.to_string();
        Box::pin(async move {
            let label = region.clone();
            let removed = self
                .scan(move |dir| Self::clear_region_blocking(dir, &label))
                .await?;
            info!(region = %region, removed, "Cleared region from disk store");
            Ok(removed)
        })
    }

    fn clear_all(&self) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move {
            let removed = self.scan(Self::clear_all_blocking).await?;
            info!(removed, "Cleared disk store");
            Ok(removed)
        })
    }

    fn list_regions(&self) -> BoxFuture<'_, Result<BTreeSet<String>, StoreError>> {
        Box::pin(async move { self.scan(Self::list_regions_blocking).await })
    }

    fn usage_estimate(&self) -> BoxFuture<'_, StorageUsage> {
        Box::pin(async move {
            let used = self
                .scan(|dir| {
                    Ok(Self::collect_records(dir)?
                        .iter()
                        .map(|(_, size)| size)
                        .sum::<u64>())
                })
                .await;

            match used {
                Ok(used) => StorageUsage {
                    used,
                    quota: self.max_size_bytes,
                },
                Err(e) => {
                    warn!(error = %e, "Disk store cannot report usage");
                    StorageUsage::default()
                }
            }
        })
    }
}
