//! Configuration file handling for `config.ini`.
//!
//! Loads user configuration with sensible defaults. A missing file is not
//! an error; every key is optional.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::cache::{DiskStoreConfig, DEFAULT_DISK_QUOTA};
use crate::download::{
    DownloadOptions, DEFAULT_BACKOFF_MS, DEFAULT_BATCH_DELAY_MS, DEFAULT_MAX_CONCURRENT,
    DEFAULT_MAX_TILES, DEFAULT_RETRY_COUNT,
};
use crate::provider::{TileUrlTemplate, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

/// Tile server used when none is configured.
pub const DEFAULT_SOURCE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[source]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// URL template with `{z}`, `{x}`, `{y}` and optional `{s}`.
    pub url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// `[download]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub max_concurrent: usize,
    pub retry_count: u32,
    pub batch_delay_ms: u64,
    pub backoff_ms: u64,
    pub skip_cached: bool,
    pub max_tiles: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            retry_count: DEFAULT_RETRY_COUNT,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            skip_cached: false,
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

/// `[cache]` settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Tile store directory.
    pub directory: PathBuf,
    /// Reported quota in bytes.
    pub quota: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            quota: DEFAULT_DISK_QUOTA,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub download: DownloadSettings,
    pub cache: CacheSettings,
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| ConfigFileError::ReadError(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&ini)
    }

    /// Download options from the `[download]` and `[source]` sections.
    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions::new()
            .with_max_concurrent(self.download.max_concurrent)
            .with_retry_count(self.download.retry_count)
            .with_batch_delay(std::time::Duration::from_millis(self.download.batch_delay_ms))
            .with_backoff_unit(std::time::Duration::from_millis(self.download.backoff_ms))
            .with_fetch_timeout(std::time::Duration::from_secs(self.source.timeout_secs))
            .with_skip_cached(self.download.skip_cached)
            .with_max_tiles(self.download.max_tiles)
    }

    /// Disk store configuration from the `[cache]` section.
    pub fn disk_store_config(&self) -> DiskStoreConfig {
        DiskStoreConfig::new(self.cache.directory.clone()).with_max_size(self.cache.quota)
    }

    /// URL template from the `[source]` section.
    pub fn url_template(&self) -> Result<TileUrlTemplate, ConfigFileError> {
        TileUrlTemplate::new(self.source.url.clone()).map_err(|e| ConfigFileError::InvalidValue {
            section: "source".to_string(),
            key: "url".to_string(),
            value: self.source.url.clone(),
            reason: e.to_string(),
        })
    }
}

/// Get the path to the config directory.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestash")
}

/// Get the path to the config file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Get the default tile store directory.
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestash")
        .join("tiles")
}
