//! Configuration file support.
//!
//! Settings are read from `config.ini` in the platform config directory
//! (`~/.config/tilestash/config.ini` on Linux):
//!
//! ```ini
//! [source]
//! url = https://{s}.tile.example.org/{z}/{x}/{y}.png
//! timeout_secs = 30
//!
//! [download]
//! max_concurrent = 5
//! retry_count = 3
//! batch_delay_ms = 100
//! backoff_ms = 100
//! skip_cached = false
//! max_tiles = 100000
//!
//! [cache]
//! directory = ~/.cache/tilestash/tiles
//! quota = 2GB
//! ```

mod file;
mod parser;
mod size;

pub use file::{
    config_directory, config_file_path, default_cache_directory, CacheSettings, ConfigFile,
    ConfigFileError, DownloadSettings, SourceSettings, DEFAULT_SOURCE_URL,
};
pub use size::{parse_size, SizeParseError};
