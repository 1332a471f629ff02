//! CLI runner for common setup.
//!
//! Loads configuration, initializes logging and builds the Tokio runtime
//! shared by the command handlers.

use std::path::Path;

use tilestash::cache::DiskTileStore;
use tilestash::config::ConfigFile;
use tilestash::logging::{default_log_dir, init_logging, LoggingGuard, DEFAULT_LOG_FILE};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
    runtime: Runtime,
}

impl CliRunner {
    /// Load configuration and initialize logging.
    ///
    /// Without `verbose` only warnings reach the terminal so the progress
    /// bar stays readable; `RUST_LOG` overrides either level.
    pub fn new(config_path: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let level = if verbose { "debug" } else { "warn" };
        let logging_guard = init_logging(&default_log_dir(), DEFAULT_LOG_FILE, level)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::Runtime(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
            runtime,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Get the Tokio runtime.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("TileStash v{}", tilestash::VERSION);
        info!("TileStash CLI: {} command", command);
    }

    /// Open the configured disk tile store.
    pub async fn open_store(&self) -> Result<DiskTileStore, CliError> {
        Ok(DiskTileStore::open(self.config.disk_store_config()).await?)
    }
}
