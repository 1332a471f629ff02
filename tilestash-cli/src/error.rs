//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilestash::cache::StoreError;
use tilestash::config::ConfigFileError;
use tilestash::download::{DownloadError, ErrorKind};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Invalid command-line input
    InvalidArgs(String),
    /// Failed to start the async runtime
    Runtime(String),
    /// Failed to set up the tile source
    Source(String),
    /// Tile store error
    Store(StoreError),
    /// Region download failed
    Download(DownloadError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Download(e) = self {
            match e.kind() {
                ErrorKind::Completion => {
                    eprintln!();
                    eprintln!("Tiles that did download are cached. To fetch only the rest:");
                    eprintln!("  rerun the same command with --skip-cached");
                }
                ErrorKind::Cancellation => {
                    eprintln!();
                    eprintln!("Tiles downloaded before cancelling remain cached.");
                }
                ErrorKind::InvalidInput if matches!(e, DownloadError::TooManyTiles { .. }) => {
                    eprintln!();
                    eprintln!("Shrink the area or drop the highest zoom levels.");
                    eprintln!("  Use 'tilestash tiles --count' to size it, or raise --max-tiles");
                }
                _ => {}
            }
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgs(msg) => write!(f, "Invalid arguments: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to start runtime: {}", msg),
            CliError::Source(msg) => write!(f, "Tile source error: {}", msg),
            CliError::Store(e) => write!(f, "Tile cache error: {}", e),
            CliError::Download(e) => write!(f, "Download failed: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Store(e) => Some(e),
            CliError::Download(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e)
    }
}

impl From<DownloadError> for CliError {
    fn from(e: DownloadError) -> Self {
        CliError::Download(e)
    }
}
