//! TileStash CLI - Command-line interface
//!
//! Downloads map tiles for offline use and manages the local tile cache.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::download::DownloadArgs;
use commands::tiles::TilesArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Debug, Parser)]
#[command(name = "tilestash")]
#[command(version, about = "Download and manage map tiles for offline use", long_about = None)]
struct Cli {
    /// Path to config.ini (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download every tile of a region into the cache
    Download(DownloadArgs),
    /// Inspect and evict cached tiles
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// List the tiles covering an area without downloading
    Tiles(TilesArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Tiles(args) => commands::tiles::run(args),
        Commands::Download(args) => {
            let runner = CliRunner::new(cli.config.as_deref(), cli.verbose)?;
            commands::download::run(args, &runner)
        }
        Commands::Cache { action } => {
            let runner = CliRunner::new(cli.config.as_deref(), cli.verbose)?;
            commands::cache::run(action, &runner)
        }
    }
}
