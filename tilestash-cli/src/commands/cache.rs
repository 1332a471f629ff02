//! Cache management CLI commands.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Subcommand;
use tilestash::cache::{format_size, TileStore};
use tilestash::coord::TileCoord;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show or export a cached tile by its "zoom/x/y" key
    Get {
        key: String,
        /// Write the tile bytes to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List region labels present in the cache
    Regions,
    /// Remove every tile cached under a region label
    ClearRegion { region: String },
    /// Remove every cached tile
    Clear,
    /// Show cache storage usage
    Usage,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("cache");
    let cache_dir = runner.config().cache.directory.clone();

    runner.runtime().block_on(async {
        let store = runner.open_store().await?;

        match action {
            CacheAction::Get { key, output } => {
                let tile =
                    TileCoord::from_str(&key).map_err(|e| CliError::InvalidArgs(e.to_string()))?;
                let Some(entry) = store.get_entry(&tile.cache_key()).await? else {
                    println!("Tile {} is not cached", tile);
                    return Ok(());
                };

                match output {
                    Some(path) => {
                        std::fs::write(&path, &entry.bytes).map_err(|error| {
                            CliError::FileWrite {
                                path: path.display().to_string(),
                                error,
                            }
                        })?;
                        println!("Wrote {} ({}) to {}", tile, format_size(entry.size()), path.display());
                    }
                    None => {
                        println!("Tile:   {}", tile);
                        println!("Size:   {}", format_size(entry.size()));
                        println!("Region: {}", entry.region.as_deref().unwrap_or("-"));
                        println!("Stored: {}", entry.stored_at.to_rfc3339());
                    }
                }
                Ok(())
            }
            CacheAction::Regions => {
                let regions = store.list_regions().await?;
                if regions.is_empty() {
                    println!("No regions cached in {}", cache_dir.display());
                }
                for region in regions {
                    println!("{}", region);
                }
                Ok(())
            }
            CacheAction::ClearRegion { region } => {
                let removed = store.clear_region(&region).await?;
                println!("Removed {} tiles from region '{}'", removed, region);
                Ok(())
            }
            CacheAction::Clear => {
                println!("Clearing tile cache at: {}", cache_dir.display());
                let removed = store.clear_all().await?;
                println!("Removed {} tiles", removed);
                Ok(())
            }
            CacheAction::Usage => {
                println!("Tile cache: {}", cache_dir.display());
                let usage = store.usage_estimate().await;
                println!("  {}", usage);
                if let Some(ratio) = usage.ratio() {
                    println!("  {:.1}% of quota", ratio * 100.0);
                }
                Ok(())
            }
        }
    })
}
