//! Tiles command - list the tiles covering an area without fetching.

use clap::Args;
use tilestash::coord::{count_tiles, iter_tiles};

use super::common::AreaArgs;
use crate::error::CliError;

/// Arguments for the tiles command.
#[derive(Debug, Args)]
pub struct TilesArgs {
    #[command(flatten)]
    pub area: AreaArgs,

    /// Print only the tile count
    #[arg(long)]
    pub count: bool,
}

/// Run the tiles command.
pub fn run(args: TilesArgs) -> Result<(), CliError> {
    let bounds = args.area.bounds();
    let zooms = args.area.zoom_levels();
    let invalid = |e: tilestash::coord::CoordError| CliError::InvalidArgs(e.to_string());

    let count = count_tiles(&bounds, zooms).map_err(invalid)?;
    if args.count {
        println!("{}", count);
        return Ok(());
    }

    // Streamed so large areas never build the full list
    for tile in iter_tiles(&bounds, zooms).map_err(invalid)? {
        println!("{}", tile);
    }
    println!("{} tiles", count);
    Ok(())
}
