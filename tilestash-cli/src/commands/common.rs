//! Arguments shared by several commands.

use clap::Args;
use tilestash::coord::{BoundingBox, MAX_ZOOM};

/// Zoom levels given as a comma-separated list with optional ranges,
/// e.g. `10,12-14`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomLevels(pub Vec<u8>);

/// Parse a zoom level list such as `10,12-14`.
pub fn parse_zoom_levels(input: &str) -> Result<ZoomLevels, String> {
    let mut levels = Vec::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_zoom(start)?, parse_zoom(end)?),
            None => {
                let zoom = parse_zoom(part)?;
                (zoom, zoom)
            }
        };
        if start > end {
            return Err(format!("zoom range '{}' is reversed", part));
        }
        levels.extend(start..=end);
    }

    if levels.is_empty() {
        return Err("at least one zoom level is required".to_string());
    }
    Ok(ZoomLevels(levels))
}

fn parse_zoom(value: &str) -> Result<u8, String> {
    let zoom: u8 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a zoom level", value.trim()))?;
    if zoom > MAX_ZOOM {
        return Err(format!("zoom {} exceeds the maximum of {}", zoom, MAX_ZOOM));
    }
    Ok(zoom)
}

/// Bounding box and zoom selection.
#[derive(Debug, Clone, Args)]
pub struct AreaArgs {
    /// Northern edge latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub north: f64,

    /// Southern edge latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub south: f64,

    /// Eastern edge longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub east: f64,

    /// Western edge longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub west: f64,

    /// Zoom levels, e.g. "12,13,14" or "12-14"
    #[arg(long, value_parser = parse_zoom_levels)]
    pub zoom: ZoomLevels,
}

impl AreaArgs {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.north, self.south, self.east, self.west)
    }

    pub fn zoom_levels(&self) -> &[u8] {
        &self.zoom.0
    }
}
