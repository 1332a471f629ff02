//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, and expands a bounding box into the
//! deterministic list of tiles that cover it.
//!
//! Everything here is pure: identical input always yields identical output,
//! with no I/O.

mod types;

pub use types::{
    BoundingBox, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to tile coordinates.
///
/// Latitude is clamped to the Web Mercator limit (±85.05112878°) and the
/// resulting indices are clamped into the grid, so `lon = 180.0` maps to the
/// easternmost column rather than one past it.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !lat.is_finite() {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !lon.is_finite() || !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = n - 1.0;

    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT) * PI / 180.0;
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    Ok(TileCoord {
        zoom,
        x: x.clamp(0.0, max_index) as u32,
        y: y.clamp(0.0, max_index) as u32,
    })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Inclusive tile rectangle covering a bounding box at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRange {
    zoom: u8,
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl TileRange {
    fn for_bounds(bounds: &BoundingBox, zoom: u8) -> Result<Self, CoordError> {
        let (north, west) = bounds.north_west();
        let (south, east) = bounds.south_east();

        let nw = to_tile_coords(north, west, zoom)?;
        let se = to_tile_coords(south, east, zoom)?;

        Ok(Self {
            zoom,
            min_x: nw.x.min(se.x),
            max_x: nw.x.max(se.x),
            min_y: nw.y.min(se.y),
            max_y: nw.y.max(se.y),
        })
    }

    fn len(&self) -> u64 {
        u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1)
    }

    fn tiles(self) -> impl Iterator<Item = TileCoord> {
        (self.min_y..=self.max_y).flat_map(move |y| {
            (self.min_x..=self.max_x).map(move |x| TileCoord::new(self.zoom, x, y))
        })
    }
}

/// Lazily yields every tile covering `bounds` at each of `zoom_levels`.
///
/// Zoom levels are processed in the order given and their tiles concatenated.
/// Within a zoom level tiles are emitted row by row, west to east.
///
/// Boxes crossing the antimeridian are not split; the two corners are
/// min/max-ordered like any other box.
pub fn iter_tiles(
    bounds: &BoundingBox,
    zoom_levels: &[u8],
) -> Result<impl Iterator<Item = TileCoord>, CoordError> {
    let ranges = zoom_levels
        .iter()
        .map(|&zoom| TileRange::for_bounds(bounds, zoom))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ranges.into_iter().flat_map(TileRange::tiles))
}

/// Computes every tile covering `bounds` at each of `zoom_levels`, in the
/// order of [`iter_tiles`].
///
/// The result is unbounded; size the job with [`count_tiles`] first when
/// the box comes from user input.
pub fn compute_tiles(
    bounds: &BoundingBox,
    zoom_levels: &[u8],
) -> Result<Vec<TileCoord>, CoordError> {
    Ok(iter_tiles(bounds, zoom_levels)?.collect())
}

/// Counts the tiles `compute_tiles` would return, without allocating them.
pub fn count_tiles(bounds: &BoundingBox, zoom_levels: &[u8]) -> Result<u64, CoordError> {
    zoom_levels.iter().try_fold(0u64, |acc, &zoom| {
        Ok(acc + TileRange::for_bounds(bounds, zoom)?.len())
    })
}
