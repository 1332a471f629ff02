//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels accepted by the mapper
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Tile coordinates in the Web Mercator / slippy map scheme.
///
/// `x` grows eastward from the antimeridian and `y` grows southward from the
/// northern Mercator limit. At zoom `z` both range over `0..2^z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level
    pub zoom: u8,
    /// X coordinate (west-east), 0 at the antimeridian
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate.
    #[inline]
    pub const fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Returns the cache key for this tile, formatted as `"{zoom}/{x}/{y}"`.
    #[inline]
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileCoord {
    type Err = CoordError;

    /// Parses a `"{zoom}/{x}/{y}"` cache key back into a coordinate.
    ///
    /// The indices must lie inside the grid for the parsed zoom level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordError::InvalidKey(s.to_string());

        let mut parts = s.split('/');
        let (Some(zoom), Some(x), Some(y), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let zoom: u8 = zoom.parse().map_err(|_| invalid())?;
        let x: u32 = x.parse().map_err(|_| invalid())?;
        let y: u32 = y.parse().map_err(|_| invalid())?;

        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = 1u64 << zoom;
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(invalid());
        }

        Ok(Self { zoom, x, y })
    }
}

/// A geographic rectangle in decimal degrees.
///
/// The corners do not need to be ordered: `north` may be smaller than
/// `south` and `west` larger than `east`. The mapper takes min/max per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its four edges.
    pub const fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// North-west corner as `(lat, lon)`.
    #[inline]
    pub fn north_west(&self) -> (f64, f64) {
        (self.north, self.west)
    }

    /// South-east corner as `(lat, lon)`.
    #[inline]
    pub fn south_east(&self) -> (f64, f64) {
        (self.south, self.east)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N{} S{} E{} W{}",
            self.north, self.south, self.east, self.west
        )
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is not a finite number
    #[error("Invalid latitude: {0} (must be a finite number of degrees)")]
    InvalidLatitude(f64),

    /// Longitude is outside valid range (-180.0 to 180.0)
    #[error("Invalid longitude: {0} (must be between {} and {})", MIN_LON, MAX_LON)]
    InvalidLongitude(f64),

    /// Zoom level is outside valid range
    #[error("Invalid zoom level: {0} (must be between {} and {})", MIN_ZOOM, MAX_ZOOM)]
    InvalidZoom(u8),

    /// Cache key is not of the form `zoom/x/y`
    #[error("Invalid tile key: '{0}' (expected 'zoom/x/y')")]
    InvalidKey(String),
}
