//! Cache entry and usage types.

use std::fmt;

use chrono::{DateTime, Utc};

/// A persisted tile entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTile {
    /// Cache key, normally `"{zoom}/{x}/{y}"`.
    pub key: String,
    /// Raw tile bytes as returned by the tile server.
    pub bytes: Vec<u8>,
    /// When this entry was last written.
    pub stored_at: DateTime<Utc>,
    /// Region label used for grouped eviction.
    pub region: Option<String>,
}

impl CachedTile {
    /// Creates an entry stamped with the current time.
    pub fn new(key: impl Into<String>, bytes: Vec<u8>, region: Option<String>) -> Self {
        Self {
            key: key.into(),
            bytes,
            stored_at: Utc::now(),
            region,
        }
    }

    /// Applies upsert semantics: replaces bytes and timestamp, and replaces
    /// the region only when the new write carries one.
    pub(crate) fn overwrite(&mut self, bytes: Vec<u8>, region: Option<String>) {
        self.bytes = bytes;
        self.stored_at = Utc::now();
        if region.is_some() {
            self.region = region;
        }
    }

    /// Size of the tile payload in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Storage usage reported by a store.
///
/// `{0, 0}` means the substrate could not report usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    /// Bytes currently used.
    pub used: u64,
    /// Bytes available in total, or 0 when unknown/unbounded.
    pub quota: u64,
}

impl StorageUsage {
    /// Fraction of the quota in use, if a quota is known.
    pub fn ratio(&self) -> Option<f64> {
        (self.quota > 0).then(|| self.used as f64 / self.quota as f64)
    }
}

impl fmt::Display for StorageUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quota == 0 {
            write!(f, "{} used", format_size(self.used))
        } else {
            write!(
                f,
                "{} of {} used",
                format_size(self.used),
                format_size(self.quota)
            )
        }
    }
}

/// Formats a byte count using binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_keeps_region_when_absent() {
        let mut tile = CachedTile::new("1/0/0", vec![1], Some("alps".to_string()));
        tile.overwrite(vec![2, 3], None);
        assert_eq!(tile.bytes, vec![2, 3]);
        assert_eq!(tile.region.as_deref(), Some("alps"));

        tile.overwrite(vec![4], Some("dolomites".to_string()));
        assert_eq!(tile.region.as_deref(), Some("dolomites"));
    }

    #[test]
    fn test_usage_ratio() {
        assert_eq!(StorageUsage::default().ratio(), None);
        let usage = StorageUsage {
            used: 50,
            quota: 200,
        };
        assert_eq!(usage.ratio(), Some(0.25));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2.0 GB");
    }

    #[test]
    fn test_usage_display() {
        let usage = StorageUsage {
            used: 1024,
            quota: 0,
        };
        assert_eq!(usage.to_string(), "1.0 KB used");
    }
}
