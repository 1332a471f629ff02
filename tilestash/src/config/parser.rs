//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::{ConfigFile, ConfigFileError};
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = non_empty(section, "url") {
            config.source.url = v.to_string();
        }
        if let Some(v) = parse_number::<u64>(section, "source", "timeout_secs")? {
            if v == 0 {
                return Err(invalid("source", "timeout_secs", "0", "must be at least 1"));
            }
            config.source.timeout_secs = v;
        }
        if let Some(v) = non_empty(section, "user_agent") {
            config.source.user_agent = v.to_string();
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = parse_number::<usize>(section, "download", "max_concurrent")? {
            if v == 0 {
                return Err(invalid("download", "max_concurrent", "0", "must be at least 1"));
            }
            config.download.max_concurrent = v;
        }
        if let Some(v) = parse_number::<u32>(section, "download", "retry_count")? {
            if v == 0 {
                return Err(invalid("download", "retry_count", "0", "must be at least 1"));
            }
            config.download.retry_count = v;
        }
        if let Some(v) = parse_number(section, "download", "batch_delay_ms")? {
            config.download.batch_delay_ms = v;
        }
        if let Some(v) = parse_number(section, "download", "backoff_ms")? {
            config.download.backoff_ms = v;
        }
        if let Some(v) = parse_number::<u64>(section, "download", "max_tiles")? {
            if v == 0 {
                return Err(invalid("download", "max_tiles", "0", "must be at least 1"));
            }
            config.download.max_tiles = v;
        }
        if let Some(v) = non_empty(section, "skip_cached") {
            config.download.skip_cached = parse_bool(v)
                .ok_or_else(|| invalid("download", "skip_cached", v, "must be true or false"))?;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section, "directory") {
            config.cache.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "quota") {
            config.cache.quota =
                parse_size(v).map_err(|e| invalid("cache", "quota", v, &e.to_string()))?;
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError> {
    non_empty(section, key)
        .map(|v| {
            v.parse()
                .map_err(|_| invalid(section_name, key, v, "must be a non-negative integer"))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
