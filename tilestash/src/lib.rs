//! TileStash - offline map tile download and cache
//!
//! This library computes the slippy-map tiles covering a geographic area,
//! downloads them from a tile server in paced, bounded batches, and keeps
//! them in a persistent store grouped by region label.
//!
//! # Modules
//!
//! - [`coord`]: bounding box to tile coordinate mapping
//! - [`cache`]: tile store trait with disk and memory providers
//! - [`provider`]: tile sources (HTTP with URL templates)
//! - [`download`]: batched downloader with retry, pacing and cancellation
//! - [`service`]: caller-facing facade with per-job handles
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing subscriber setup

pub mod cache;
pub mod config;
pub mod coord;
pub mod download;
pub mod logging;
pub mod provider;
pub mod service;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
