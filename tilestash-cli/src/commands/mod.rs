//! CLI command handlers.

pub mod cache;
pub mod common;
pub mod download;
pub mod tiles;
