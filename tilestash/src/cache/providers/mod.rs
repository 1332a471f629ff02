//! Tile store provider implementations.
//!
//! # Available Providers
//!
//! - [`DiskTileStore`]: One record file per key, durable across restarts
//! - [`MemoryTileStore`]: DashMap-backed, for tests and embedding

mod disk;
mod memory;

pub use disk::DiskTileStore;
pub use memory::MemoryTileStore;
