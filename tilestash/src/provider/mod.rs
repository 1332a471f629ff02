//! Remote tile sources
//!
//! This module provides the [`TileSource`] trait the downloader fetches
//! through, and an HTTP implementation driven by a URL template.
//!
//! ```ignore
//! use tilestash::provider::{HttpTileSource, ReqwestClient, TileUrlTemplate};
//!
//! let template = TileUrlTemplate::new("https://{s}.tile.example.org/{z}/{x}/{y}.png")?;
//! let source = HttpTileSource::new(ReqwestClient::new()?, template);
//! ```

mod http;
mod source;
mod template;
mod types;

pub use http::{AsyncHttpClient, ReqwestClient, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use source::HttpTileSource;
pub use template::{TemplateError, TileUrlTemplate};
pub use types::{FetchError, TileSource};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
