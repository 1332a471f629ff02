//! HTTP-backed tile source.

use tracing::trace;

use super::http::AsyncHttpClient;
use super::template::TileUrlTemplate;
use super::types::{FetchError, TileSource};
use crate::coord::TileCoord;

/// Tile source that fetches rendered template URLs over HTTP.
///
/// # Example
///
/// ```ignore
/// use tilestash::provider::{HttpTileSource, ReqwestClient, TileUrlTemplate};
///
/// let template = TileUrlTemplate::from_server("https://tile.openstreetmap.org", "png");
/// let source = HttpTileSource::new(ReqwestClient::new()?, template);
/// ```
pub struct HttpTileSource<C: AsyncHttpClient> {
    http_client: C,
    template: TileUrlTemplate,
    name: String,
}

impl<C: AsyncHttpClient> HttpTileSource<C> {
    /// Creates a source named after the template.
    pub fn new(http_client: C, template: TileUrlTemplate) -> Self {
        let name = template.as_str().to_string();
        Self {
            http_client,
            template,
            name,
        }
    }

    /// Overrides the name used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The URL template this source renders.
    pub fn template(&self) -> &TileUrlTemplate {
        &self.template
    }
}

impl<C: AsyncHttpClient> TileSource for HttpTileSource<C> {
    async fn fetch(&self, tile: &TileCoord) -> Result<Vec<u8>, FetchError> {
        let url = self.template.render(tile);
        trace!(tile = %tile, url = %url, "Fetching tile");
        self.http_client.get(&url).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
