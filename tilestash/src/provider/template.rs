//! Tile URL templates.
//!
//! A template is a URL with `{z}`, `{x}` and `{y}` placeholders and an
//! optional `{s}` subdomain placeholder:
//!
//! ```text
//! https://{s}.tile.example.org/{z}/{x}/{y}.png
//! ```

use thiserror::Error;

use crate::coord::TileCoord;

/// Subdomains rotated through `{s}` when none are configured.
const DEFAULT_SUBDOMAINS: [&str; 3] = ["a", "b", "c"];

/// Errors from parsing a URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A required placeholder is absent.
    #[error("URL template '{template}' is missing the {placeholder} placeholder")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },

    /// `{s}` is used but no subdomains were provided.
    #[error("URL template '{0}' uses {{s}} but no subdomains are configured")]
    NoSubdomains(String),
}

/// A tile URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl TileUrlTemplate {
    /// Parses a template, using `a`, `b`, `c` for `{s}`.
    pub fn new(template: impl Into<String>) -> Result<Self, TemplateError> {
        Self::with_subdomains(
            template,
            DEFAULT_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Parses a template with an explicit subdomain list.
    pub fn with_subdomains(
        template: impl Into<String>,
        subdomains: Vec<String>,
    ) -> Result<Self, TemplateError> {
        let template = template.into();
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !template.contains(placeholder) {
                return Err(TemplateError::MissingPlaceholder {
                    template,
                    placeholder,
                });
            }
        }
        if template.contains("{s}") && subdomains.is_empty() {
            return Err(TemplateError::NoSubdomains(template));
        }
        Ok(Self {
            template,
            subdomains,
        })
    }

    /// Builds the conventional `{server}/{z}/{x}/{y}.{ext}` template.
    pub fn from_server(server: &str, ext: &str) -> Self {
        Self {
            template: format!(
                "{}/{{z}}/{{x}}/{{y}}.{}",
                server.trim_end_matches('/'),
                ext.trim_start_matches('.')
            ),
            subdomains: Vec::new(),
        }
    }

    /// The raw template string.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Renders the URL for a tile.
    ///
    /// The subdomain is picked by `(x + y) % len`, so neighbouring tiles
    /// spread across hosts and a given tile always maps to the same host.
    pub fn render(&self, tile: &TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string());

        if !self.subdomains.is_empty() {
            let index = (tile.x as u64 + tile.y as u64) % self.subdomains.len() as u64;
            url = url.replace("{s}", &self.subdomains[index as usize]);
        }
        url
    }
}
