//! Download command - fetch every tile of a region into the cache.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tilestash::download::DownloadOptions;
use tilestash::provider::{HttpTileSource, ReqwestClient, TileUrlTemplate};
use tilestash::service::{DownloadHandle, OfflineTiles};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::common::AreaArgs;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the download command.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub area: AreaArgs,

    /// Region label the tiles are cached under
    #[arg(long)]
    pub region: String,

    /// Tile URL template, e.g. "https://{s}.tile.example.org/{z}/{x}/{y}.png"
    #[arg(long)]
    pub url: Option<String>,

    /// Tiles fetched concurrently per batch
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Fetch attempts per tile
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause between batches in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Skip tiles that are already cached
    #[arg(long)]
    pub skip_cached: bool,

    /// Refuse areas covering more tiles than this
    #[arg(long)]
    pub max_tiles: Option<u64>,
}

impl DownloadArgs {
    /// Overlay command-line settings on the configured options.
    fn options(&self, base: DownloadOptions) -> DownloadOptions {
        let mut options = base;
        if let Some(max_concurrent) = self.max_concurrent {
            options = options.with_max_concurrent(max_concurrent);
        }
        if let Some(retries) = self.retries {
            options = options.with_retry_count(retries);
        }
        if let Some(delay) = self.batch_delay_ms {
            options = options.with_batch_delay(Duration::from_millis(delay));
        }
        if self.skip_cached {
            options = options.with_skip_cached(true);
        }
        if let Some(max_tiles) = self.max_tiles {
            options = options.with_max_tiles(max_tiles);
        }
        options
    }
}

/// Run the download command.
pub fn run(args: DownloadArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("download");
    let config = runner.config();

    let template = match &args.url {
        Some(url) => TileUrlTemplate::new(url.clone())
            .map_err(|e| CliError::InvalidArgs(e.to_string()))?,
        None => config.url_template()?,
    };
    let client = ReqwestClient::with_options(config.source.timeout_secs, &config.source.user_agent)
        .map_err(|e| CliError::Source(e.to_string()))?;
    let source = HttpTileSource::new(client, template);
    let options = args.options(config.download_options());

    let bounds = args.area.bounds();
    println!("Downloading region '{}':", args.region);
    println!("  Bounds: {}", bounds);
    println!("  Zoom:   {:?}", args.area.zoom_levels());
    println!("  Source: {}", source.template().as_str());
    println!();

    runner.runtime().block_on(async {
        let store = runner.open_store().await?;
        let tiles = OfflineTiles::new(Arc::new(store), Arc::new(source)).with_options(options);

        let handle = tiles.start_download(&bounds, args.area.zoom_levels(), &args.region)?;
        install_interrupt_handler(handle.cancellation_token())?;

        let result = track_progress(handle).await;
        match &result {
            Ok(summary) => {
                info!(downloaded = summary.downloaded, "Region download finished");
                println!(
                    "Downloaded {} of {} tiles ({} already cached, {} failed) in {:.1}s",
                    summary.downloaded,
                    summary.total,
                    summary.skipped,
                    summary.failed,
                    summary.elapsed.as_secs_f64()
                );
            }
            Err(e) => info!(error = %e, "Region download did not finish"),
        }
        result.map(|_| ()).map_err(CliError::from)
    })
}

/// Cancel the job on Ctrl+C.
fn install_interrupt_handler(token: CancellationToken) -> Result<(), CliError> {
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received interrupt, cancelling download...");
        token.cancel();
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))
}

/// Draw a progress bar until the job finishes.
async fn track_progress(
    handle: DownloadHandle,
) -> Result<tilestash::download::DownloadSummary, tilestash::download::DownloadError> {
    let mut progress = handle.subscribe();
    let bar = ProgressBar::new(progress.borrow().total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tiles ({percent}%) {msg}",
    ) {
        bar.set_style(style.progress_chars("=> "));
    }

    let bar_updates = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let snapshot = *progress.borrow_and_update();
                bar.set_position(snapshot.downloaded as u64);
                if snapshot.failed > 0 {
                    bar.set_message(format!("{} failed", snapshot.failed));
                }
            }
        })
    };

    let result = handle.wait().await;
    if let Err(e) = bar_updates.await {
        debug!(error = %e, "Progress bar task ended abnormally");
    }
    bar.finish_and_clear();
    result
}
