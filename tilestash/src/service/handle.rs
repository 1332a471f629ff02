//! Handle to a running download job.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::download::{DownloadError, DownloadProgress, DownloadStatus, DownloadSummary};

/// Handle to a download job running on the Tokio runtime.
///
/// Each handle owns its job's cancellation token, so concurrent jobs are
/// observed and cancelled independently. Dropping the handle does not stop
/// the job.
pub struct DownloadHandle {
    region: String,
    /// Latest progress snapshot.
    progress_rx: watch::Receiver<DownloadProgress>,
    /// Cancellation token for this job only.
    cancellation: CancellationToken,
    task: JoinHandle<Result<DownloadSummary, DownloadError>>,
}

impl DownloadHandle {
    pub(crate) fn new(
        region: String,
        progress_rx: watch::Receiver<DownloadProgress>,
        cancellation: CancellationToken,
        task: JoinHandle<Result<DownloadSummary, DownloadError>>,
    ) -> Self {
        Self {
            region,
            progress_rx,
            cancellation,
            task,
        }
    }

    /// Region label of this job.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Request cancellation.
    ///
    /// Returns `true` if the job was still running and had not been
    /// cancelled before this call.
    pub fn cancel(&self) -> bool {
        if !self.is_downloading() || self.cancellation.is_cancelled() {
            return false;
        }
        self.cancellation.cancel();
        true
    }

    /// Whether the job is still running.
    pub fn is_downloading(&self) -> bool {
        !self.task.is_finished() && self.progress().status == DownloadStatus::Downloading
    }

    /// Latest progress snapshot.
    pub fn progress(&self) -> DownloadProgress {
        *self.progress_rx.borrow()
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> watch::Receiver<DownloadProgress> {
        self.progress_rx.clone()
    }

    /// A clone of this job's cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<DownloadSummary, DownloadError> {
        self.task
            .await
            .map_err(|e| DownloadError::Task(e.to_string()))?
    }
}

impl std::fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("region", &self.region)
            .field("progress", &self.progress())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}
