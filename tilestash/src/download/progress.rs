//! Download progress reporting.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle state of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DownloadStatus {
    /// Batches are still running.
    Downloading,
    /// Every batch ran; some tiles may have failed.
    Completed,
    /// The job stopped early on request.
    Cancelled,
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Downloading => write!(f, "downloading"),
            DownloadStatus::Completed => write!(f, "completed"),
            DownloadStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Tiles stored so far, including tiles skipped because they were cached.
    pub downloaded: usize,
    /// Tiles in the job.
    pub total: usize,
    /// `round(downloaded / total * 100)`.
    pub percentage: u8,
    pub status: DownloadStatus,
    /// Tiles that exhausted their attempts.
    pub failed: usize,
    /// Tiles served from the store without fetching.
    pub skipped: usize,
}

impl DownloadProgress {
    /// Build a snapshot, deriving the percentage.
    ///
    /// An empty job reports 100% once completed and 0% before.
    pub fn new(
        downloaded: usize,
        total: usize,
        failed: usize,
        skipped: usize,
        status: DownloadStatus,
    ) -> Self {
        let percentage = if total == 0 {
            if status == DownloadStatus::Completed {
                100
            } else {
                0
            }
        } else {
            percentage_of(downloaded, total)
        };

        Self {
            downloaded,
            total,
            percentage,
            status,
            failed,
            skipped,
        }
    }

    /// The initial snapshot for a job of `total` tiles.
    pub fn starting(total: usize) -> Self {
        Self::new(0, total, 0, 0, DownloadStatus::Downloading)
    }
}

impl Default for DownloadProgress {
    fn default() -> Self {
        Self::starting(0)
    }
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} tiles ({}%), {}",
            self.downloaded, self.total, self.percentage, self.status
        )
    }
}

/// Rounded percentage of `part` in `whole`.
pub(crate) fn percentage_of(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round().min(100.0) as u8
}

/// Callback invoked with every progress snapshot.
pub type ProgressCallback = Arc<dyn Fn(&DownloadProgress) + Send + Sync>;

/// Final counts of a successful job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Tiles stored, including skipped ones.
    pub downloaded: usize,
    /// Tiles that exhausted their attempts.
    pub failed: usize,
    /// Tiles served from the store without fetching.
    pub skipped: usize,
    pub total: usize,
    pub elapsed: Duration,
}

/// Shared counters for one job.
///
/// Tiles of a batch complete concurrently; each completion bumps a counter
/// and emits a snapshot, so `downloaded` is non-decreasing across events.
pub(crate) struct ProgressTracker {
    total: usize,
    downloaded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub(crate) fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            total,
            downloaded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            callback,
        }
    }

    pub(crate) fn downloaded(&self) -> usize {
        self.downloaded.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self, status: DownloadStatus) -> DownloadProgress {
        DownloadProgress::new(
            self.downloaded(),
            self.total,
            self.failed.load(Ordering::SeqCst),
            self.skipped.load(Ordering::SeqCst),
            status,
        )
    }

    pub(crate) fn emit(&self, status: DownloadStatus) -> DownloadProgress {
        let progress = self.snapshot(status);
        if let Some(callback) = &self.callback {
            callback(&progress);
        }
        progress
    }

    pub(crate) fn record_downloaded(&self) {
        self.downloaded.fetch_add(1, Ordering::SeqCst);
        self.emit(DownloadStatus::Downloading);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.record_downloaded();
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn summary(&self, elapsed: Duration) -> DownloadSummary {
        DownloadSummary {
            downloaded: self.downloaded(),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            total: self.total,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percentage_rounds() {
        assert_eq!(percentage_of(1, 3), 33);
        assert_eq!(percentage_of(2, 3), 67);
        assert_eq!(percentage_of(4, 5), 80);
        assert_eq!(percentage_of(5, 5), 100);
    }

    #[test]
    fn test_empty_job_percentage() {
        assert_eq!(DownloadProgress::starting(0).percentage, 0);
        let done = DownloadProgress::new(0, 0, 0, 0, DownloadStatus::Completed);
        assert_eq!(done.percentage, 100);
    }

    #[test]
    fn test_tracker_emits_monotonic_snapshots() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(*p));

        let tracker = ProgressTracker::new(3, Some(callback));
        tracker.emit(DownloadStatus::Downloading);
        tracker.record_downloaded();
        tracker.record_failed();
        tracker.record_skipped();
        tracker.emit(DownloadStatus::Completed);

        let seen = seen.lock().unwrap();
        let downloaded: Vec<_> = seen.iter().map(|p| p.downloaded).collect();
        assert_eq!(downloaded, vec![0, 1, 2, 2]);
        let last = seen.last().unwrap();
        assert_eq!(last.status, DownloadStatus::Completed);
        assert_eq!(last.failed, 1);
        assert_eq!(last.skipped, 1);
        assert_eq!(last.percentage, 67);
    }

    #[test]
    fn test_progress_display() {
        let progress = DownloadProgress::new(4, 5, 1, 0, DownloadStatus::Completed);
        assert_eq!(progress.to_string(), "4/5 tiles (80%), completed");
    }
}
