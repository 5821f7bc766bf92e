//! Restore operation reporting.

use std::path::PathBuf;
use std::time::Duration;

use crate::formats::ArchiveEncoding;
use crate::placement::PlacementReport;
use crate::stack::GateDecision;

/// Report of an archive extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Number of archive entries materialized, of any kind.
    pub entries_written: usize,

    /// Number of regular (and device/fifo-like) files written.
    pub files_extracted: usize,

    /// Number of directory entries created.
    pub directories_created: usize,

    /// Number of symlinks created.
    pub symlinks_created: usize,

    /// Number of hardlinks created.
    pub hardlinks_created: usize,

    /// Total payload bytes written to disk.
    pub bytes_written: u64,
}

impl ExtractionReport {
    /// Creates a new empty extraction report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Everything a successful restore produced.
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// Encoding detected for the downloaded archive.
    pub encoding: ArchiveEncoding,

    /// Size of the downloaded archive in bytes.
    pub archive_bytes: u64,

    /// Verdict of the stack compatibility check.
    pub stack: GateDecision,

    /// Extraction statistics.
    pub extraction: ExtractionReport,

    /// Items moved to their destinations and items skipped.
    pub placement: PlacementReport,

    /// Directory the archive was extracted into. Kept on disk.
    pub extraction_root: PathBuf,

    /// Location of the recovered manifest, exposed to later pipeline steps.
    pub manifest_path: PathBuf,

    /// Wall time of the whole restore.
    pub duration: Duration,
}

/// Result of a restore run that did not fail.
#[derive(Debug, Clone)]
pub enum RestoreOutcome {
    /// No cache source configured; nothing to do.
    NoCacheSource,

    /// The cache API reported that no cache was pushed yet.
    CacheNotInitialized {
        /// HTTP status returned by the API.
        status: u16,
    },

    /// The archive was downloaded, extracted and placed.
    Restored(RestoreReport),
}

impl RestoreOutcome {
    /// Returns the restore report when content was restored.
    #[must_use]
    pub fn report(&self) -> Option<&RestoreReport> {
        match self {
            Self::Restored(report) => Some(report),
            _ => None,
        }
    }
}

/// Callback trait for download progress.
///
/// Implement this trait to receive updates while an archive is streamed to
/// disk. The CLI uses it to drive a progress bar.
///
/// # Examples
///
/// ```
/// use cachepull_core::DownloadProgress;
///
/// struct Tally(u64);
///
/// impl DownloadProgress for Tally {
///     fn on_start(&mut self, _total: Option<u64>) {}
///
///     fn on_bytes(&mut self, bytes: u64) {
///         self.0 += bytes;
///     }
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait DownloadProgress {
    /// Called before the body is streamed. `total` is the Content-Length,
    /// when the server sent one.
    fn on_start(&mut self, total: Option<u64>);

    /// Called after each chunk written to disk.
    fn on_bytes(&mut self, bytes: u64);

    /// Called once the body has been fully written.
    fn on_complete(&mut self);
}

/// No-op implementation of `DownloadProgress`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl DownloadProgress for NoopProgress {
    fn on_start(&mut self, _total: Option<u64>) {}

    fn on_bytes(&mut self, _bytes: u64) {}

    fn on_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report() {
        let report = ExtractionReport::new();
        assert_eq!(report.entries_written, 0);
        assert_eq!(report.bytes_written, 0);
    }

    #[test]
    fn test_outcome_report_accessor() {
        assert!(RestoreOutcome::NoCacheSource.report().is_none());
        assert!(
            RestoreOutcome::CacheNotInitialized { status: 404 }
                .report()
                .is_none()
        );
    }
}
