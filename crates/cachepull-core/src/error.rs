//! Error types for cache restore operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `RestoreError`.
pub type Result<T> = std::result::Result<T, RestoreError>;

/// Boxed transport-level error produced by an [`HttpClient`](crate::HttpClient).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while restoring a cache archive.
#[derive(Error, Debug)]
pub enum RestoreError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// The requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: TransportError,
    },

    /// The cache API answered outside of the success range.
    ///
    /// This is how the API reports a cache that has never been pushed.
    #[error(
        "build cache not found (http-code: {status}), the cache is probably not initialised yet"
    )]
    CacheNotInitialized {
        /// HTTP status returned by the API.
        status: u16,
    },

    /// The cache API answered, but the body is not usable.
    #[error("invalid cache API response (http-code: {status}): {reason}: {body}")]
    InvalidResolveResponse {
        /// HTTP status returned by the API.
        status: u16,
        /// What was wrong with the body.
        reason: String,
        /// Raw response body.
        body: String,
    },

    /// The archive download answered with a non-200 status.
    #[error("failed to download archive, non success response code: {status}: {body}")]
    DownloadStatus {
        /// HTTP status of the download response.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// Archive is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// No manifest entry was found in the archive or extraction root.
    #[error("did not find the required cache info file ({name}) in the archive")]
    ManifestNotFound {
        /// Sentinel name that was searched for.
        name: &'static str,
    },

    /// The manifest exists but cannot be decoded.
    #[error("invalid cache info: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    /// The archive was produced on a different stack and fallback is off.
    #[error("stack mismatch: cache was created on '{archive}', current stack is '{current}'")]
    StackMismatch {
        /// Stack identity recorded in the manifest.
        archive: String,
        /// Stack identity of the running environment.
        current: String,
    },

    /// The external archiving tool exited unsuccessfully.
    #[error("{command} failed: {output}")]
    ExtractionTool {
        /// Printable command line.
        command: String,
        /// Captured stdout and stderr.
        output: String,
    },

    /// Archive entry of a kind the extractor cannot materialize.
    #[error("{path}: unsupported entry type: {kind}")]
    UnsupportedEntryType {
        /// Entry path as recorded in the archive.
        path: PathBuf,
        /// Debug name of the tar entry type.
        kind: String,
    },

    /// Path resolves outside of its root.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path.
        path: PathBuf,
    },
}

impl RestoreError {
    /// Returns `true` if the cache API reported an uninitialised cache.
    ///
    /// Callers treat this as "nothing to restore" rather than a failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepull_core::RestoreError;
    ///
    /// let err = RestoreError::CacheNotInitialized { status: 404 };
    /// assert!(err.is_not_initialized());
    ///
    /// let err = RestoreError::InvalidArchive("truncated".into());
    /// assert!(!err.is_not_initialized());
    /// ```
    #[must_use]
    pub const fn is_not_initialized(&self) -> bool {
        matches!(self, Self::CacheNotInitialized { .. })
    }

    /// Returns `true` if a failed download attempt is worth repeating.
    ///
    /// Only transport failures, bad download statuses and local I/O errors
    /// qualify; everything else would fail the same way again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::DownloadStatus { .. } | Self::Io(_)
        )
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepull_core::RestoreError;
    ///
    /// let err = RestoreError::InvalidArchive("bad header".to_string());
    /// assert_eq!(err.context(), Some("bad header"));
    ///
    /// let err = RestoreError::CacheNotInitialized { status: 404 };
    /// assert_eq!(err.context(), None);
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidArchive(msg) => Some(msg),
            Self::ExtractionTool { output, .. } => Some(output),
            Self::DownloadStatus { body, .. } | Self::InvalidResolveResponse { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RestoreError::ManifestNotFound {
            name: "cache-info.json",
        };
        assert!(err.to_string().contains("cache-info.json"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RestoreError = io_err.into();
        assert!(matches!(err, RestoreError::Io(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_stack_mismatch_display() {
        let err = RestoreError::StackMismatch {
            archive: "osx-xcode-15".into(),
            current: "linux-ubuntu-22".into(),
        };
        let display = err.to_string();
        assert!(display.contains("osx-xcode-15"));
        assert!(display.contains("linux-ubuntu-22"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_download_status_carries_body() {
        let err = RestoreError::DownloadStatus {
            status: 403,
            body: "<Error>AccessDenied</Error>".into(),
        };
        assert!(err.to_string().contains("403"));
        assert_eq!(err.context(), Some("<Error>AccessDenied</Error>"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_extraction_tool_error() {
        let err = RestoreError::ExtractionTool {
            command: "tar -xvpPf /tmp/cache-archive.tar".into(),
            output: "tar: Unexpected EOF in archive".into(),
        };
        let display = err.to_string();
        assert!(display.starts_with("tar -xvpPf"));
        assert!(display.contains("Unexpected EOF"));
    }

    #[test]
    fn test_not_initialized_is_not_retryable() {
        let err = RestoreError::CacheNotInitialized { status: 404 };
        assert!(err.is_not_initialized());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unsupported_entry_type_names_path() {
        let err = RestoreError::UnsupportedEntryType {
            path: PathBuf::from("dev/sparse.img"),
            kind: "GNUSparse".into(),
        };
        assert!(err.to_string().contains("dev/sparse.img"));
        assert!(err.to_string().contains("GNUSparse"));
    }
}
