//! Error conversion utilities for CLI.
//!
//! Converts cachepull-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use cachepull_core::RestoreError;
use std::path::Path;

/// Converts `RestoreError` to a user-friendly anyhow error with context.
pub fn convert_restore_error(err: RestoreError) -> anyhow::Error {
    match err {
        RestoreError::StackMismatch { archive, current } => {
            anyhow!(
                "Cache was created on stack '{archive}', current stack is '{current}'\n\
                 HINT: Use --allow-fallback (or allow_fallback=true) to restore it anyway."
            )
        }
        RestoreError::ManifestNotFound { name } => {
            anyhow!(
                "Cache archive has no {name} entry\n\
                 HINT: The archive was not produced by a cache push step, or is empty."
            )
        }
        RestoreError::DownloadStatus { status, body } => {
            anyhow!(
                "Failed to download cache archive (http-code: {status}): {body}\n\
                 HINT: The download URL may have expired. Check the cache source URL."
            )
        }
        RestoreError::InvalidResolveResponse {
            status,
            reason,
            body,
        } => {
            anyhow!(
                "Cache API returned an unusable response (http-code: {status}): {reason}\n\
                 Response: {body}\n\
                 HINT: Check that --cache-api-url points at the cache API endpoint."
            )
        }
        RestoreError::ExtractionTool { command, output } => {
            anyhow!(
                "'{command}' failed:\n{output}\n\
                 HINT: Use --strategy manual to extract without the system tar."
            )
        }
        RestoreError::UnsupportedEntryType { path, kind } => {
            anyhow!(
                "Cache archive contains '{}' of unsupported type {kind}\n\
                 HINT: Use --strategy delegated to let the system tar handle it.",
                path.display()
            )
        }
        RestoreError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid cache archive: {reason}\n\
                 HINT: The archive may be truncated or corrupted."
            )
        }
        _ => anyhow::Error::from(err).context("Failed to restore build cache"),
    }
}

/// Adds the archive path to errors from local archive inspection.
pub fn convert_inspect_error(err: RestoreError, archive: &Path) -> anyhow::Error {
    match err {
        RestoreError::Io(io_err) => {
            anyhow!("Cannot read '{}': {io_err}", archive.display())
        }
        other => convert_restore_error(other)
            .context(format!("Error inspecting archive '{}'", archive.display())),
    }
}
