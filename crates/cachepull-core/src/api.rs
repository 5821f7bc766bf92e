//! High-level restore pipeline.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use tempfile::TempDir;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::CacheSource;
use crate::RestoreConfig;
use crate::RestoreError;
use crate::Result;
use crate::download::Downloader;
use crate::download::HttpClient;
use crate::download::ReqwestClient;
use crate::extraction::PathMode;
use crate::extraction::select_extractor;
use crate::formats::probe_file;
use crate::manifest::read_from_archive;
use crate::manifest::read_from_extracted_root;
use crate::placement::PlacementReport;
use crate::placement::place;
use crate::report::DownloadProgress;
use crate::report::NoopProgress;
use crate::report::RestoreOutcome;
use crate::report::RestoreReport;
use crate::stack;
use crate::stack::GateDecision;

/// File name of the downloaded archive inside its temporary directory.
pub const ARCHIVE_FILE_NAME: &str = "cache-archive.tar";

/// Restores a cache archive over HTTP.
///
/// This is the main entry point. It downloads the archive named by
/// `config.cache_source`, checks the stack it was built on, extracts it and
/// moves its items into place.
///
/// A missing source and an uninitialised cache are not errors; they come
/// back as [`RestoreOutcome::NoCacheSource`] and
/// [`RestoreOutcome::CacheNotInitialized`].
///
/// # Errors
///
/// Returns an error if:
/// - The cache API answers with an unusable body
/// - The download fails twice
/// - The archive is corrupt or has no manifest
/// - The stacks differ and fallback is disabled
/// - Extraction fails
///
/// Items that cannot be placed are reported, not returned as errors.
///
/// # Examples
///
/// ```no_run
/// use cachepull_core::CacheSource;
/// use cachepull_core::RestoreConfig;
/// use cachepull_core::restore_cache;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RestoreConfig::default()
///     .with_cache_source(Some(CacheSource::Direct("https://cache.example/a.tar".into())));
/// if let Some(report) = restore_cache(&config)?.report() {
///     println!("manifest at {}", report.manifest_path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn restore_cache(config: &RestoreConfig) -> Result<RestoreOutcome> {
    if config.cache_source.is_none() {
        info!("no cache source configured, nothing to restore");
        return Ok(RestoreOutcome::NoCacheSource);
    }
    restore_cache_with(config, ReqwestClient::new()?, &mut NoopProgress)
}

/// [`restore_cache`] with a caller-supplied HTTP client and progress sink.
///
/// # Errors
///
/// See [`restore_cache`].
pub fn restore_cache_with<C: HttpClient>(
    config: &RestoreConfig,
    client: C,
    progress: &mut dyn DownloadProgress,
) -> Result<RestoreOutcome> {
    let started = Instant::now();

    let Some(source) = &config.cache_source else {
        info!("no cache source configured, nothing to restore");
        return Ok(RestoreOutcome::NoCacheSource);
    };

    let downloader = Downloader::new(client)
        .with_retry_backoff(config.retry_backoff)
        .with_api_timeout(config.api_timeout)
        .with_download_timeout(config.download_timeout)
        .with_debug(config.debug_mode);

    let url = match source {
        CacheSource::Direct(url) => url.clone(),
        CacheSource::Api(endpoint) => match downloader.resolve_download_url(endpoint) {
            Ok(url) => url,
            Err(RestoreError::CacheNotInitialized { status }) => {
                info!(status, "cache not initialised yet, nothing to restore");
                return Ok(RestoreOutcome::CacheNotInitialized { status });
            }
            Err(e) => return Err(e),
        },
    };

    let download_dir = temp_dir(config.work_dir.as_deref(), "cachepull-download-")?;
    let archive_path = download_dir.path().join(ARCHIVE_FILE_NAME);
    info!(%source, "downloading cache archive");
    let archive_bytes = downloader.fetch_with_retry(&url, &archive_path, progress)?;

    let probe = probe_file(&archive_path)?;
    info!(encoding = %probe.encoding, bytes = archive_bytes, "archive downloaded");
    if probe.is_empty() {
        warn!("cache archive contains no entries");
    }

    let manifest = read_from_archive(&archive_path)?;
    let stack = stack::check(
        manifest.stack_id.as_deref(),
        config.current_stack_id.as_deref(),
        config.allow_fallback,
    )
    .into_result()?;
    if let GateDecision::ProceedWithMismatch { archive, current } = &stack {
        warn!(
            archive = %archive,
            current = %current,
            "cache was created on a different stack, restoring anyway"
        );
    }

    // Placement archives are always unpacked into a scratch root. Stack
    // descriptor archives carry their own paths and are unpacked either in
    // place or under the relative base.
    let relocate_base = match (&config.relative_base, config.extract_relative) {
        (_, false) => None,
        (Some(base), true) => Some(base.clone()),
        (None, true) => Some(std::env::current_dir()?),
    };
    let (scratch, dest_root, path_mode) = match &relocate_base {
        Some(base) if !manifest.has_contents() => (None, base.clone(), PathMode::Relocate),
        _ => {
            let scratch = temp_dir(config.work_dir.as_deref(), "cachepull-extract-")?;
            let root = scratch.path().to_path_buf();
            (Some(scratch), root, PathMode::PreserveAbsolute)
        }
    };

    let extractor = select_extractor(config.strategy, path_mode, config.debug_mode);
    info!(extractor = extractor.name(), root = %dest_root.display(), "extracting archive");
    let extraction = extractor.extract(&archive_path, &dest_root)?;
    debug!(?extraction, "extraction finished");

    let (manifest_path, manifest) = read_from_extracted_root(&dest_root)?;
    let placement = if manifest.has_contents() {
        place(
            &manifest.contents,
            &dest_root,
            relocate_base.as_deref(),
            config.debug_mode,
        )
    } else {
        PlacementReport::default()
    };
    if !placement.is_complete() {
        warn!(
            placed = placement.placed_count(),
            skipped = placement.skipped_count(),
            "some cache items could not be placed"
        );
    }

    let extraction_root = keep_root(scratch, dest_root);
    let duration = started.elapsed();
    info!(
        manifest = %manifest_path.display(),
        elapsed_ms = duration.as_millis() as u64,
        "cache restored"
    );

    Ok(RestoreOutcome::Restored(RestoreReport {
        encoding: probe.encoding,
        archive_bytes,
        stack,
        extraction,
        placement,
        extraction_root,
        manifest_path,
        duration,
    }))
}

/// Creates a temporary directory, below `work_dir` when given.
fn temp_dir(work_dir: Option<&Path>, prefix: &str) -> Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix);
    let dir = match work_dir {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            builder.tempdir_in(parent)?
        }
        None => builder.tempdir()?,
    };
    Ok(dir)
}

/// Keeps the scratch root on disk; the manifest inside it outlives the run.
fn keep_root(scratch: Option<TempDir>, dest_root: PathBuf) -> PathBuf {
    match scratch {
        Some(dir) => dir.keep(),
        None => dest_root,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::HttpResponse;
    use crate::extraction::ExtractStrategy;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::manifest_json;
    use std::time::Duration;

    struct StaticClient {
        status: u16,
        body: Vec<u8>,
    }

    impl HttpClient for StaticClient {
        fn get(&self, _url: &str, _timeout: Option<Duration>) -> Result<HttpResponse> {
            Ok(HttpResponse::from_bytes(self.status, self.body.clone()))
        }
    }

    fn config(work: &Path) -> RestoreConfig {
        RestoreConfig::default()
            .with_cache_source(Some(CacheSource::Direct("https://cache/a.tar".into())))
            .with_strategy(ExtractStrategy::Manual)
            .with_retry_backoff(Duration::ZERO)
            .with_work_dir(Some(work.to_path_buf()))
    }

    #[test]
    fn test_no_source_is_noop() {
        let outcome = restore_cache(&RestoreConfig::default()).unwrap();
        assert!(matches!(outcome, RestoreOutcome::NoCacheSource));
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_download_dir_removed_and_root_kept() {
        let work = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let destination = dest.path().join("File.txt");
        let tar = TarTestBuilder::new()
            .add_manifest(&manifest_json(None, &[(destination.to_str().unwrap(), "0")]))
            .add_file("0", b"payload")
            .build();
        let client = StaticClient {
            status: 200,
            body: tar,
        };

        let outcome = restore_cache_with(&config(work.path()), client, &mut NoopProgress).unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(fs::read(&destination).unwrap(), b"payload");
        assert!(report.manifest_path.is_file());
        assert!(report.extraction_root.starts_with(work.path()));

        let leftovers: Vec<_> = fs::read_dir(work.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers.len(), 1);
        assert!(leftovers[0].starts_with("cachepull-extract-"));
    }

    #[test]
    fn test_failure_removes_temporary_directories() {
        let work = TempDir::new().unwrap();
        let client = StaticClient {
            status: 200,
            body: TarTestBuilder::new().add_file("File.txt", b"x").build(),
        };

        let err = restore_cache_with(&config(work.path()), client, &mut NoopProgress).unwrap_err();
        assert!(matches!(err, RestoreError::ManifestNotFound { .. }));
        assert_eq!(fs::read_dir(work.path()).unwrap().count(), 0);
    }
}
