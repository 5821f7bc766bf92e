//! Inspect command implementation.

use crate::cli::InspectArgs;
use crate::error::convert_inspect_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use cachepull_core::CacheManifest;
use cachepull_core::GateDecision;
use cachepull_core::RestoreError;
use cachepull_core::formats::ArchiveProbe;
use cachepull_core::formats::probe_file;
use cachepull_core::manifest::read_from_archive;
use cachepull_core::stack;
use std::path::Path;
use std::path::PathBuf;

/// What a local archive would do if it were restored.
#[derive(Debug)]
pub struct ArchiveInspection {
    pub archive: PathBuf,
    pub probe: ArchiveProbe,
    /// `None` when the archive has no manifest entry.
    pub manifest: Option<CacheManifest>,
    /// Stack gate verdict, evaluated only when a manifest was found.
    pub gate: Option<GateDecision>,
}

pub fn execute(args: &InspectArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let inspection = inspect(
        &args.archive,
        args.stack_id.as_deref(),
        args.allow_fallback,
    )
    .map_err(|e| convert_inspect_error(e, &args.archive))?;

    if inspection.manifest.is_none() {
        formatter.format_warning("archive has no cache-info.json entry and cannot be restored");
    }
    formatter.format_inspection(&inspection)
}

fn inspect(
    archive: &Path,
    stack_id: Option<&str>,
    allow_fallback: bool,
) -> cachepull_core::Result<ArchiveInspection> {
    let probe = probe_file(archive)?;
    let manifest = match read_from_archive(archive) {
        Ok(manifest) => Some(manifest),
        Err(RestoreError::ManifestNotFound { .. }) => None,
        Err(e) => return Err(e),
    };
    let gate = manifest
        .as_ref()
        .map(|m| stack::check(m.stack_id.as_deref(), stack_id, allow_fallback));

    Ok(ArchiveInspection {
        archive: archive.to_path_buf(),
        probe,
        manifest,
        gate,
    })
}
