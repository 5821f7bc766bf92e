//! In-process extraction, entry by entry.

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::info;

use super::Extractor;
use crate::ExtractionReport;
use crate::RestoreError;
use crate::Result;
use crate::formats::EntryKind;
use crate::formats::open_archive;
use crate::types::SafePath;

/// Mode given to every extracted directory.
const DIRECTORY_MODE: u32 = 0o755;

/// Where absolute archive entries are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathMode {
    /// Absolute entries go to their recorded location, relative entries
    /// below the destination root.
    PreserveAbsolute,
    /// Every entry goes below the destination root; a leading `/` is
    /// dropped.
    Relocate,
}

/// Walks the archive and materializes each entry itself.
///
/// Entries are handled strictly in archive order. Nothing is reordered or
/// deduplicated; a later entry for the same path replaces the earlier one.
#[derive(Debug, Clone)]
pub struct ManualExtractor {
    path_mode: PathMode,
    debug: bool,
}

impl ManualExtractor {
    /// Creates a manual extractor.
    #[must_use]
    pub const fn new(path_mode: PathMode, debug: bool) -> Self {
        Self { path_mode, debug }
    }

    /// Maps an entry path to its location on disk.
    fn resolve(&self, root: &Path, entry_path: &Path) -> Result<PathBuf> {
        match self.path_mode {
            PathMode::PreserveAbsolute if entry_path.has_root() => {
                SafePath::relocated(entry_path)?;
                Ok(entry_path.to_path_buf())
            }
            PathMode::PreserveAbsolute => Ok(SafePath::relative(entry_path)?.under(root)),
            PathMode::Relocate => Ok(SafePath::relocated(entry_path)?.under(root)),
        }
    }

    /// Finds the file a hardlink entry points at.
    ///
    /// The link name is tried next to the link first, then against the
    /// root, which is where most tar writers record it.
    fn resolve_link_source(&self, root: &Path, target: &Path, link_name: &Path) -> Result<PathBuf> {
        if !link_name.has_root() {
            let sibling = SafePath::relative(link_name)
                .ok()
                .and_then(|safe| target.parent().map(|dir| safe.under(dir)));
            if let Some(sibling) = sibling
                && sibling != target
                && fs::symlink_metadata(&sibling).is_ok()
            {
                return Ok(sibling);
            }
        }
        self.resolve(root, link_name)
    }
}

impl Extractor for ManualExtractor {
    fn extract(&self, archive: &Path, dest_root: &Path) -> Result<ExtractionReport> {
        fs::create_dir_all(dest_root)?;

        let stream = open_archive(archive)?;
        debug!(encoding = %stream.encoding(), archive = %archive.display(), "extracting");
        let mut archive = tar::Archive::new(stream);
        let entries = archive.entries().map_err(|e| {
            RestoreError::InvalidArchive(format!("failed to read tar entries: {e}"))
        })?;

        let mut report = ExtractionReport::new();
        for entry in entries {
            let mut entry = entry.map_err(|e| {
                RestoreError::InvalidArchive(format!("failed to read tar entry: {e}"))
            })?;
            let entry_path = entry
                .path()
                .map_err(|e| RestoreError::InvalidArchive(format!("invalid path: {e}")))?
                .into_owned();
            let entry_type = entry.header().entry_type();

            let kind = EntryKind::classify(entry_type);
            if !kind.is_materialized() {
                if kind == EntryKind::Unsupported {
                    return Err(RestoreError::UnsupportedEntryType {
                        path: entry_path,
                        kind: format!("{entry_type:?}"),
                    });
                }
                debug!(entry = %entry_path.display(), "skipping archive metadata");
                continue;
            }

            let target = self.resolve(dest_root, &entry_path)?;
            if self.debug {
                info!(entry = %entry_path.display(), target = %target.display(), "extracting entry");
            }

            match kind {
                EntryKind::Directory => create_directory(&target, &mut report)?,
                EntryKind::File => {
                    let mode = entry.header().mode().ok();
                    extract_file(&mut entry, &target, mode, &mut report)?;
                }
                EntryKind::Symlink => {
                    let link_name = link_name(&entry, &entry_path)?;
                    create_symlink(&link_name, &target, &mut report)?;
                }
                EntryKind::Hardlink => {
                    let link_name = link_name(&entry, &entry_path)?;
                    let source = self.resolve_link_source(dest_root, &target, &link_name)?;
                    create_hardlink(&source, &target, &mut report)?;
                }
                EntryKind::Metadata | EntryKind::Unsupported => {}
            }
            report.entries_written += 1;
        }

        debug!(entries = report.entries_written, "manual extraction finished");
        Ok(report)
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

fn link_name<R: Read>(entry: &tar::Entry<'_, R>, entry_path: &Path) -> Result<PathBuf> {
    entry
        .link_name()
        .map_err(|e| RestoreError::InvalidArchive(format!("invalid link name: {e}")))?
        .map(std::borrow::Cow::into_owned)
        .ok_or_else(|| {
            RestoreError::InvalidArchive(format!("{}: link without target", entry_path.display()))
        })
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Removes a non-directory at `path` so a new entry can take its place.
fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path)?,
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn create_directory(path: &Path, report: &mut ExtractionReport) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIRECTORY_MODE);
    }
    #[cfg(not(unix))]
    let _ = DIRECTORY_MODE;

    builder.create(path)?;
    report.directories_created += 1;
    Ok(())
}

fn extract_file<R: Read>(
    reader: &mut R,
    path: &Path,
    mode: Option<u32>,
    report: &mut ExtractionReport,
) -> Result<()> {
    create_parent(path)?;
    remove_existing(path)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);
    let written = std::io::copy(reader, &mut writer)?;
    writer.flush()?;

    // Platforms without permission bits skip this step.
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    report.files_extracted += 1;
    report.bytes_written += written;
    Ok(())
}

fn create_symlink(link_target: &Path, path: &Path, report: &mut ExtractionReport) -> Result<()> {
    create_parent(path)?;
    remove_existing(path)?;

    #[cfg(unix)]
    std::os::unix::fs::symlink(link_target, path)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_file(link_target, path)?;

    report.symlinks_created += 1;
    Ok(())
}

fn create_hardlink(source: &Path, path: &Path, report: &mut ExtractionReport) -> Result<()> {
    create_parent(path)?;
    if source == path {
        // Self-referencing link: the file is already in place.
        report.hardlinks_created += 1;
        return Ok(());
    }
    remove_existing(path)?;
    fs::hard_link(source, path)?;
    report.hardlinks_created += 1;
    Ok(())
}
