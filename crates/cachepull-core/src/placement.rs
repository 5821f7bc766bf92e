//! Moves extracted items to their destinations.
//!
//! Placement never fails as a whole. Each item that cannot be moved is
//! logged and recorded in [`PlacementReport::skipped`], and the remaining
//! items are still placed.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::info;
use tracing::warn;
use walkdir::WalkDir;

use crate::Result;
use crate::manifest::CacheItem;
use crate::types::SafePath;

/// A manifest item that was not placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// The item as listed in the manifest.
    pub item: CacheItem,
    /// Why it was skipped.
    pub reason: String,
}

/// Outcome of placing manifest items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementReport {
    /// Destinations that now hold their item, in manifest order.
    pub placed: Vec<PathBuf>,
    /// Items left behind, in manifest order.
    pub skipped: Vec<SkippedItem>,
}

impl PlacementReport {
    /// Number of items placed.
    #[must_use]
    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    /// Number of items skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Returns `true` if no item was skipped.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Moves each item from below `root` to its destination, in order.
///
/// Missing destination parents are created first. A destination file is
/// replaced; a non-empty destination directory makes the item fail.
///
/// With `relocate_to` set, absolute destinations are rebased under that
/// directory instead of being used as is.
///
/// # Examples
///
/// ```
/// use cachepull_core::manifest::CacheItem;
/// use cachepull_core::placement::place;
///
/// let root = tempfile::tempdir()?;
/// std::fs::write(root.path().join("File.txt"), b"hello")?;
/// let dest = tempfile::tempdir()?;
///
/// let items = vec![
///     CacheItem {
///         destination_path: dest.path().join("out/File.txt"),
///         relative_path_in_archive: "File.txt".into(),
///     },
///     CacheItem {
///         destination_path: dest.path().join("missing"),
///         relative_path_in_archive: "missing".into(),
///     },
/// ];
///
/// let report = place(&items, root.path(), None, false);
/// assert_eq!(report.placed_count(), 1);
/// assert_eq!(report.skipped_count(), 1);
/// # Ok::<(), std::io::Error>(())
/// ```
#[must_use]
pub fn place(
    items: &[CacheItem],
    root: &Path,
    relocate_to: Option<&Path>,
    debug: bool,
) -> PlacementReport {
    items
        .iter()
        .fold(PlacementReport::default(), |mut report, item| {
            match place_item(item, root, relocate_to) {
                Ok(destination) => {
                    if debug {
                        info!(
                            from = %item.relative_path_in_archive.display(),
                            to = %destination.display(),
                            "moved cache item"
                        );
                    }
                    report.placed.push(destination);
                }
                Err(err) => {
                    warn!(
                        item = %item.relative_path_in_archive.display(),
                        destination = %item.destination_path.display(),
                        error = %err,
                        "failed to place cache item, skipping"
                    );
                    report.skipped.push(SkippedItem {
                        item: item.clone(),
                        reason: err.to_string(),
                    });
                }
            }
            report
        })
}

fn place_item(item: &CacheItem, root: &Path, relocate_to: Option<&Path>) -> Result<PathBuf> {
    let source = item.source_in(root)?;
    let destination = match relocate_to {
        Some(base) => SafePath::relocated(&item.destination_path)?.under(base),
        None => item.destination_path.clone(),
    };

    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(&source, &destination) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(
                source = %source.display(),
                destination = %destination.display(),
                "rename crosses filesystems, copying instead"
            );
            move_across_devices(&source, &destination)?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(destination)
}

fn move_across_devices(source: &Path, destination: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(source)?;
    if !metadata.is_dir() {
        copy_entry(source, destination, &metadata)?;
        fs::remove_file(source)?;
        return Ok(());
    }

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| io::Error::other(format!("walkdir error: {e}")))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = destination.join(relative);
        let metadata = entry
            .metadata()
            .map_err(|e| io::Error::other(format!("walkdir error: {e}")))?;

        if metadata.is_dir() {
            fs::create_dir_all(&target)?;
            fs::set_permissions(&target, metadata.permissions())?;
        } else {
            copy_entry(entry.path(), &target, &metadata)?;
        }
    }
    fs::remove_dir_all(source)?;
    Ok(())
}

fn copy_entry(source: &Path, target: &Path, metadata: &fs::Metadata) -> Result<()> {
    if metadata.is_symlink() {
        let link = fs::read_link(source)?;
        #[cfg(unix)]
        std::os::unix::fs::symlink(link, target)?;
        #[cfg(not(unix))]
        fs::copy(source.with_file_name(link), target)?;
    } else {
        fs::copy(source, target)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(destination: PathBuf, relative: &str) -> CacheItem {
        CacheItem {
            destination_path: destination,
            relative_path_in_archive: PathBuf::from(relative),
        }
    }

    #[test]
    fn test_places_files_and_directories() {
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("0/Pods")).unwrap();
        fs::write(root.path().join("0/Pods/Manifest.lock"), b"lock").unwrap();
        fs::write(root.path().join("1"), b"file").unwrap();

        let items = vec![
            item(dest.path().join("ios/Pods"), "0/Pods"),
            item(dest.path().join("deep/nested/file.txt"), "1"),
        ];
        let report = place(&items, root.path(), None, true);

        assert!(report.is_complete());
        assert_eq!(report.placed_count(), 2);
        assert_eq!(
            fs::read(dest.path().join("ios/Pods/Manifest.lock")).unwrap(),
            b"lock"
        );
        assert_eq!(
            fs::read(dest.path().join("deep/nested/file.txt")).unwrap(),
            b"file"
        );
        assert!(!root.path().join("1").exists());
    }

    #[test]
    fn test_missing_source_is_skipped_and_rest_placed() {
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        for name in ["a", "c"] {
            fs::write(root.path().join(name), name).unwrap();
        }

        let items = vec![
            item(dest.path().join("a"), "a"),
            item(dest.path().join("b"), "b"),
            item(dest.path().join("c"), "c"),
        ];
        let report = place(&items, root.path(), None, false);

        assert_eq!(report.placed, vec![dest.path().join("a"), dest.path().join("c")]);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.skipped[0].item, items[1]);
        assert!(!report.skipped[0].reason.is_empty());
    }

    #[test]
    fn test_traversal_item_is_skipped() {
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();

        let items = vec![item(dest.path().join("x"), "../outside")];
        let report = place(&items, root.path(), None, false);

        assert_eq!(report.skipped_count(), 1);
        assert!(report.skipped[0].reason.contains("traversal"));
    }

    #[test]
    fn test_existing_destination_file_is_replaced() {
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(root.path().join("f"), b"new").unwrap();
        fs::write(dest.path().join("f"), b"old").unwrap();

        let report = place(&[item(dest.path().join("f"), "f")], root.path(), None, false);
        assert!(report.is_complete());
        assert_eq!(fs::read(dest.path().join("f")).unwrap(), b"new");
    }

    #[test]
    fn test_relocated_destination() {
        let root = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        fs::write(root.path().join("f"), b"x").unwrap();

        let items = vec![item(PathBuf::from("/Users/vagrant/f.txt"), "f")];
        let report = place(&items, root.path(), Some(base.path()), false);

        let expected = base.path().join("Users/vagrant/f.txt");
        assert_eq!(report.placed, vec![expected.clone()]);
        assert_eq!(fs::read(expected).unwrap(), b"x");
    }

    #[test]
    fn test_copy_fallback_moves_tree() {
        let root = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let source = root.path().join("tree");
        fs::create_dir_all(source.join("sub")).unwrap();
        fs::write(source.join("sub/f.txt"), b"payload").unwrap();
        fs::write(source.join("top.txt"), b"top").unwrap();

        let target = dest.path().join("moved");
        move_across_devices(&source, &target).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(target.join("sub/f.txt")).unwrap(), b"payload");
        assert_eq!(fs::read(target.join("top.txt")).unwrap(), b"top");
    }

    #[test]
    fn test_empty_manifest_places_nothing() {
        let root = TempDir::new().unwrap();
        let report = place(&[], root.path(), None, false);
        assert_eq!(report, PlacementReport::default());
    }
}
