//! Cache manifest lookup and decoding.
//!
//! The cache writer stores a JSON descriptor named [`MANIFEST_FILE_NAME`]
//! at the archive root. It records the stack the cache was built on and,
//! for the placement layout, where each archived item belongs.

use std::fs;
use std::io::Read;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::RestoreError;
use crate::Result;
use crate::formats::open_archive;
use crate::types::SafePath;

/// File name of the manifest inside the archive and the extraction root.
pub const MANIFEST_FILE_NAME: &str = "cache-info.json";

/// Decoded cache manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Stack the cache was created on. Unset means "don't care".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    /// Fingerprint of the cached content, as recorded by the writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Items to move out of the extraction root, in placement order.
    #[serde(default, rename = "cache_contents")]
    pub contents: Vec<CacheItem>,
}

impl CacheManifest {
    /// Decodes a manifest from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidManifest` when the bytes are not a manifest object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Returns `true` for the placement layout, where items are extracted
    /// into a scratch root and then moved to their destinations.
    #[must_use]
    pub fn has_contents(&self) -> bool {
        !self.contents.is_empty()
    }
}

/// One archived item and its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheItem {
    /// Where the item must end up.
    pub destination_path: PathBuf,
    /// Location of the item relative to the extraction root.
    pub relative_path_in_archive: PathBuf,
}

impl CacheItem {
    /// Resolves the item's source inside `root`.
    ///
    /// # Errors
    ///
    /// Returns `PathTraversal` if the relative path is absolute or climbs
    /// out of `root`.
    pub fn source_in(&self, root: &Path) -> Result<PathBuf> {
        Ok(SafePath::relative(&self.relative_path_in_archive)?.under(root))
    }
}

/// Returns `true` if an archive entry path names the manifest.
///
/// Both `cache-info.json` and `./cache-info.json` match.
///
/// # Examples
///
/// ```
/// use cachepull_core::manifest::is_manifest_entry;
/// use std::path::Path;
///
/// assert!(is_manifest_entry(Path::new("./cache-info.json")));
/// assert!(!is_manifest_entry(Path::new("nested/cache-info.json")));
/// ```
#[must_use]
pub fn is_manifest_entry(path: &Path) -> bool {
    let mut components = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir));
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == MANIFEST_FILE_NAME
    )
}

/// Scans every entry of the archive at `path` for the manifest.
///
/// # Errors
///
/// Returns `ManifestNotFound` when no entry matches, `InvalidArchive` on a
/// corrupted stream and `InvalidManifest` when the entry is not valid JSON.
pub fn read_from_archive(path: &Path) -> Result<CacheManifest> {
    let mut archive = tar::Archive::new(open_archive(path)?);
    let entries = archive
        .entries()
        .map_err(|e| RestoreError::InvalidArchive(format!("failed to read tar entries: {e}")))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| RestoreError::InvalidArchive(format!("failed to read tar entry: {e}")))?;
        let entry_path = entry
            .path()
            .map_err(|e| RestoreError::InvalidArchive(format!("invalid path: {e}")))?
            .into_owned();
        if !is_manifest_entry(&entry_path) {
            continue;
        }

        debug!(entry = %entry_path.display(), "found cache info entry");
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        return CacheManifest::from_slice(&bytes);
    }

    Err(RestoreError::ManifestNotFound {
        name: MANIFEST_FILE_NAME,
    })
}

/// Reads the manifest from an already extracted root.
///
/// Returns the manifest's path along with its contents.
///
/// # Errors
///
/// Returns `ManifestNotFound` when the file is absent and
/// `InvalidManifest` when it cannot be decoded.
pub fn read_from_extracted_root(root: &Path) -> Result<(PathBuf, CacheManifest)> {
    let path = root.join(MANIFEST_FILE_NAME);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RestoreError::ManifestNotFound {
                name: MANIFEST_FILE_NAME,
            });
        }
        Err(e) => return Err(e.into()),
    };
    let manifest = CacheManifest::from_slice(&bytes)?;
    Ok((path, manifest))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::gzip;
    use crate::test_utils::manifest_json;
    use tempfile::TempDir;

    const LEGACY: &str = r#"{
        "fingerprint": "abc123",
        "stack_id": "osx-xcode-15",
        "cache_contents": [
            {"destination_path": "/Users/vagrant/.gradle", "relative_path_in_archive": "0/.gradle"}
        ]
    }"#;

    #[test]
    fn test_decode_placement_variant() {
        let manifest = CacheManifest::from_slice(LEGACY.as_bytes()).unwrap();
        assert_eq!(manifest.stack_id.as_deref(), Some("osx-xcode-15"));
        assert_eq!(manifest.fingerprint.as_deref(), Some("abc123"));
        assert!(manifest.has_contents());
        assert_eq!(
            manifest.contents[0].relative_path_in_archive,
            PathBuf::from("0/.gradle")
        );
    }

    #[test]
    fn test_decode_stack_descriptor_variant() {
        let manifest = CacheManifest::from_slice(br#"{"stack_id": "linux-docker"}"#).unwrap();
        assert_eq!(manifest.stack_id.as_deref(), Some("linux-docker"));
        assert!(!manifest.has_contents());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = CacheManifest::from_slice(b"<html>").unwrap_err();
        assert!(matches!(err, RestoreError::InvalidManifest(_)));
    }

    #[test]
    fn test_item_source_stays_inside_root() {
        let item = CacheItem {
            destination_path: PathBuf::from("/tmp/out"),
            relative_path_in_archive: PathBuf::from("./0/File.txt"),
        };
        assert_eq!(
            item.source_in(Path::new("/extract")).unwrap(),
            PathBuf::from("/extract/0/File.txt")
        );

        let escaping = CacheItem {
            destination_path: PathBuf::from("/tmp/out"),
            relative_path_in_archive: PathBuf::from("../../etc/passwd"),
        };
        assert!(matches!(
            escaping.source_in(Path::new("/extract")),
            Err(RestoreError::PathTraversal { .. })
        ));
    }

    #[test]
    fn test_manifest_entry_names() {
        assert!(is_manifest_entry(Path::new("cache-info.json")));
        assert!(is_manifest_entry(Path::new("./cache-info.json")));
        assert!(!is_manifest_entry(Path::new("cache-info.json.bak")));
        assert!(!is_manifest_entry(Path::new("/cache-info.json")));
        assert!(!is_manifest_entry(Path::new("a/cache-info.json")));
    }

    #[test]
    fn test_read_from_archive_scans_past_other_entries() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache-archive.tar");
        let tar = TarTestBuilder::new()
            .add_file("File.txt", b"hello")
            .add_file("./cache-info.json", manifest_json(Some("X"), &[]).as_bytes())
            .build();
        std::fs::write(&path, gzip(&tar)).unwrap();

        let manifest = read_from_archive(&path).unwrap();
        assert_eq!(manifest.stack_id.as_deref(), Some("X"));
    }

    #[test]
    fn test_read_from_archive_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache-archive.tar");
        std::fs::write(&path, TarTestBuilder::new().add_file("File.txt", b"x").build()).unwrap();

        let err = read_from_archive(&path).unwrap_err();
        assert!(matches!(err, RestoreError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_read_from_empty_archive_is_not_found() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cache-archive.tar");
        std::fs::write(&path, TarTestBuilder::new().build()).unwrap();

        assert!(matches!(
            read_from_archive(&path),
            Err(RestoreError::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_read_from_extracted_root() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE_NAME), LEGACY).unwrap();

        let (path, manifest) = read_from_extracted_root(temp.path()).unwrap();
        assert_eq!(path, temp.path().join("cache-info.json"));
        assert_eq!(manifest.contents.len(), 1);
    }

    #[test]
    fn test_read_from_extracted_root_missing() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            read_from_extracted_root(temp.path()),
            Err(RestoreError::ManifestNotFound { .. })
        ));
    }
}
