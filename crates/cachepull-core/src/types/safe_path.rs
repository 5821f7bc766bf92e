//! Normalized paths that cannot leave their root.

use crate::RestoreError;
use crate::Result;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// A relative path with no `.` or `..` components.
///
/// Joining a `SafePath` onto any root yields a path inside that root.
/// There is no `From<PathBuf>`; the only constructors validate.
///
/// # Examples
///
/// ```
/// use cachepull_core::types::SafePath;
/// use std::path::Path;
///
/// let safe = SafePath::relative(Path::new("./ios/Pods/Manifest.lock"))?;
/// assert_eq!(safe.as_path(), Path::new("ios/Pods/Manifest.lock"));
///
/// assert!(SafePath::relative(Path::new("../etc/passwd")).is_err());
/// # Ok::<(), cachepull_core::RestoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    /// Validates a path that must already be relative.
    ///
    /// # Errors
    ///
    /// Returns `PathTraversal` for absolute paths and for any `..`.
    pub fn relative(path: &Path) -> Result<Self> {
        Self::normalize(path, false)
    }

    /// Validates a path, dropping a leading root or prefix.
    ///
    /// Used to move absolute archive entries under a different root.
    ///
    /// # Errors
    ///
    /// Returns `PathTraversal` for any `..`.
    pub fn relocated(path: &Path) -> Result<Self> {
        Self::normalize(path, true)
    }

    fn normalize(path: &Path, strip_root: bool) -> Result<Self> {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) if strip_root => {}
                Component::RootDir | Component::Prefix(_) | Component::ParentDir => {
                    return Err(RestoreError::PathTraversal {
                        path: path.to_path_buf(),
                    });
                }
            }
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Joins this path onto `root`.
    #[must_use]
    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

impl AsRef<Path> for SafePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_strips_cur_dir() {
        let safe = SafePath::relative(Path::new("./a/./b.txt")).unwrap();
        assert_eq!(safe.as_path(), Path::new("a/b.txt"));
    }

    #[test]
    fn test_relative_rejects_traversal() {
        for path in ["../etc/passwd", "a/../../b", "a/b/.."] {
            assert!(
                matches!(
                    SafePath::relative(Path::new(path)),
                    Err(RestoreError::PathTraversal { .. })
                ),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_relative_rejects_absolute() {
        assert!(SafePath::relative(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_relocated_drops_root() {
        let safe = SafePath::relocated(Path::new("/Users/vagrant/.gradle/caches")).unwrap();
        assert_eq!(safe.as_path(), Path::new("Users/vagrant/.gradle/caches"));
        assert_eq!(
            safe.under(Path::new("/work")),
            PathBuf::from("/work/Users/vagrant/.gradle/caches")
        );
    }

    #[test]
    fn test_relocated_still_rejects_traversal() {
        assert!(SafePath::relocated(Path::new("/tmp/../etc")).is_err());
    }

    #[test]
    fn test_root_entries_join_to_root() {
        let root = Path::new("/tmp/root");
        assert_eq!(SafePath::relative(Path::new("./")).unwrap().under(root), root);
        assert_eq!(SafePath::relocated(Path::new("/")).unwrap().under(root), root);
    }
}
