//! Classification of tar entry kinds.

/// How the manual extractor materializes an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Directory, created with all missing ancestors.
    Directory,
    /// Payload written to a plain file. Covers regular, contiguous,
    /// character/block device and fifo entries.
    File,
    /// Symbolic link to the recorded target.
    Symlink,
    /// Hard link to a previously extracted entry.
    Hardlink,
    /// Archive-level metadata record that carries no filesystem object.
    Metadata,
    /// Anything else.
    Unsupported,
}

impl EntryKind {
    /// Maps a tar entry type onto its extraction branch.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepull_core::formats::EntryKind;
    ///
    /// assert_eq!(EntryKind::classify(tar::EntryType::Fifo), EntryKind::File);
    /// assert_eq!(
    ///     EntryKind::classify(tar::EntryType::GNUSparse),
    ///     EntryKind::Unsupported
    /// );
    /// ```
    #[must_use]
    pub fn classify(entry_type: tar::EntryType) -> Self {
        match entry_type {
            tar::EntryType::Directory => Self::Directory,
            tar::EntryType::Regular
            | tar::EntryType::Continuous
            | tar::EntryType::Char
            | tar::EntryType::Block
            | tar::EntryType::Fifo => Self::File,
            tar::EntryType::Symlink => Self::Symlink,
            tar::EntryType::Link => Self::Hardlink,
            tar::EntryType::XGlobalHeader => Self::Metadata,
            _ => Self::Unsupported,
        }
    }

    /// Returns `true` for entries that produce a filesystem object.
    #[must_use]
    pub const fn is_materialized(self) -> bool {
        !matches!(self, Self::Metadata | Self::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_like_entries() {
        for entry_type in [
            tar::EntryType::Regular,
            tar::EntryType::Continuous,
            tar::EntryType::Char,
            tar::EntryType::Block,
            tar::EntryType::Fifo,
        ] {
            assert_eq!(EntryKind::classify(entry_type), EntryKind::File);
        }
    }

    #[test]
    fn test_link_entries() {
        assert_eq!(
            EntryKind::classify(tar::EntryType::Symlink),
            EntryKind::Symlink
        );
        assert_eq!(EntryKind::classify(tar::EntryType::Link), EntryKind::Hardlink);
    }

    #[test]
    fn test_directory_entry() {
        let kind = EntryKind::classify(tar::EntryType::Directory);
        assert_eq!(kind, EntryKind::Directory);
        assert!(kind.is_materialized());
    }

    #[test]
    fn test_unsupported_and_metadata() {
        assert_eq!(
            EntryKind::classify(tar::EntryType::GNUSparse),
            EntryKind::Unsupported
        );
        assert_eq!(
            EntryKind::classify(tar::EntryType::XGlobalHeader),
            EntryKind::Metadata
        );
        assert!(!EntryKind::Metadata.is_materialized());
        assert!(!EntryKind::Unsupported.is_materialized());
    }
}
