//! Archive encoding detection and entry classification.

pub mod entry_type;
pub mod sniff;

// Re-export main types for convenience
pub use entry_type::EntryKind;
pub use sniff::ArchiveEncoding;
pub use sniff::ArchiveProbe;
pub use sniff::ArchiveStream;
pub use sniff::open_archive;
pub use sniff::probe;
pub use sniff::probe_file;
pub use sniff::sniff;
