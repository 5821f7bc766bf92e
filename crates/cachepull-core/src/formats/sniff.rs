//! Archive encoding detection on forward-only streams.
//!
//! The cache writer produces either a plain tar stream or a gzip-compressed
//! one, and nothing tells which. The stream is offered to a gzip decoder
//! first; when the gzip header does not parse, the bytes the decoder pulled
//! are replayed and the same stream is read as plain tar.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::{self};
use std::path::Path;
use std::path::PathBuf;

use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::RestoreError;
use crate::Result;
use crate::io::RestorableReader;

/// Encoding of a cache archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveEncoding {
    /// Gzip-compressed tar stream.
    Gzip,
    /// Uncompressed tar stream.
    Raw,
}

impl ArchiveEncoding {
    /// Returns a short human-readable name.
    ///
    /// # Examples
    ///
    /// ```
    /// use cachepull_core::formats::ArchiveEncoding;
    ///
    /// assert_eq!(ArchiveEncoding::Gzip.name(), "tar.gz");
    /// assert_eq!(ArchiveEncoding::Raw.name(), "tar");
    /// ```
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "tar.gz",
            Self::Raw => "tar",
        }
    }
}

impl fmt::Display for ArchiveEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tar byte stream with its encoding already decided.
///
/// Reading yields decompressed tar bytes in both cases.
pub enum ArchiveStream<R: Read> {
    /// Bytes go through a gzip decoder.
    Gzip(MultiGzDecoder<RestorableReader<R>>),
    /// Bytes are passed through untouched.
    Raw(RestorableReader<R>),
}

impl<R: Read> ArchiveStream<R> {
    /// Returns the detected encoding.
    #[must_use]
    pub const fn encoding(&self) -> ArchiveEncoding {
        match self {
            Self::Gzip(_) => ArchiveEncoding::Gzip,
            Self::Raw(_) => ArchiveEncoding::Raw,
        }
    }
}

impl<R: Read> Read for ArchiveStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(decoder) => decoder.read(buf),
            Self::Raw(reader) => reader.read(buf),
        }
    }
}

impl<R: Read> fmt::Debug for ArchiveStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArchiveStream")
            .field(&self.encoding())
            .finish()
    }
}

/// Decides whether `reader` carries gzip or plain tar bytes.
///
/// The gzip path is taken when the decoder accepts the gzip header; the
/// recording is then dropped so the rest of the stream is not buffered.
/// Otherwise every byte the decoder consumed is replayed and the stream is
/// treated as plain tar. No data is lost on either path.
///
/// # Examples
///
/// ```
/// use cachepull_core::formats::ArchiveEncoding;
/// use cachepull_core::formats::sniff;
///
/// let stream = sniff(&b"not gzip at all"[..]);
/// assert_eq!(stream.encoding(), ArchiveEncoding::Raw);
/// ```
pub fn sniff<R: Read>(reader: R) -> ArchiveStream<R> {
    debug!("attempt to read archive as gzip");
    let mut decoder = MultiGzDecoder::new(RestorableReader::new(reader));

    if decoder.header().is_some() {
        decoder.get_mut().commit();
        return ArchiveStream::Gzip(decoder);
    }

    debug!("gzip header rejected, restoring reader and trying as plain tar");
    let mut restorable = decoder.into_inner();
    restorable.restore();
    ArchiveStream::Raw(restorable)
}

/// What [`probe`] learned from the head of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveProbe {
    /// Detected encoding.
    pub encoding: ArchiveEncoding,
    /// Path recorded for the first entry, `None` for an archive without
    /// entries.
    pub first_entry: Option<PathBuf>,
}

impl ArchiveProbe {
    /// Returns `true` when the archive holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_entry.is_none()
    }
}

/// Sniffs the encoding and reads only the first entry header.
///
/// An archive with zero entries is reported through
/// [`ArchiveProbe::is_empty`], not as an error.
///
/// # Errors
///
/// Returns `InvalidArchive` when the first header cannot be parsed.
pub fn probe<R: Read>(reader: R) -> Result<ArchiveProbe> {
    let stream = sniff(reader);
    let encoding = stream.encoding();
    let mut archive = tar::Archive::new(stream);

    let mut entries = archive
        .entries()
        .map_err(|e| RestoreError::InvalidArchive(format!("failed to read tar entries: {e}")))?;

    let first_entry = match entries.next() {
        None => None,
        Some(entry) => {
            let entry = entry.map_err(|e| {
                RestoreError::InvalidArchive(format!("failed to read tar entry: {e}"))
            })?;
            let path = entry
                .path()
                .map_err(|e| RestoreError::InvalidArchive(format!("invalid path: {e}")))?
                .into_owned();
            Some(path)
        }
    };

    Ok(ArchiveProbe {
        encoding,
        first_entry,
    })
}

/// Opens a local archive file and sniffs it.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be opened.
pub fn open_archive(path: &Path) -> Result<ArchiveStream<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(sniff(BufReader::new(file)))
}

/// [`probe`] for a local archive file.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be opened, `InvalidArchive`
/// when the first header is corrupted.
pub fn probe_file(path: &Path) -> Result<ArchiveProbe> {
    let file = File::open(path)?;
    probe(BufReader::new(file))
}
