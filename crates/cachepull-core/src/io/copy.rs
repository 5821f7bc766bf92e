//! Buffered copy loop that reports progress as it goes.

use std::io::Read;
use std::io::Write;
use std::io::{self};

use crate::report::DownloadProgress;

/// Buffer size for streaming copies (64KB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Copies `reader` into `writer`, reporting each chunk to `progress`.
///
/// Interrupted reads are retried. Returns the number of bytes copied.
///
/// # Errors
///
/// Returns the first read or write error.
///
/// # Examples
///
/// ```
/// use cachepull_core::NoopProgress;
/// use cachepull_core::io::copy_with_progress;
///
/// let mut out = Vec::new();
/// let copied = copy_with_progress(&mut &b"payload"[..], &mut out, &mut NoopProgress)?;
/// assert_eq!(copied, 7);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn copy_with_progress<R, W>(
    reader: &mut R,
    writer: &mut W,
    progress: &mut dyn DownloadProgress,
) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
        progress.on_bytes(n as u64);
    }

    Ok(total)
}
