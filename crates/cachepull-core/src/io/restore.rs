//! Forward-only reader with a one-shot rewind of speculatively read bytes.
//!
//! Network bodies and process pipes cannot seek. Format detection still has
//! to try a decoder first and fall back to raw bytes when the decoder
//! rejects the input, so every byte read during the attempt is recorded and
//! can be replayed exactly once.

use std::io::Read;
use std::io::{self};

#[derive(Debug)]
enum Phase {
    /// Reads are forwarded and recorded.
    Recording,
    /// Recorded bytes are served from `pos` before the inner reader resumes.
    Replaying { pos: usize },
    /// Replay finished or the caller committed; reads go straight through.
    Passthrough,
}

/// Reader wrapper that can replay what it has read once.
///
/// While recording, every byte handed out is kept in an internal buffer.
/// [`restore`](Self::restore) makes the next reads return the recorded bytes
/// followed by the rest of the inner reader, as if nothing had been consumed.
/// [`commit`](Self::commit) drops the recording once the caller settled on
/// a decoding path. Only bytes actually read are buffered, never the whole
/// payload.
///
/// # Examples
///
/// ```
/// use cachepull_core::io::RestorableReader;
/// use std::io::Read;
///
/// let mut reader = RestorableReader::new(&b"hello world"[..]);
/// let mut probe = [0u8; 5];
/// reader.read_exact(&mut probe)?;
/// assert_eq!(&probe, b"hello");
///
/// reader.restore();
/// let mut all = String::new();
/// reader.read_to_string(&mut all)?;
/// assert_eq!(all, "hello world");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct RestorableReader<R> {
    inner: R,
    recorded: Vec<u8>,
    phase: Phase,
}

impl<R> RestorableReader<R> {
    /// Wraps `inner` and starts recording.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
            phase: Phase::Recording,
        }
    }

    /// Rewinds to the first byte ever read from this reader.
    ///
    /// # Panics
    ///
    /// Panics when called a second time or after [`commit`](Self::commit).
    /// Both are programming errors: the recording is gone at that point.
    pub fn restore(&mut self) {
        assert!(
            matches!(self.phase, Phase::Recording),
            "RestorableReader::restore called after restore or commit"
        );
        self.phase = if self.recorded.is_empty() {
            Phase::Passthrough
        } else {
            Phase::Replaying { pos: 0 }
        };
    }

    /// Stops recording and releases the buffered bytes.
    ///
    /// Calling this while replaying is allowed: the bytes not yet replayed
    /// are still served before the inner reader resumes.
    pub fn commit(&mut self) {
        if matches!(self.phase, Phase::Recording) {
            self.recorded = Vec::new();
            self.phase = Phase::Passthrough;
        }
    }

    /// Returns `true` while reads are still being recorded.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self.phase, Phase::Recording)
    }

    /// Number of bytes currently held for replay.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        match self.phase {
            Phase::Recording => self.recorded.len(),
            Phase::Replaying { pos } => self.recorded.len() - pos,
            Phase::Passthrough => 0,
        }
    }

    /// Returns a reference to the wrapped reader.
    #[must_use]
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consumes the wrapper and returns the inner reader.
    ///
    /// Recorded bytes that were not replayed are lost.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for RestorableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.phase {
            Phase::Recording => {
                let n = self.inner.read(buf)?;
                self.recorded.extend_from_slice(&buf[..n]);
                Ok(n)
            }
            Phase::Replaying { pos } => {
                if buf.is_empty() {
                    return Ok(0);
                }
                let pending = &self.recorded[pos..];
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                let pos = pos + n;
                if pos == self.recorded.len() {
                    self.recorded = Vec::new();
                    self.phase = Phase::Passthrough;
                } else {
                    self.phase = Phase::Replaying { pos };
                }
                Ok(n)
            }
            Phase::Passthrough => self.inner.read(buf),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Reader that hands out at most `chunk` bytes per call and can never
    /// be rewound.
    struct TrickleReader {
        data: Vec<u8>,
        position: usize,
        chunk: usize,
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let remaining = self.data.len() - self.position;
            let n = remaining.min(buf.len()).min(self.chunk);
            buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
            self.position += n;
            Ok(n)
        }
    }

    fn trickle(data: &[u8], chunk: usize) -> TrickleReader {
        TrickleReader {
            data: data.to_vec(),
            position: 0,
            chunk,
        }
    }

    #[test]
    fn test_restore_replays_partial_prefix() {
        let mut reader = RestorableReader::new(trickle(b"0123456789", 3));
        let mut probe = [0u8; 4];
        reader.read_exact(&mut probe).unwrap();
        assert_eq!(&probe, b"0123");
        assert_eq!(reader.buffered_len(), 4);

        reader.restore();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123456789");
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn test_restore_without_reads() {
        let mut reader = RestorableReader::new(&b"abc"[..]);
        reader.restore();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_restore_after_full_consumption() {
        let mut reader = RestorableReader::new(&b"abc"[..]);
        let mut first = Vec::new();
        reader.read_to_end(&mut first).unwrap();

        reader.restore();
        let mut second = Vec::new();
        reader.read_to_end(&mut second).unwrap();
        assert_eq!(second, b"abc");
    }

    #[test]
    fn test_replay_into_small_buffers() {
        let mut reader = RestorableReader::new(&b"abcdef"[..]);
        let mut probe = [0u8; 5];
        reader.read_exact(&mut probe).unwrap();
        reader.restore();

        let mut one = [0u8; 1];
        let mut collected = Vec::new();
        while reader.read(&mut one).unwrap() == 1 {
            collected.push(one[0]);
        }
        assert_eq!(collected, b"abcdef");
    }

    #[test]
    fn test_commit_drops_recording() {
        let mut reader = RestorableReader::new(&b"abcdef"[..]);
        let mut probe = [0u8; 3];
        reader.read_exact(&mut probe).unwrap();
        reader.commit();
        assert!(!reader.is_recording());
        assert_eq!(reader.buffered_len(), 0);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"def");
    }

    #[test]
    fn test_commit_while_replaying_keeps_pending_bytes() {
        let mut reader = RestorableReader::new(&b"abcdef"[..]);
        let mut probe = [0u8; 4];
        reader.read_exact(&mut probe).unwrap();
        reader.restore();
        reader.commit();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdef");
    }

    #[test]
    #[should_panic(expected = "after restore or commit")]
    fn test_double_restore_panics() {
        let mut reader = RestorableReader::new(&b"abc"[..]);
        reader.restore();
        reader.restore();
    }

    #[test]
    #[should_panic(expected = "after restore or commit")]
    fn test_restore_after_commit_panics() {
        let mut reader = RestorableReader::new(&b"abc"[..]);
        reader.commit();
        reader.restore();
    }
}
