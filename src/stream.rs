//! Chunked byte reader over a (typically gzip-compressed) ITCH feed file.
//!
//! Grounded on the original parser's `PartialReadBuffer`: rather than reading
//! one `read()` call per requested length, bytes are pulled in fixed-size
//! chunks into an internal buffer and handed out from there. This keeps
//! small, frequent `read_exact` calls (a 2-byte length prefix, then a body of
//! a few dozen bytes) from turning into one syscall each, and gives us a
//! natural place to track the diagnostics `DecodeError` needs: the absolute
//! offset into the stream and the sizes of the last few chunk reads.

use std::io::{self, Read};

use crate::error::DecodeError;

const DEFAULT_CHUNK_SIZE: usize = 5000;
const LAST_READS_KEPT: usize = 3;

/// A buffered, diagnostic-tracking wrapper over any [`Read`].
pub struct ByteStream<R> {
    inner: R,
    chunk_size: usize,
    buf: Vec<u8>,
    pos: usize,
    offset: u64,
    last_reads: std::collections::VecDeque<usize>,
    eof: bool,
}

impl<R: Read> ByteStream<R> {
    pub fn new(inner: R) -> Self {
        Self::with_chunk_size(inner, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        ByteStream {
            inner,
            chunk_size,
            buf: Vec::new(),
            pos: 0,
            offset: 0,
            last_reads: std::collections::VecDeque::with_capacity(LAST_READS_KEPT),
            eof: false,
        }
    }

    /// Absolute number of bytes consumed from this stream so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The sizes (in bytes) of the last few underlying chunk reads, most
    /// recent last. Used to annotate [`DecodeError`] when a frame runs past
    /// the end of the file.
    pub fn last_reads(&self) -> Vec<usize> {
        self.last_reads.iter().copied().collect()
    }

    fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn fill_until(&mut self, n: usize) -> io::Result<()> {
        while self.available() < n && !self.eof {
            if self.pos > 0 {
                self.buf.drain(..self.pos);
                self.pos = 0;
            }
            let want = self.chunk_size.max(n - self.available());
            let start = self.buf.len();
            self.buf.resize(start + want, 0);
            let read = read_fill(&mut self.inner, &mut self.buf[start..])?;
            self.buf.truncate(start + read);
            if self.last_reads.len() == LAST_READS_KEPT {
                self.last_reads.pop_front();
            }
            self.last_reads.push_back(read);
            if read == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }

    /// Read exactly `n` bytes, or return a [`DecodeError::Truncated`] if the
    /// stream ends first.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, DecodeError> {
        self.fill_until(n)?;
        if self.available() < n {
            let got = self.available();
            return Err(DecodeError::Truncated {
                offset: self.offset,
                expected: n,
                got,
                last_reads: self.last_reads(),
            });
        }
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        self.offset += n as u64;
        Ok(out)
    }

    /// True once the stream has been drained and no further bytes remain.
    pub fn is_exhausted(&mut self) -> io::Result<bool> {
        self.fill_until(1)?;
        Ok(self.available() == 0)
    }
}

/// Reads into `buf` until it is full or the underlying reader reaches EOF,
/// returning the number of bytes actually filled (short reads from `Read`
/// impls that don't fill in one call are common with `GzDecoder`).
fn read_fill<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_exact_spanning_multiple_chunks() {
        let data: Vec<u8> = (0..20u8).collect();
        let mut s = ByteStream::with_chunk_size(&data[..], 3);
        assert_eq!(s.read_exact(5).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(s.read_exact(5).unwrap(), vec![5, 6, 7, 8, 9]);
        assert_eq!(s.offset(), 10);
    }

    #[test]
    fn truncated_read_reports_offset_and_last_reads() {
        let data = vec![1u8, 2, 3];
        let mut s = ByteStream::with_chunk_size(&data[..], 2);
        let err = s.read_exact(10).unwrap_err();
        match err {
            DecodeError::Truncated {
                offset,
                expected,
                got,
                ..
            } => {
                assert_eq!(offset, 0);
                assert_eq!(expected, 10);
                assert_eq!(got, 3);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn exhaustion_detection() {
        let data = vec![1u8, 2];
        let mut s = ByteStream::with_chunk_size(&data[..], 4);
        assert!(!s.is_exhausted().unwrap());
        let _ = s.read_exact(2).unwrap();
        assert!(s.is_exhausted().unwrap());
    }
}
