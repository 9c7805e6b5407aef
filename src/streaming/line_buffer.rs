//! Reusable line reader tolerating arbitrarily long lines.

use super::buffers::{grown_capacity, DEFAULT_LINE_BUFFER};
use memchr::memchr;
use std::io::{self, BufRead};
use tracing::{error, trace};

/// Growable line buffer reused across the lines of a stream.
///
/// Starts with one page and grows by page increments whenever a line does
/// not fit, so the capacity settles on the longest line read so far. The
/// buffer holds the full line including its `\n` terminator, if any.
///
/// Read errors do not panic or propagate: the read reports no more lines
/// and the error is kept until [`LineBuffer::take_error`].
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    error: Option<io::Error>,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LINE_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity.max(2)),
            error: None,
        }
    }

    /// Read the next line from `input`.
    ///
    /// Returns false when no more lines are available or on a read error.
    /// A last line without a terminator is still returned.
    pub fn read_line<R: BufRead + ?Sized>(&mut self, input: &mut R) -> bool {
        self.buf.clear();
        loop {
            let available = match input.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("file reading error: {}", e);
                    self.error = Some(e);
                    return false;
                }
            };
            if available.is_empty() {
                return !self.buf.is_empty();
            }

            let (chunk, complete) = match memchr(b'\n', available) {
                Some(pos) => (&available[..=pos], true),
                None => (available, false),
            };
            let used = chunk.len();
            self.append(chunk);
            input.consume(used);
            if complete {
                return true;
            }
        }
    }

    /// Append bytes of the current line, growing the buffer by pages.
    fn append(&mut self, chunk: &[u8]) {
        let required = self.buf.len() + chunk.len();
        if required > self.buf.capacity() {
            let capacity = grown_capacity(self.buf.capacity(), required);
            trace!(
                "line buffer grows from {} to {} bytes",
                self.buf.capacity(),
                capacity
            );
            self.buf.reserve_exact(capacity - self.buf.len());
        }
        self.buf.extend_from_slice(chunk);
    }

    /// The current line including its terminator.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Length of the current line in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the current line is empty or holds only its terminator.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self.buf.as_slice(), [] | [b'\n'] | [b'\r', b'\n'])
    }

    /// Allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Take the read error that stopped the last read, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Clear the line and shrink the buffer back to `capacity`.
    pub fn reset(&mut self, capacity: usize) {
        self.buf = Vec::with_capacity(capacity.max(2));
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::buffers::PAGE_SIZE;
    use std::io::{BufReader, Read};

    fn read_all(content: &[u8], reader_capacity: usize) -> Vec<Vec<u8>> {
        let mut input = BufReader::with_capacity(reader_capacity, content);
        let mut line = LineBuffer::new();
        let mut lines = Vec::new();
        while line.read_line(&mut input) {
            lines.push(line.as_bytes().to_vec());
        }
        lines
    }

    #[test]
    fn test_reads_lines_with_terminators() {
        let lines = read_all(b"1 2\n\n3 4", 64);
        assert_eq!(lines, vec![b"1 2\n".to_vec(), b"\n".to_vec(), b"3 4".to_vec()]);
    }

    #[test]
    fn test_empty_input() {
        assert!(read_all(b"", 64).is_empty());
    }

    #[test]
    fn test_long_line_grows_by_pages() {
        let long: Vec<u8> = b"123 "
            .iter()
            .cycle()
            .take(3 * PAGE_SIZE + 17)
            .copied()
            .chain(*b"\n9\n")
            .collect();
        // Small reader buffer forces the line to arrive in many chunks
        let mut input = BufReader::with_capacity(100, long.as_slice());
        let mut line = LineBuffer::new();

        assert!(line.read_line(&mut input));
        assert_eq!(line.len(), 3 * PAGE_SIZE + 18);
        assert_eq!(line.as_bytes(), &long[..3 * PAGE_SIZE + 18]);
        assert!(line.capacity() >= 3 * PAGE_SIZE + 18);
        let grown = line.capacity();

        assert!(line.read_line(&mut input));
        assert_eq!(line.as_bytes(), b"9\n");
        assert_eq!(line.capacity(), grown, "no reallocation for shorter lines");
        assert!(!line.read_line(&mut input));

        line.reset(PAGE_SIZE);
        assert!(line.capacity() < grown);
    }

    #[test]
    fn test_is_empty() {
        let mut line = LineBuffer::new();
        assert!(line.is_empty());
        let mut input: &[u8] = b"\n\r\n \n";
        assert!(line.read_line(&mut input));
        assert!(line.is_empty());
        assert!(line.read_line(&mut input));
        assert!(line.is_empty());
        assert!(line.read_line(&mut input));
        assert!(!line.is_empty());
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(io::ErrorKind::Other, "disk gone"));
            }
            self.served = true;
            let data = b"1 2\n3";
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn test_read_error_is_surfaced() {
        let mut input = BufReader::new(FailingReader { served: false });
        let mut line = LineBuffer::new();

        assert!(line.read_line(&mut input));
        assert_eq!(line.as_bytes(), b"1 2\n");
        assert!(!line.read_line(&mut input));
        let err = line.take_error().unwrap();
        assert_eq!(err.to_string(), "disk gone");
        assert!(line.take_error().is_none());
    }
}
