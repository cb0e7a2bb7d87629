//! Counting writer for measuring compressed payload sizes.

use std::io::Write;

/// Wrapper writer that tracks total bytes successfully written.
///
/// The archive writer wraps its destination in one of these per payload
/// to learn the compressed size of each file after the DEFLATE encoder
/// finishes. The counter only reflects bytes the inner writer accepted;
/// a write that fails partway counts only what succeeded.
///
/// # Examples
///
/// ```
/// use dnpak_core::io::CountingWriter;
/// use std::io::Write;
///
/// let mut buffer = Vec::new();
/// let mut writer = CountingWriter::new(&mut buffer);
/// writer.write_all(b"payload")?;
/// assert_eq!(writer.total_bytes(), 7);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    bytes_written: u64,
}

impl<W> CountingWriter<W> {
    /// Creates a counting writer around `inner` with a zeroed counter.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Total bytes successfully written so far.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.bytes_written
    }

    /// Consumes the wrapper and returns the inner writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
