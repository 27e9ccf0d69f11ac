mod local;

pub use local::LocalFileReader;

use anyhow::Result;
use std::io::Read;
use std::sync::Arc;

/// Trait for random access reading from a data source
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Fill the buffer completely from the specified offset
    fn read_exact_at(&self, mut offset: u64, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            let n = self.read_at(offset, buf)?;
            if n == 0 {
                anyhow::bail!("Unexpected end of file at offset {}", offset);
            }
            offset += n as u64;
            buf = &mut buf[n..];
        }
        Ok(())
    }

    /// Get the total size of the data source
    fn size(&self) -> u64;
}

/// A bounded [`Read`] view over a span of a [`ReadAt`] source.
///
/// Used to stream an entry's compressed payload into a decompressor
/// without loading the whole span into memory.
pub struct SectionReader<R: ReadAt> {
    reader: Arc<R>,
    offset: u64,
    remaining: u64,
}

impl<R: ReadAt> SectionReader<R> {
    pub fn new(reader: Arc<R>, offset: u64, len: u64) -> Self {
        Self {
            reader,
            offset,
            remaining: len,
        }
    }
}

impl<R: ReadAt> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let want = buf.len().min(self.remaining as usize);
        let n = self
            .reader
            .read_at(self.offset, &mut buf[..want])
            .map_err(std::io::Error::other)?;
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// A [`Write`] adapter that tracks the total number of bytes written.
///
/// Archive writers use the running count as the authoritative source of
/// header offsets in the output stream.
pub struct CountingWriter<W: std::io::Write> {
    inner: W,
    written: u64,
}

impl<W: std::io::Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total bytes written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl<W: std::io::Write> std::io::Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
