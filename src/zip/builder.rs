//! Archive construction from a directory tree.
//!
//! Walks a source folder recursively and writes every file it finds into
//! a new ZIP archive. Files whose extension marks them as already-compressed
//! media are stored verbatim (so they stay memory-mappable and don't waste
//! cycles on deflate); everything else is deflated.
//!
//! Directories are traversed but never emitted as entries, matching the
//! layout Android tooling expects inside an APK.

use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result, bail, ensure};
use flate2::Compression;
use flate2::write::DeflateEncoder;

use crate::io::CountingWriter;

use super::structures::{CompressionMethod, EntryHeader, FLAG_UTF8_NAME, dos_date_time, write_eocd};

/// Chunk size for streaming source files
const READ_BUFFER: usize = 32 * 1024;

/// Extensions of formats that already carry their own compression.
///
/// Matching files are written with the store method; deflating them a
/// second time would only grow the archive.
const STORED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "wav", "mp2", "mp3", "ogg", "aac", "mpg", "mpeg", "mid", "midi",
    "smf", "jet", "rtttl", "imy", "xmf", "mp4", "m4a", "m4v", "3gp", "3gpp", "3g2", "3gpp2",
    "amr", "awb", "wma", "wmv", "webm", "mkv",
];

/// Build a new ZIP archive at `dest_file` from the contents of
/// `source_folder`.
///
/// Entry names are paths relative to `source_folder` with `/` separators.
/// Any read error on a source file aborts the build; a partially written
/// destination is left on disk and must be discarded by the caller.
pub fn build(source_folder: &Path, dest_file: &Path) -> Result<()> {
    let file = fs::File::create(dest_file)
        .with_context(|| format!("Unable to create archive: {}", dest_file.display()))?;

    let mut builder = ZipBuilder {
        writer: CountingWriter::new(BufWriter::new(file)),
        central_directory: Vec::new(),
        entry_count: 0,
    };

    builder.add_folder(source_folder, source_folder)?;
    builder.finish()?;

    ensure!(
        dest_file.exists(),
        "Archive was not created: {}",
        dest_file.display()
    );

    Ok(())
}

struct ZipBuilder<W: Write> {
    writer: CountingWriter<W>,
    central_directory: Vec<u8>,
    entry_count: u16,
}

impl<W: Write> ZipBuilder<W> {
    /// Recursively add every file under `folder`.
    ///
    /// Children are visited in name order so the same tree always
    /// produces the same archive.
    fn add_folder(&mut self, root: &Path, folder: &Path) -> Result<()> {
        let mut children: Vec<_> = fs::read_dir(folder)?.collect::<std::io::Result<_>>()?;
        children.sort_by_key(|c| c.file_name());

        for child in children {
            let path = child.path();
            if child.file_type()?.is_dir() {
                self.add_folder(root, &path)?;
            } else {
                self.add_file(root, &path)?;
            }
        }

        Ok(())
    }

    fn add_file(&mut self, root: &Path, path: &Path) -> Result<()> {
        if self.entry_count == u16::MAX {
            bail!("Too many entries for a ZIP archive without ZIP64");
        }

        let name = entry_name(root, path)?;
        let metadata = fs::metadata(path)?;
        ensure_fits_u32(metadata.len(), path)?;
        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let (dos_date, dos_time) = dos_date_time(mtime);

        let method = method_for(path);
        let mut header = EntryHeader {
            flags: FLAG_UTF8_NAME,
            method: method.as_u16(),
            dos_time,
            dos_date,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: metadata.len() as u32,
            name: name.as_bytes(),
        };

        let deflated = match method {
            CompressionMethod::Stored => {
                // Stream the file once up front so the header can carry
                // the CRC and sizes; the payload is copied verbatim after.
                header.crc32 = stream_crc32(path)?;
                header.compressed_size = header.uncompressed_size;
                None
            }
            _ => {
                let (crc32, data) = deflate_file(path)?;
                // Deflate expands incompressible input, so the compressed
                // side can exceed the field even when the source fits.
                ensure_fits_u32(data.len() as u64, path)?;
                header.crc32 = crc32;
                header.compressed_size = data.len() as u32;
                Some(data)
            }
        };

        let lfh_offset = self.writer.written() as u32;
        header.write_local(&mut self.writer, &[])?;

        match deflated {
            Some(data) => self.writer.write_all(&data)?,
            None => copy_file(path, &mut self.writer)?,
        }

        header.write_central(&mut self.central_directory, &[], &[], lfh_offset)?;
        self.entry_count += 1;

        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        let cd_offset = self.writer.written() as u32;
        self.writer.write_all(&self.central_directory)?;
        write_eocd(
            &mut self.writer,
            self.entry_count,
            self.central_directory.len() as u32,
            cd_offset,
            &[],
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Both size fields of an entry are 32 bits wide without ZIP64.
fn ensure_fits_u32(len: u64, path: &Path) -> Result<()> {
    ensure!(
        len <= u32::MAX as u64,
        "File too large for a ZIP archive without ZIP64: {}",
        path.display()
    );
    Ok(())
}

/// Pick the compression method from the file extension (case-insensitive).
fn method_for(path: &Path) -> CompressionMethod {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if STORED_EXTENSIONS.contains(&ext.as_str()) {
        CompressionMethod::Stored
    } else {
        CompressionMethod::Deflate
    }
}

/// Entry name: path relative to the source root, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("File escapes source folder: {}", path.display()))?;

    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    ensure!(name.len() <= 0xFFFF, "Entry name too long: {}", name);
    Ok(name)
}

/// CRC-32 of a file's contents, streamed in fixed-size chunks.
fn stream_crc32(path: &Path) -> Result<u32> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; READ_BUFFER];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}

/// Deflate a file into memory, returning its CRC-32 and compressed bytes.
fn deflate_file(path: &Path) -> Result<(u32, Vec<u8>)> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut hasher = crc32fast::Hasher::new();
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    let mut buf = [0u8; READ_BUFFER];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        encoder.write_all(&buf[..n])?;
    }

    Ok((hasher.finalize(), encoder.finish()?))
}

/// Copy a file's raw bytes into the archive writer.
fn copy_file<W: Write>(path: &Path, writer: &mut W) -> Result<()> {
    let mut reader = BufReader::new(fs::File::open(path)?);
    let mut buf = [0u8; READ_BUFFER];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
    }

    Ok(())
}
