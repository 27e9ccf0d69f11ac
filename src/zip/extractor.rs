use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::io::{ReadAt, SectionReader};
use anyhow::{Result, bail, ensure};
use flate2::read::DeflateDecoder;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Chunk size for streaming entry payloads to disk
const COPY_BUFFER: usize = 8 * 1024;

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub fn list_entries(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_entries()
    }

    /// Extract every entry into `output_folder`.
    ///
    /// Directory entries only create directories. File entries are
    /// streamed to disk in fixed-size chunks and their destination
    /// paths collected in entry encounter order.
    ///
    /// A malformed entry aborts the whole extraction; files already
    /// written stay where they are.
    pub fn extract_all(&self, output_folder: &Path) -> Result<Vec<PathBuf>> {
        let entries = self.parser.list_entries()?;
        let mut extracted = Vec::new();

        for entry in &entries {
            // Entry names come from the archive; a ".." component would
            // place the file outside the destination folder.
            ensure!(
                !Path::new(&entry.file_name)
                    .components()
                    .any(|c| matches!(c, Component::ParentDir)),
                "Entry name escapes destination folder: {}",
                entry.file_name
            );

            let dest = output_folder.join(&entry.file_name);

            if entry.is_directory {
                fs::create_dir_all(&dest)?;
                continue;
            }

            self.extract_to_file(entry, &dest)?;
            extracted.push(dest);
        }

        Ok(extracted)
    }

    /// Extract a single entry to `output_path`, creating parent
    /// directories as needed.
    pub fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = fs::File::create(output_path)?;
        let mut writer = BufWriter::new(file);
        self.copy_entry(entry, &mut writer)?;
        writer.flush()?;

        Ok(())
    }

    /// Extract entry data to memory
    pub fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(entry.uncompressed_size as usize);
        self.copy_entry(entry, &mut data)?;
        Ok(data)
    }

    /// Decompress an entry's payload into `writer`.
    fn copy_entry<W: Write>(&self, entry: &ZipFileEntry, writer: &mut W) -> Result<()> {
        let offset = self.parser.data_offset(entry)?;
        let section = SectionReader::new(
            self.parser.reader().clone(),
            offset,
            entry.compressed_size as u64,
        );

        match entry.compression_method {
            CompressionMethod::Stored => copy_chunked(section, writer),
            CompressionMethod::Deflate => copy_chunked(DeflateDecoder::new(section), writer),
            CompressionMethod::Unknown(v) => {
                bail!("Unsupported compression method: {}", v)
            }
        }
    }
}

/// Copy a stream in fixed-size chunks.
fn copy_chunked<I: Read, W: Write>(mut input: I, writer: &mut W) -> Result<()> {
    let mut buf = [0u8; COPY_BUFFER];
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
    }
    Ok(())
}
