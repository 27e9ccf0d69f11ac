//! Archive classification by payload sniffing.
//!
//! Decides whether an arbitrary zip/apk file is a single application
//! package, a bundle of nested packages, or neither. Detection reads the
//! actual decompressed bytes of each entry rather than trusting file
//! extensions: a renamed archive classifies exactly like the original.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use flate2::read::DeflateDecoder;

use crate::io::{LocalFileReader, ReadAt, SectionReader};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, LFH_SIGNATURE, ZipFileEntry};

/// Android manifest filename that marks an application package
const MANIFEST_NAME: &str = "AndroidManifest.xml";

/// Platform bytecode extension that marks an application package
const BYTECODE_EXTENSION: &str = ".dex";

/// Semantic type of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// A single application package (manifest or bytecode present)
    Apk,
    /// A bundle whose entries are themselves zip archives
    XApk,
    /// Anything else, including unreadable files
    Unknown,
}

/// Result of classifying an archive
#[derive(Debug)]
pub struct ArchiveInfo {
    pub kind: ArchiveKind,
    /// Names of entries whose payload begins with the zip magic
    pub nested_zip_entries: Vec<String>,
}

/// Classify the file at `path`.
///
/// Never fails: any internal error (missing file, corrupt archive,
/// undecodable entry) collapses to [`ArchiveKind::Unknown`] with no
/// nested entries.
pub fn classify(path: &Path) -> ArchiveInfo {
    scan(path).unwrap_or(ArchiveInfo {
        kind: ArchiveKind::Unknown,
        nested_zip_entries: Vec::new(),
    })
}

fn scan(path: &Path) -> Result<ArchiveInfo> {
    let reader = Arc::new(LocalFileReader::new(path)?);
    let parser = ZipParser::new(reader.clone());
    let entries = parser.list_entries()?;

    let mut kind = None;
    let mut nested_zip_entries = Vec::new();

    for entry in &entries {
        if entry.is_directory {
            continue;
        }

        // First manifest or bytecode entry settles the type; the scan
        // still continues to collect nested archives.
        if kind.is_none()
            && (entry.file_name == MANIFEST_NAME || entry.file_name.ends_with(BYTECODE_EXTENSION))
        {
            kind = Some(ArchiveKind::Apk);
        }

        if sniff_zip_magic(&parser, entry)? {
            nested_zip_entries.push(entry.file_name.clone());
        }
    }

    let kind = match kind {
        Some(kind) => kind,
        None if !nested_zip_entries.is_empty() => ArchiveKind::XApk,
        None => ArchiveKind::Unknown,
    };

    Ok(ArchiveInfo {
        kind,
        nested_zip_entries,
    })
}

/// Check whether an entry's first 4 decompressed bytes are the local
/// file header magic `PK\x03\x04`.
fn sniff_zip_magic<R: ReadAt>(parser: &ZipParser<R>, entry: &ZipFileEntry) -> Result<bool> {
    if entry.uncompressed_size < 4 {
        return Ok(false);
    }

    let offset = parser.data_offset(entry)?;
    let section = SectionReader::new(
        parser.reader().clone(),
        offset,
        entry.compressed_size as u64,
    );

    let mut header = [0u8; 4];
    match entry.compression_method {
        CompressionMethod::Stored => read_prefix(section, &mut header)?,
        CompressionMethod::Deflate => read_prefix(DeflateDecoder::new(section), &mut header)?,
        // Undecodable payload: cannot be identified as a nested archive
        CompressionMethod::Unknown(_) => return Ok(false),
    }

    Ok(&header[..] == LFH_SIGNATURE)
}

/// Fill `buf` from the start of `input`, tolerating short reads.
fn read_prefix<I: Read>(mut input: I, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(())
}
