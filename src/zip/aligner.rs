//! Archive realignment.
//!
//! Rewrites an existing archive so every stored entry's payload begins at
//! an offset that is a multiple of the requested alignment, letting a
//! consumer memory-map entry data directly. Deflated entries are read
//! sequentially through a decompressor anyway, so they are copied without
//! padding.
//!
//! Padding is injected as zero bytes appended to the local header's extra
//! field; the central directory records the original extra length, so the
//! padding is invisible to directory readers. Entry payloads are copied
//! verbatim from the source.
//!
//! ## Limitation
//!
//! Re-running the aligner does not detect and strip padding inserted by a
//! previous run, so the local extra field can grow by up to `alignment - 1`
//! bytes each time. Offsets stay aligned regardless; treat the operation
//! as one-shot when the extra-field size matters.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};

use crate::io::{CountingWriter, LocalFileReader, SectionReader};

use super::parser::ZipParser;
use super::structures::{
    CompressionMethod, DATA_DESCRIPTOR_LEN, EntryHeader, FLAG_DATA_DESCRIPTOR, FLAG_UTF8_NAME,
    write_eocd,
};

/// Default alignment boundary, matching Android's zipalign
pub const DEFAULT_ALIGNMENT: u64 = 4;

/// Where an entry landed in the output stream.
struct AlignedEntry {
    /// Offset of the rewritten local header in the output
    header_offset: u64,
    /// General purpose flags written for this entry
    flags: u16,
    /// Zero bytes appended to the local extra field; nonzero only for
    /// stored entries
    padding: u64,
}

/// Rewrite `source` into `dest` with stored entries aligned to `alignment`
/// bytes (a power of two).
///
/// Entry content and order are preserved exactly; the only differences in
/// the output are the inserted padding bytes and the offset fields that
/// shift with them. Any read or write error aborts the pass and leaves
/// `dest` in an unspecified state.
pub fn align(source: &Path, dest: &Path, alignment: u64) -> Result<()> {
    ensure!(
        alignment.is_power_of_two(),
        "Alignment must be a power of two, got {}",
        alignment
    );

    let reader = Arc::new(LocalFileReader::new(source)?);
    let parser = ZipParser::new(reader.clone());
    let entries = parser.list_entries()?;
    let archive_comment = parser.archive_comment()?;

    let file = fs::File::create(dest)
        .with_context(|| format!("Unable to create archive: {}", dest.display()))?;
    let mut out = CountingWriter::new(BufWriter::new(file));

    let mut aligned = Vec::with_capacity(entries.len());
    let mut total_padding: u64 = 0;

    // Pass 1: rewrite local headers and copy raw payloads.
    for entry in &entries {
        // Bit 3 carries over from the source (a trailing data descriptor
        // follows the payload); bit 11 marks names as UTF-8.
        let mut flags = FLAG_UTF8_NAME;
        if entry.has_data_descriptor() {
            flags |= FLAG_DATA_DESCRIPTOR;
        }

        let header_offset = out.written();
        let source_data_offset = parser.data_offset(entry)?;

        // Every header this pass writes is the same size as the source
        // local header plus padding, so the entry's data would land at
        // its source offset shifted by all padding inserted so far.
        let padding = match entry.compression_method {
            CompressionMethod::Stored => {
                let new_offset = source_data_offset + total_padding;
                (alignment - (new_offset % alignment)) % alignment
            }
            _ => 0,
        };
        total_padding += padding;

        // Carry the local header's own extra field (it holds any padding
        // from a previous alignment pass) and append the new padding.
        let mut extra = parser.local_extra(entry)?;
        extra.resize(extra.len() + padding as usize, 0);

        let header = EntryHeader {
            flags,
            method: entry.compression_method.as_u16(),
            dos_time: entry.last_mod_time,
            dos_date: entry.last_mod_date,
            crc32: entry.crc32,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
            name: entry.file_name.as_bytes(),
        };
        header.write_local(&mut out, &extra)?;

        let mut size_to_copy = if entry.is_directory {
            0
        } else {
            entry.compressed_size as u64
        };
        if entry.has_data_descriptor() {
            size_to_copy += DATA_DESCRIPTOR_LEN;
        }

        if size_to_copy > 0 {
            let mut section = SectionReader::new(reader.clone(), source_data_offset, size_to_copy);
            std::io::copy(&mut section, &mut out)?;
        }

        aligned.push(AlignedEntry {
            header_offset,
            flags,
            padding,
        });
    }

    // Pass 2: rebuild the central directory. The extra length recorded
    // here excludes the padding, which lives only in the local header.
    let cd_offset = out.written();

    for (entry, placement) in entries.iter().zip(&aligned) {
        debug_assert!(placement.padding == 0 || entry.compression_method == CompressionMethod::Stored);

        let header = EntryHeader {
            flags: placement.flags,
            method: entry.compression_method.as_u16(),
            dos_time: entry.last_mod_time,
            dos_date: entry.last_mod_date,
            crc32: entry.crc32,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
            name: entry.file_name.as_bytes(),
        };
        header.write_central(
            &mut out,
            &entry.extra,
            &entry.comment,
            placement.header_offset as u32,
        )?;
    }

    let cd_size = out.written() - cd_offset;
    write_eocd(
        &mut out,
        entries.len() as u16,
        cd_size as u32,
        cd_offset as u32,
        &archive_comment,
    )?;
    out.flush()?;

    ensure!(
        dest.exists(),
        "Aligned archive was not created: {}",
        dest.display()
    );

    Ok(())
}
