//! Alignment invariant tests.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use apkzip::{CompressionMethod, LocalFileReader, ReadAt, ZipExtractor, ZipParser};
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, data: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 13 % 239) as u8).collect()
}

/// A fixture archive whose stored entries land on odd offsets: names of
/// uneven length push the payloads around.
fn build_fixture(tmp: &TempDir) -> std::path::PathBuf {
    let source = tmp.path().join("source");
    let archive = tmp.path().join("app.zip");

    write_file(&source, "a.txt", &pattern(501));
    write_file(&source, "art/bg.png", &pattern(333));
    write_file(&source, "art/clip.mp3", &pattern(47));
    write_file(&source, "strings.xml", &pattern(900));
    write_file(&source, "z.gif", &pattern(128));

    apkzip::build(&source, &archive).unwrap();
    archive
}

fn parser_for(archive: &Path) -> ZipParser<LocalFileReader> {
    ZipParser::new(Arc::new(LocalFileReader::new(archive).unwrap()))
}

/// Extra-field length recorded in the local header on disk.
fn local_extra_len(archive: &Path, lfh_offset: u64) -> u16 {
    let reader = LocalFileReader::new(archive).unwrap();
    let mut fixed = [0u8; 30];
    reader.read_exact_at(lfh_offset, &mut fixed).unwrap();
    u16::from_le_bytes([fixed[28], fixed[29]])
}

#[test]
fn stored_entries_land_on_aligned_offsets() {
    let tmp = TempDir::new().unwrap();
    let archive = build_fixture(&tmp);
    let aligned = tmp.path().join("aligned.zip");

    apkzip::align(&archive, &aligned, 4).unwrap();

    let parser = parser_for(&aligned);
    let mut checked = 0;
    for entry in parser.list_entries().unwrap() {
        if entry.compression_method == CompressionMethod::Stored {
            let offset = parser.data_offset(&entry).unwrap();
            assert_eq!(offset % 4, 0, "{} at offset {}", entry.file_name, offset);
            checked += 1;
        }
    }
    assert!(checked > 0, "fixture must contain stored entries");
}

#[test]
fn deflated_entries_are_never_padded() {
    let tmp = TempDir::new().unwrap();
    let archive = build_fixture(&tmp);
    let aligned = tmp.path().join("aligned.zip");

    apkzip::align(&archive, &aligned, 4).unwrap();

    let before = parser_for(&archive).list_entries().unwrap();
    let after = parser_for(&aligned).list_entries().unwrap();

    for (src, dst) in before.iter().zip(&after) {
        assert_eq!(src.file_name, dst.file_name, "entry order must not change");
        if src.compression_method == CompressionMethod::Deflate {
            assert_eq!(
                local_extra_len(&archive, src.lfh_offset as u64),
                local_extra_len(&aligned, dst.lfh_offset as u64),
                "{}",
                src.file_name
            );
        }
    }
}

#[test]
fn aligned_archive_preserves_content() {
    let tmp = TempDir::new().unwrap();
    let archive = build_fixture(&tmp);
    let aligned = tmp.path().join("aligned.zip");

    apkzip::align(&archive, &aligned, 4).unwrap();

    let original = ZipExtractor::new(Arc::new(LocalFileReader::new(&archive).unwrap()));
    let rewritten = ZipExtractor::new(Arc::new(LocalFileReader::new(&aligned).unwrap()));

    let before = original.list_entries().unwrap();
    let after = rewritten.list_entries().unwrap();
    assert_eq!(before.len(), after.len());

    for (src, dst) in before.iter().zip(&after) {
        assert_eq!(src.file_name, dst.file_name);
        assert_eq!(src.crc32, dst.crc32);
        assert_eq!(src.compressed_size, dst.compressed_size);
        assert_eq!(
            original.read_entry(src).unwrap(),
            rewritten.read_entry(dst).unwrap(),
            "{}",
            src.file_name
        );
    }
}

#[test]
fn realignment_keeps_offsets_aligned() {
    let tmp = TempDir::new().unwrap();
    let archive = build_fixture(&tmp);
    let first = tmp.path().join("aligned1.zip");
    let second = tmp.path().join("aligned2.zip");

    apkzip::align(&archive, &first, 4).unwrap();
    apkzip::align(&first, &second, 4).unwrap();

    let parser = parser_for(&second);
    for entry in parser.list_entries().unwrap() {
        // Padding lives only in the local header; the central directory
        // copy of the extra field stays as the builder wrote it.
        assert!(entry.extra.is_empty(), "{}", entry.file_name);

        if entry.compression_method == CompressionMethod::Stored {
            let offset = parser.data_offset(&entry).unwrap();
            assert_eq!(offset % 4, 0, "{}", entry.file_name);
        }
    }
}

#[test]
fn wider_alignment_boundary() {
    let tmp = TempDir::new().unwrap();
    let archive = build_fixture(&tmp);
    let aligned = tmp.path().join("aligned.zip");

    apkzip::align(&archive, &aligned, 16).unwrap();

    let parser = parser_for(&aligned);
    for entry in parser.list_entries().unwrap() {
        if entry.compression_method == CompressionMethod::Stored {
            assert_eq!(parser.data_offset(&entry).unwrap() % 16, 0);
        }
    }
}

#[test]
fn rejects_non_power_of_two_alignment() {
    let tmp = TempDir::new().unwrap();
    let archive = build_fixture(&tmp);
    let aligned = tmp.path().join("aligned.zip");

    assert!(apkzip::align(&archive, &aligned, 3).is_err());
}

const ENTRY_COMMENT: &[u8] = b"stored upstream";
const ARCHIVE_COMMENT: &[u8] = b"aligned nightly";

/// Hand-written archive the builder never produces: a stored entry that
/// streams a 16-byte data descriptor after its payload, followed by a
/// plain stored entry, with an entry comment and an archive comment.
fn build_streamed_fixture(path: &Path) -> (Vec<u8>, Vec<u8>) {
    use apkzip::zip::{EntryHeader, FLAG_DATA_DESCRIPTOR, FLAG_UTF8_NAME, write_eocd};

    let payload = pattern(101);
    let crc = crc32_of(&payload);

    let mut descriptor = Vec::with_capacity(16);
    descriptor.extend_from_slice(b"PK\x07\x08");
    descriptor.extend_from_slice(&crc.to_le_bytes());
    descriptor.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    descriptor.extend_from_slice(&(payload.len() as u32).to_le_bytes());

    let streamed = EntryHeader {
        flags: FLAG_UTF8_NAME | FLAG_DATA_DESCRIPTOR,
        method: 0,
        dos_time: 0,
        dos_date: 0x21,
        crc32: crc,
        compressed_size: payload.len() as u32,
        uncompressed_size: payload.len() as u32,
        name: b"raw.bin",
    };

    let tail = pattern(64);
    let plain = EntryHeader {
        flags: FLAG_UTF8_NAME,
        method: 0,
        dos_time: 0,
        dos_date: 0x21,
        crc32: crc32_of(&tail),
        compressed_size: tail.len() as u32,
        uncompressed_size: tail.len() as u32,
        name: b"tail.bin",
    };

    let mut image = Vec::new();
    streamed.write_local(&mut image, &[]).unwrap();
    image.extend_from_slice(&payload);
    image.extend_from_slice(&descriptor);
    let plain_offset = image.len() as u32;
    plain.write_local(&mut image, &[]).unwrap();
    image.extend_from_slice(&tail);

    let cd_offset = image.len() as u32;
    let mut cd_size = streamed.write_central(&mut image, &[], ENTRY_COMMENT, 0).unwrap();
    cd_size += plain.write_central(&mut image, &[], &[], plain_offset).unwrap();
    write_eocd(&mut image, 2, cd_size as u32, cd_offset, ARCHIVE_COMMENT).unwrap();

    fs::write(path, &image).unwrap();
    (payload, descriptor)
}

#[test]
fn data_descriptor_trailer_survives_alignment() {
    use apkzip::zip::FLAG_DATA_DESCRIPTOR;

    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("streamed.zip");
    let aligned = tmp.path().join("aligned.zip");
    let (payload, descriptor) = build_streamed_fixture(&archive);

    apkzip::align(&archive, &aligned, 4).unwrap();

    let parser = parser_for(&aligned);
    let entries = parser.list_entries().unwrap();
    assert_eq!(entries.len(), 2);

    let streamed = &entries[0];
    assert_eq!(streamed.file_name, "raw.bin");
    assert_ne!(streamed.flags & FLAG_DATA_DESCRIPTOR, 0);

    let offset = parser.data_offset(streamed).unwrap();
    assert_eq!(offset % 4, 0);

    let reader = LocalFileReader::new(&aligned).unwrap();
    let mut data = vec![0u8; payload.len()];
    reader.read_exact_at(offset, &mut data).unwrap();
    assert_eq!(data, payload);

    // The 16 descriptor bytes sit between the payload and the next
    // local header, exactly as in the source.
    let mut trailer = [0u8; 16];
    reader
        .read_exact_at(offset + payload.len() as u64, &mut trailer)
        .unwrap();
    assert_eq!(trailer, descriptor[..]);

    let tail = &entries[1];
    assert_eq!(tail.file_name, "tail.bin");
    assert_eq!(tail.flags & FLAG_DATA_DESCRIPTOR, 0);
    assert_eq!(parser.data_offset(tail).unwrap() % 4, 0);

    let mut tail_data = vec![0u8; tail.compressed_size as usize];
    reader
        .read_exact_at(parser.data_offset(tail).unwrap(), &mut tail_data)
        .unwrap();
    assert_eq!(tail_data, pattern(64));
}

#[test]
fn comments_survive_alignment() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("streamed.zip");
    let aligned = tmp.path().join("aligned.zip");
    build_streamed_fixture(&archive);

    apkzip::align(&archive, &aligned, 4).unwrap();

    let parser = parser_for(&aligned);
    let entries = parser.list_entries().unwrap();
    assert_eq!(entries[0].comment, ENTRY_COMMENT);
    assert!(entries[1].comment.is_empty());
    assert_eq!(parser.archive_comment().unwrap(), ARCHIVE_COMMENT);
}

fn crc32_of(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
