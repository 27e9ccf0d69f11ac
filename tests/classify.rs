//! Archive classification tests.

use std::fs;
use std::path::{Path, PathBuf};

use apkzip::ArchiveKind;
use tempfile::TempDir;

fn write_file(root: &Path, relative: &str, data: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

/// Build an archive at `name` from the given (relative path, data) pairs.
fn build_archive(tmp: &TempDir, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
    let source = tmp.path().join(format!("{name}-source"));
    let archive = tmp.path().join(name);

    for (relative, data) in files {
        write_file(&source, relative, data);
    }

    apkzip::build(&source, &archive).unwrap();
    archive
}

#[test]
fn manifest_marks_apk() {
    let tmp = TempDir::new().unwrap();
    let archive = build_archive(
        &tmp,
        "app.apk",
        &[
            ("AndroidManifest.xml", b"<manifest/>"),
            ("res/values.xml", b"<resources/>"),
        ],
    );

    let info = apkzip::classify(&archive);
    assert_eq!(info.kind, ArchiveKind::Apk);
}

#[test]
fn bytecode_marks_apk() {
    let tmp = TempDir::new().unwrap();
    let archive = build_archive(&tmp, "app.apk", &[("classes.dex", b"dex\n035\x00 payload")]);

    let info = apkzip::classify(&archive);
    assert_eq!(info.kind, ArchiveKind::Apk);
}

#[test]
fn nested_archives_mark_xapk() {
    let tmp = TempDir::new().unwrap();

    // The nested payload goes through deflate inside the outer archive,
    // so this also exercises the decompressing sniff path.
    let inner = build_archive(&tmp, "inner.zip", &[("hello.txt", b"hello world")]);
    let inner_bytes = fs::read(&inner).unwrap();

    let archive = build_archive(
        &tmp,
        "bundle.xapk",
        &[
            ("base.zip", inner_bytes.as_slice()),
            ("notes.txt", b"not an archive"),
        ],
    );

    let info = apkzip::classify(&archive);
    assert_eq!(info.kind, ArchiveKind::XApk);
    assert_eq!(info.nested_zip_entries, ["base.zip"]);
}

#[test]
fn manifest_wins_over_nested_archives() {
    let tmp = TempDir::new().unwrap();

    let inner = build_archive(&tmp, "inner.zip", &[("hello.txt", b"hello world")]);
    let inner_bytes = fs::read(&inner).unwrap();

    let archive = build_archive(
        &tmp,
        "app.apk",
        &[
            ("AndroidManifest.xml", b"<manifest/>"),
            ("assets/pack.zip", inner_bytes.as_slice()),
        ],
    );

    let info = apkzip::classify(&archive);
    assert_eq!(info.kind, ArchiveKind::Apk);
    // The scan still collects nested archives after the type is settled
    assert_eq!(info.nested_zip_entries, ["assets/pack.zip"]);
}

#[test]
fn plain_archive_is_unknown() {
    let tmp = TempDir::new().unwrap();
    let archive = build_archive(
        &tmp,
        "docs.zip",
        &[("readme.txt", b"readme"), ("guide.txt", b"guide")],
    );

    let info = apkzip::classify(&archive);
    assert_eq!(info.kind, ArchiveKind::Unknown);
    assert!(info.nested_zip_entries.is_empty());
}

#[test]
fn garbage_file_is_unknown_without_error() {
    let tmp = TempDir::new().unwrap();
    let garbage = tmp.path().join("garbage.bin");
    fs::write(&garbage, b"this is not a zip file at all").unwrap();

    let info = apkzip::classify(&garbage);
    assert_eq!(info.kind, ArchiveKind::Unknown);
    assert!(info.nested_zip_entries.is_empty());
}

#[test]
fn missing_file_is_unknown_without_error() {
    let tmp = TempDir::new().unwrap();

    let info = apkzip::classify(&tmp.path().join("no-such-file.apk"));
    assert_eq!(info.kind, ArchiveKind::Unknown);
    assert!(info.nested_zip_entries.is_empty());
}
