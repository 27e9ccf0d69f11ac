//! # apkzip
//!
//! A zip container engine for Android application archives.
//!
//! This library provides the exact binary-format plumbing an APK pipeline
//! needs and nothing else: building an archive from a directory tree with
//! format-aware compression choices, extracting one, realigning stored
//! entries' data to page-friendly offsets byte-for-byte, and classifying
//! an arbitrary archive by sniffing entry payloads.
//!
//! ## Features
//!
//! - Build ZIP archives from folder trees (media files stored, the rest
//!   deflated)
//! - Extract archives to folder trees
//! - Align stored entries to a byte boundary (zipalign-compatible output)
//! - Classify zip/apk files as Apk, XApk or Unknown from entry bytes
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use apkzip::{LocalFileReader, ZipExtractor};
//!
//! fn main() -> anyhow::Result<()> {
//!     // Open an archive
//!     let reader = Arc::new(LocalFileReader::new(Path::new("app.apk"))?);
//!
//!     // Create an extractor
//!     let extractor = ZipExtractor::new(reader);
//!
//!     // List all entries in the archive
//!     for entry in extractor.list_entries()? {
//!         println!("{}", entry.file_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use io::{CountingWriter, LocalFileReader, ReadAt, SectionReader};
pub use zip::{
    ArchiveInfo, ArchiveKind, CompressionMethod, DEFAULT_ALIGNMENT, ZipExtractor, ZipFileEntry,
    ZipParser, align, build, classify,
};
