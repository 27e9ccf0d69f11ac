//! ZIP archive engine.
//!
//! This module implements the four archive operations the rest of the
//! tooling is built on:
//!
//! - [`builder`]: build an archive from a directory tree, choosing
//!   store-vs-deflate per file
//! - [`extractor`]: materialize an archive's entries to a directory tree
//! - [`aligner`]: rewrite an archive so stored entries' data sits on
//!   aligned byte offsets
//! - [`classifier`]: determine an archive's semantic type by sniffing
//!   entry payloads
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! [`structures`] models these records and [`parser`] reads them; the
//! four operations share that substrate, so an archive produced by the
//! builder or the aligner parses with the same code that reads foreign
//! archives.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No ZIP64 (archives stay below 4 GiB / 65535 entries)
//! - No BZIP2, LZMA, or other compression methods

mod aligner;
mod builder;
mod classifier;
mod extractor;
mod parser;
mod structures;

pub use aligner::{DEFAULT_ALIGNMENT, align};
pub use builder::build;
pub use classifier::{ArchiveInfo, ArchiveKind, classify};
pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
