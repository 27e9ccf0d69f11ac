//! Main entry point for the apkzip CLI application.
//!
//! This binary exposes the archive engine's four operations as
//! subcommands: build, extract, align and classify, plus a list mode
//! for inspecting archive contents.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use apkzip::{ArchiveKind, Cli, LocalFileReader, ZipExtractor};
use apkzip::cli::Command;

/// Application entry point.
///
/// Parses command-line arguments and dispatches to the handler for the
/// requested operation.
fn main() -> Result<()> {
    let cli = Cli::parse();
    let quiet = cli.is_quiet();

    match cli.command {
        Command::Build { folder, archive } => {
            apkzip::build(Path::new(&folder), Path::new(&archive))?;
            if !quiet {
                println!("  created: {}", archive);
            }
        }

        Command::Extract {
            archive,
            extract_dir,
        } => {
            let out_dir = extract_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
            let reader = Arc::new(LocalFileReader::new(Path::new(&archive))?);
            let extractor = ZipExtractor::new(reader);

            let extracted = extractor.extract_all(&out_dir)?;
            if !quiet {
                for path in &extracted {
                    println!("  extracting: {}", path.display());
                }
                println!("{} files extracted", extracted.len());
            }
        }

        Command::Align {
            archive,
            output,
            alignment,
        } => {
            apkzip::align(Path::new(&archive), Path::new(&output), alignment)?;
            if !quiet {
                println!("  aligned: {} ({}-byte boundary)", output, alignment);
            }
        }

        Command::Classify { archive } => {
            let info = apkzip::classify(Path::new(&archive));
            let kind = match info.kind {
                ArchiveKind::Apk => "apk",
                ArchiveKind::XApk => "xapk",
                ArchiveKind::Unknown => "unknown",
            };
            println!("{}", kind);
            if !quiet {
                for name in &info.nested_zip_entries {
                    println!("  nested zip: {}", name);
                }
            }
        }

        Command::List { archive, verbose } => {
            let reader = Arc::new(LocalFileReader::new(Path::new(&archive))?);
            let extractor = ZipExtractor::new(reader);
            list_entries(&extractor, verbose)?;
        }
    }

    Ok(())
}

/// List entries of an archive.
///
/// Supports two output formats:
/// - Simple format: just entry names, one per line
/// - Verbose format (`-v`): detailed table with size, compression ratio,
///   and timestamps
fn list_entries<R: apkzip::ReadAt + 'static>(
    extractor: &ZipExtractor<R>,
    verbose: bool,
) -> Result<()> {
    let entries = extractor.list_entries()?;

    if verbose {
        // Print table header for verbose output
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    // Track totals for summary line
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        if verbose {
            // Parse DOS timestamp into human-readable format
            let (year, month, day) = entry.mod_date();
            let (hour, minute, _second) = entry.mod_time();

            // Calculate compression ratio as percentage saved
            let ratio = compression_ratio(
                entry.compressed_size as u64,
                entry.uncompressed_size as u64,
            );

            // Print detailed entry information
            println!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
                entry.uncompressed_size,
                entry.compressed_size,
                ratio,
                year,
                month,
                day,
                hour,
                minute,
                entry.file_name
            );

            // Accumulate totals (excluding directories)
            if !entry.is_directory {
                total_uncompressed += entry.uncompressed_size as u64;
                total_compressed += entry.compressed_size as u64;
                file_count += 1;
            }
        } else {
            // Simple format: just the entry name
            println!("{}", entry.file_name);
        }
    }

    // Print summary line in verbose mode
    if verbose {
        println!("{}", "-".repeat(70));
        let total_ratio = compression_ratio(total_compressed, total_uncompressed);
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed, total_compressed, total_ratio, "", file_count
        );
    }

    Ok(())
}

/// Format the percentage saved by compression.
///
/// Deflate can expand small or already-compressed payloads past their
/// original size, so the ratio is computed signed and shows up negative
/// instead of wrapping.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(compression_ratio(50, 100), "  50%");
/// assert_eq!(compression_ratio(105, 100), "  -5%");
/// ```
fn compression_ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 {
        return "  0%".to_string();
    }
    format!(
        "{:>4}%",
        100i64 - (compressed as i64 * 100 / uncompressed as i64)
    )
}

#[cfg(test)]
mod tests {
    use super::compression_ratio;

    #[test]
    fn ratio_of_compressed_entry() {
        assert_eq!(compression_ratio(50, 100), "  50%");
    }

    #[test]
    fn ratio_of_empty_entry() {
        assert_eq!(compression_ratio(0, 0), "  0%");
    }

    #[test]
    fn ratio_of_expanded_entry_goes_negative() {
        // A 100-byte incompressible payload picks up deflate's stored-block
        // overhead and ends up larger than its source.
        assert_eq!(compression_ratio(105, 100), "  -5%");
        assert_eq!(compression_ratio(101, 100), "  -1%");
    }
}
