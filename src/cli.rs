use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "apkzip")]
#[command(version)]
#[command(about = "Build, extract, align and classify Android application archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  apkzip build res/ app.zip          pack the res/ folder into app.zip\n  \
  apkzip extract app.apk -d out/     unpack app.apk into out/\n  \
  apkzip align app.apk aligned.apk   realign stored entries to 4 bytes\n  \
  apkzip classify bundle.xapk        report the archive's semantic type")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a ZIP archive from a folder tree
    Build {
        /// Source folder to pack
        #[arg(value_name = "FOLDER")]
        folder: String,

        /// Destination archive path
        #[arg(value_name = "ZIP")]
        archive: String,
    },

    /// Extract an archive into a folder
    Extract {
        /// Archive to unpack
        #[arg(value_name = "ZIP")]
        archive: String,

        /// Extract files into exdir
        #[arg(short = 'd', value_name = "DIR")]
        extract_dir: Option<String>,
    },

    /// Rewrite an archive with stored entries aligned to a byte boundary
    Align {
        /// Archive to realign
        #[arg(value_name = "ZIP")]
        archive: String,

        /// Destination archive path
        #[arg(value_name = "OUT")]
        output: String,

        /// Alignment in bytes (power of two)
        #[arg(short = 'a', long = "alignment", value_name = "N", default_value_t = crate::zip::DEFAULT_ALIGNMENT)]
        alignment: u64,
    },

    /// Determine an archive's semantic type by sniffing entry payloads
    Classify {
        /// Archive to inspect
        #[arg(value_name = "ZIP")]
        archive: String,
    },

    /// List the entries of an archive
    List {
        /// Archive to list
        #[arg(value_name = "ZIP")]
        archive: String,

        /// List verbosely with sizes and timestamps
        #[arg(short = 'v')]
        verbose: bool,
    },
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }
}
