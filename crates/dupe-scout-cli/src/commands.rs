use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dupe-scout")]
#[command(about = "Find duplicate files and folders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory tree for duplicate files and folders
    Scan {
        /// Root directory to scan
        root: PathBuf,
        /// Number of worker threads (0 = auto-detect)
        #[arg(long, default_value_t = 0)]
        cpu_cores: i32,
        /// Only group files that share both size and filename
        #[arg(long)]
        filter_by_filename: bool,
        /// Emit the full report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    PrintConfig,
}
