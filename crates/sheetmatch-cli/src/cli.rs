//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sheetmatch - find records shared between two spreadsheets
#[derive(Parser, Debug)]
#[command(name = "sheetmatch")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SHEETMATCH_CONFIG")]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web UI
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// List the sheets and columns of a workbook
    Sheets {
        /// Workbook to inspect
        file: PathBuf,
        /// Zero-based header row (overrides compare.header_row)
        #[arg(long)]
        header_row: Option<usize>,
    },

    /// Find records of FILE1 whose ID appears in FILE2
    Compare(CompareArgs),

    /// Configuration management
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `sheetmatch compare`.
#[derive(clap::Args, Debug, Clone)]
pub struct CompareArgs {
    /// File searched for duplicates (e.g. a waiting list)
    pub file1: PathBuf,
    /// Lookup file (e.g. residential allocations)
    pub file2: PathBuf,

    /// ID column of FILE1 [default: its first column]
    #[arg(long)]
    pub id1: Option<String>,
    /// ID column of FILE2 [default: its first column]
    #[arg(long)]
    pub id2: Option<String>,

    /// Sheets of FILE1 to load [default: the first sheet]
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub sheets1: Vec<String>,
    /// Sheets of FILE2 to load [default: all sheets]
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub sheets2: Vec<String>,

    /// Rows of FILE1 per progress step (overrides compare.chunk_size)
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Zero-based header row (overrides compare.header_row)
    #[arg(long)]
    pub header_row: Option<usize>,

    /// Report path, or `-` for stdout
    #[arg(short, long, default_value = sheetmatch_core::REPORT_FILE_NAME)]
    pub output: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Get a value by dotted key (e.g. server.port)
    Get {
        /// Dotted key
        key: String,
    },
    /// Set a value by dotted key
    Set {
        /// Dotted key
        key: String,
        /// New value
        value: String,
    },
    /// Write a default config file
    Init {
        /// Where to write it [default: the resolved config path]
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}
