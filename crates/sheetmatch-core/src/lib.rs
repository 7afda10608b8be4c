//! Sheetmatch core: tables, workbook loading, and the duplicate finder.
//!
//! This crate holds everything that does not depend on a front end. Both the
//! HTTP server and the command-line tool are thin layers over it.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`table`]: In-memory tables and cell values
//! - [`ids`]: ID standardisation
//! - [`workbook`]: Opening uploads and loading selected sheets
//! - [`compare`]: The chunked duplicate finder
//! - [`report`]: CSV report output
//! - [`job`]: Observable job state for long-running comparisons
//! - [`config`]: Configuration file and defaults

pub mod compare;
pub mod config;
pub mod error;
pub mod ids;
pub mod job;
pub mod report;
pub mod table;
pub mod workbook;

#[cfg(test)]
mod proptests;

// Re-export key types at crate root for convenience
pub use compare::{find_duplicates, CompareOptions, Comparison, NoProgress, ProgressSink};
pub use config::SheetmatchConfig;
pub use error::{Error, Result};
pub use ids::standardize_id;
pub use job::{JobHandle, JobState};
pub use report::{write_csv, REPORT_FILE_NAME, REPORT_MIME};
pub use table::{CellValue, Table};
pub use workbook::{LoadedTable, Notice, NoticeLevel, SheetSelection, SourceFormat, Workbook};
