//! # sheetmatch-cli
//!
//! Command-line front end for sheetmatch:
//! - `serve` starts the browser UI
//! - `sheets` lists the sheets and columns of a workbook
//! - `compare` runs a comparison offline and writes the CSV report
//! - `config` inspects and edits the configuration file

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config_handlers;
pub mod error;

pub use error::{Error, Result};
