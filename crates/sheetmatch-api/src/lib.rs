//! # sheetmatch-api
//!
//! HTTP server for sheetmatch.
//!
//! This crate provides:
//! - the single-page browser UI served at `/`
//! - upload inspection (sheet names, column names)
//! - comparison jobs with pollable progress
//! - CSV report downloads
//!
//! Uploads and jobs live in memory and are evicted after their TTL.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod ui;

pub use error::{Error, Result};
pub use server::Server;
pub use state::AppState;
