//! Error types for sheetmatch-cli

use thiserror::Error;

/// Result type alias for sheetmatch-cli operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sheetmatch-cli
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from sheetmatch-core
    #[error(transparent)]
    Core(#[from] sheetmatch_core::Error),

    /// Error from sheetmatch-api
    #[error(transparent)]
    Api(#[from] sheetmatch_api::Error),

    /// Bad command-line usage
    #[error("{0}")]
    Usage(String),
}
