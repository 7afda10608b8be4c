//! Error types for sheetmatch-core.

use std::path::Path;

/// Errors that can occur while loading workbooks or comparing tables.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error (reading files, writing reports)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error tied to a specific path
    #[error("I/O error at {path}: {source}")]
    IoPath {
        /// Path being read or written
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet could not be parsed
    #[error("Error reading workbook '{name}': {source}")]
    Workbook {
        /// Display name of the upload
        name: String,
        /// Underlying reader error
        #[source]
        source: calamine::Error,
    },

    /// CSV read or write failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File extension is not a supported spreadsheet or CSV format
    #[error("Unsupported file format: '{name}' (expected xlsx, xlsm, xlsb, xls, ods or csv)")]
    UnsupportedFormat {
        /// Display name of the upload
        name: String,
    },

    /// Requested sheet does not exist in the workbook
    #[error("Sheet '{sheet}' not found in '{name}'")]
    SheetNotFound {
        /// Display name of the upload
        name: String,
        /// Requested sheet
        sheet: String,
    },

    /// None of the selected sheets carried the ID column
    #[error(
        "ID column '{id_column}' not found in any of the selected sheets. \
         Please check your column name and sheet selections."
    )]
    NoUsableSheets {
        /// ID column that was looked for
        id_column: String,
    },

    /// Input validation error
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation
        field: Option<String>,
        /// What went wrong
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// The comparison was cancelled before it finished
    #[error("Comparison cancelled")]
    Cancelled,
}

/// Convenience `Result` type alias for sheetmatch-core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error was caused by the user's input rather than
    /// by the environment.
    pub fn is_user_error(&self) -> bool {
        match self {
            Error::Workbook { .. }
            | Error::UnsupportedFormat { .. }
            | Error::SheetNotFound { .. }
            | Error::NoUsableSheets { .. }
            | Error::Validation { .. } => true,
            Error::Csv(e) => !matches!(e.kind(), csv::ErrorKind::Io(_)),
            Error::Io(_) | Error::IoPath { .. } | Error::Config { .. } | Error::Cancelled => false,
        }
    }

    /// Creates a new validation error.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Creates a new validation error with a field name.
    pub fn validation_field<F, M>(field: F, message: M) -> Self
    where
        F: Into<String>,
        M: Into<String>,
    {
        Error::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::IoPath {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
