//! Error types for sheetmatch-api

use axum::extract::multipart::MultipartError;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for sheetmatch-api operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sheetmatch-api
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error from sheetmatch-core
    #[error(transparent)]
    Core(#[from] sheetmatch_core::Error),

    /// Malformed multipart body
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    /// Request is well-formed but not acceptable
    #[error("{0}")]
    BadRequest(String),

    /// Upload id unknown or expired
    #[error("Upload not found: {0}")]
    UploadNotFound(Uuid),

    /// Job id unknown or expired
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// Report requested before the job finished
    #[error("Job {id} has no report yet (state: {state})")]
    JobNotFinished {
        /// Job id
        id: Uuid,
        /// Current state
        state: String,
    },

    /// The job failed or was cancelled, so it will never have a report
    #[error("Job {id} has no report ({state})")]
    NoReport {
        /// Job id
        id: Uuid,
        /// Final state
        state: String,
    },

    /// The job finished without duplicates, so there is nothing to download
    #[error("No duplicates were found")]
    NoResults,

    /// Server socket or runtime failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task panicked or was aborted
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        use sheetmatch_core::Error as Core;

        match self {
            Error::Core(Core::UnsupportedFormat { .. }) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Core(Core::Validation { .. }) => StatusCode::BAD_REQUEST,
            Error::Core(Core::Cancelled) => StatusCode::CONFLICT,
            Error::Core(e) if e.is_user_error() => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Multipart(e) => e.status(),
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::UploadNotFound(_)
            | Error::JobNotFound(_)
            | Error::NoReport { .. }
            | Error::NoResults => StatusCode::NOT_FOUND,
            Error::JobNotFinished { .. } => StatusCode::CONFLICT,
            Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable category used in error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Core(_) => "workbook",
            Error::Multipart(_) => "upload",
            Error::BadRequest(_) => "request",
            Error::UploadNotFound(_)
            | Error::JobNotFound(_)
            | Error::NoReport { .. }
            | Error::NoResults => "not_found",
            Error::JobNotFinished { .. } => "conflict",
            Error::Io(_) | Error::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!(status = %status, "{self}");
        }

        let body = serde_json::json!({
            "error": {
                "category": self.category(),
                "message": self.to_string(),
            }
        });

        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            serde_json::to_string(&body).unwrap_or_default(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_statuses() {
        let unsupported = Error::from(sheetmatch_core::Error::UnsupportedFormat {
            name: "a.txt".into(),
        });
        assert_eq!(unsupported.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let unusable = Error::from(sheetmatch_core::Error::NoUsableSheets {
            id_column: "ID".into(),
        });
        assert_eq!(unusable.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let config = Error::from(sheetmatch_core::Error::config("x"));
        assert_eq!(config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_lookup_error_statuses() {
        assert_eq!(Error::JobNotFound(Uuid::nil()).status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::NoResults.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::JobNotFinished {
                id: Uuid::nil(),
                state: "loading".into()
            }
            .status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_error_response_is_json() {
        let resp = Error::BadRequest("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(&b"application/json"[..])
        );
    }
}
