//! HTTP handlers.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/` | browser UI |
//! | GET | `/health` | liveness |
//! | POST | `/api/uploads` | upload one workbook (multipart field `file`) |
//! | GET | `/api/uploads/{id}` | sheets and columns of an upload |
//! | POST | `/api/jobs` | start a comparison |
//! | GET | `/api/jobs/{id}` | job state, notices, and result |
//! | GET | `/api/jobs/{id}/report.csv` | CSV report |
//! | DELETE | `/api/jobs/{id}` | cancel and forget a job |

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sheetmatch_core::report::to_csv_bytes;
use sheetmatch_core::{
    CellValue, CompareOptions, Comparison, JobState, Notice, SheetSelection, SourceFormat,
    Workbook, REPORT_FILE_NAME, REPORT_MIME,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::{AppState, Job, JobSpec, Upload};
use crate::{ui, Error, Result};

/// Message shown when a side has no sheets selected.
pub const EMPTY_SELECTION_MESSAGE: &str = "Please select at least one sheet for each file.";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health))
        .route("/api/uploads", post(create_upload))
        .route("/api/uploads/{id}", get(get_upload))
        .route("/api/jobs", post(create_job))
        .route("/api/jobs/{id}", get(get_job).delete(delete_job))
        .route("/api/jobs/{id}/report.csv", get(job_report))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Health
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy".
    pub status: String,
    /// Crate version.
    pub version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Uploads
// ============================================================================

/// One sheet of an upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct SheetInfo {
    /// Sheet name.
    pub name: String,
    /// Column names from the first row.
    pub columns: Vec<String>,
}

/// Description of a stored upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Upload id, used when starting jobs.
    pub id: Uuid,
    /// Original file name.
    pub name: String,
    /// Detected format.
    pub format: SourceFormat,
    /// Sheets in workbook order.
    pub sheets: Vec<SheetInfo>,
    /// Union of all sheets' columns, in first-seen order.
    pub columns: Vec<String>,
    /// When the upload arrived (RFC 3339).
    pub uploaded_at: String,
}

impl UploadResponse {
    fn new(id: Uuid, upload: &Upload, header_row: usize) -> Self {
        let workbook = &upload.workbook;
        let names = workbook.sheet_names();
        let sheets = names
            .iter()
            .map(|name| SheetInfo {
                name: name.clone(),
                columns: workbook.columns(name, header_row).unwrap_or_default(),
            })
            .collect();
        Self {
            id,
            name: workbook.name().to_string(),
            format: workbook.format(),
            columns: workbook.columns_union(&names, header_row),
            sheets,
            uploaded_at: upload.uploaded_at.to_rfc3339(),
        }
    }
}

async fn create_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| Error::BadRequest("upload is missing a file name".into()))?;
        // Reject before reading the body.
        SourceFormat::from_file_name(&name)?;
        let bytes = field.bytes().await?;

        let workbook = tokio::task::spawn_blocking(move || Workbook::from_bytes(name, bytes.to_vec()))
            .await
            .map_err(|e| Error::Internal(e.to_string()))??;

        let header_row = state.config.compare.header_row;
        let (id, upload) = state
            .uploads
            .insert(Upload {
                workbook,
                uploaded_at: chrono::Utc::now(),
            })
            .await;
        tracing::info!(
            upload = %id,
            name = upload.workbook.name(),
            sheets = upload.workbook.sheet_names().len(),
            "Stored upload"
        );

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse::new(id, &upload, header_row)),
        ));
    }

    Err(Error::BadRequest("multipart field 'file' is required".into()))
}

async fn get_upload(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UploadResponse>> {
    let upload = state
        .uploads
        .get(&id)
        .await
        .ok_or(Error::UploadNotFound(id))?;
    Ok(Json(UploadResponse::new(
        id,
        &upload,
        state.config.compare.header_row,
    )))
}

// ============================================================================
// Jobs
// ============================================================================

/// One side of a comparison request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSelection {
    /// Upload to read.
    pub upload_id: Uuid,
    /// ID column name.
    pub id_column: String,
    /// Sheets to stack.
    pub sheets: Vec<String>,
}

/// Body of `POST /api/jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    /// The file searched for duplicates.
    pub file1: FileSelection,
    /// The lookup file.
    pub file2: FileSelection,
    /// Overrides `compare.chunk_size`.
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// Overrides `compare.header_row`.
    #[serde(default)]
    pub header_row: Option<usize>,
}

/// Response of `POST /api/jobs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateJobResponse {
    /// Id to poll.
    pub job_id: Uuid,
}

async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> Result<impl IntoResponse> {
    if request.file1.sheets.is_empty() || request.file2.sheets.is_empty() {
        return Err(Error::BadRequest(EMPTY_SELECTION_MESSAGE.into()));
    }
    let chunk_size = request
        .chunk_size
        .unwrap_or(state.config.compare.chunk_size);
    if chunk_size == 0 {
        return Err(Error::BadRequest("chunk_size must be at least 1".into()));
    }
    let header_row = request
        .header_row
        .unwrap_or(state.config.compare.header_row);

    let file1 = lookup_upload(&state, request.file1.upload_id).await?;
    let file2 = lookup_upload(&state, request.file2.upload_id).await?;

    let spec = JobSpec {
        file1: selection(&request.file1, header_row),
        file2: selection(&request.file2, header_row),
        options: CompareOptions::default().with_chunk_size(chunk_size),
    };
    let job_id = state.start_job(file1, file2, spec).await;

    Ok((StatusCode::ACCEPTED, Json(CreateJobResponse { job_id })))
}

fn selection(file: &FileSelection, header_row: usize) -> SheetSelection {
    SheetSelection::new(file.id_column.clone(), file.sheets.clone()).with_header_row(header_row)
}

async fn lookup_upload(state: &AppState, id: Uuid) -> Result<std::sync::Arc<Upload>> {
    state
        .uploads
        .get(&id)
        .await
        .ok_or(Error::UploadNotFound(id))
}

async fn lookup_job(state: &AppState, id: Uuid) -> Result<std::sync::Arc<Job>> {
    state.jobs.get(&id).await.ok_or(Error::JobNotFound(id))
}

/// Result table of a finished job.
#[derive(Debug, Serialize)]
pub struct ResultView {
    /// Column names.
    pub columns: Vec<String>,
    /// Cells; each serialises as its display text.
    pub rows: Vec<Vec<CellValue>>,
    /// Number of rows.
    pub row_count: usize,
}

impl From<&Comparison> for ResultView {
    fn from(comparison: &Comparison) -> Self {
        Self {
            columns: comparison.matches.columns().to_vec(),
            rows: comparison.matches.rows().to_vec(),
            row_count: comparison.matches.len(),
        }
    }
}

/// Response of `GET /api/jobs/{id}`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    /// Job id.
    pub id: Uuid,
    /// State, flattened: `state` plus `checked`/`total` or `reason`.
    #[serde(flatten)]
    pub state: JobState,
    /// Fraction complete, 0.0 to 1.0.
    pub progress: f64,
    /// Notices so far.
    pub notices: Vec<Notice>,
    /// Present once the job is done.
    pub result: Option<ResultView>,
    /// When the job was accepted (RFC 3339).
    pub created_at: String,
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>> {
    let job = lookup_job(&state, id).await?;
    let current = job.handle.state();
    let result = job.result.get().map(ResultView::from);

    Ok(Json(JobStatusResponse {
        id,
        progress: current.progress(),
        state: current,
        notices: job.notices(),
        result,
        created_at: job.created_at.to_rfc3339(),
    }))
}

async fn job_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = lookup_job(&state, id).await?;
    let Some(comparison) = job.result.get() else {
        let current = job.handle.state();
        let state = current.to_string();
        return Err(if current.is_finished() {
            Error::NoReport { id, state }
        } else {
            Error::JobNotFinished { id, state }
        });
    };
    if !comparison.has_duplicates() {
        return Err(Error::NoResults);
    }

    let body = to_csv_bytes(&comparison.matches)?;
    Ok((
        [
            (header::CONTENT_TYPE, REPORT_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
            ),
        ],
        body,
    ))
}

async fn delete_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let job = state.jobs.remove(&id).await.ok_or(Error::JobNotFound(id))?;
    job.handle.cancel();
    tracing::info!(job = %id, "Job removed");
    Ok(StatusCode::NO_CONTENT)
}
