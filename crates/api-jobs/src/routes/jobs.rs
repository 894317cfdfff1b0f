use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
};
use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use murmur_embedder::Embedder;
use murmur_job_interface::{Job, JobEvent, JobStatus, Segment};
use murmur_store::JobStore;

use crate::AppState;
use crate::error::{ApiError, Result};
use crate::srt::render_srt;

#[derive(Debug, Serialize, ToSchema)]
pub struct JobSummary {
    pub id: i64,
    pub filename: String,
    pub status: JobStatus,
    pub language: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            filename: job.filename.clone(),
            status: job.status,
            language: job.language.clone(),
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct JobDetail {
    pub id: i64,
    pub filename: String,
    pub status: JobStatus,
    pub language: Option<String>,
    pub error: Option<String>,
    pub transcript: Option<String>,
    pub segments: Option<Vec<Segment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobDetail {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            filename: job.filename,
            status: job.status,
            language: job.language,
            error: job.error,
            transcript: job.transcript,
            segments: job.segments,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateJobResponse {
    pub job_id: i64,
    pub status: JobStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub job_id: i64,
    pub cancel_requested: bool,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    #[default]
    Txt,
    Srt,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptQuery {
    #[serde(default)]
    pub format: TranscriptFormat,
}

pub(super) fn require_user(headers: &HeaderMap) -> Result<&str> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)
}

async fn fetch_owned<S: JobStore>(store: &S, job_id: i64, user_id: &str) -> Result<Job> {
    let job = store.get_job(job_id).await?;
    if job.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(job)
}

pub(super) async fn create_job<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateJobResponse>)> {
    let user_id = require_user(&headers)?.to_string();

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(sanitize_filename)
                .unwrap_or_else(|| "upload.bin".to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            upload = Some((filename, bytes));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("multipart field 'file' is required".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
    }

    tokio::fs::create_dir_all(&state.upload_dir).await?;
    let stored = state
        .upload_dir
        .join(format!("{}_{filename}", uuid::Uuid::new_v4()));
    tokio::fs::write(&stored, &bytes).await?;

    let job = state
        .store
        .create_job(&user_id, &filename, &stored.to_string_lossy())
        .await?;
    if !(state.starter)(job.id) {
        return Err(ApiError::Unavailable);
    }

    tracing::info!(
        job_id = job.id,
        filename = %job.filename,
        size_bytes = bytes.len(),
        "job_submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            job_id: job.id,
            status: job.status,
        }),
    ))
}

fn sanitize_filename(raw: &str) -> String {
    std::path::Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload.bin")
        .to_string()
}

pub(super) async fn list_jobs<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
) -> Result<Json<Vec<JobSummary>>> {
    let user_id = require_user(&headers)?;
    let jobs = state.store.list_jobs_by_user(user_id).await?;
    Ok(Json(jobs.iter().map(JobSummary::from).collect()))
}

pub(super) async fn get_job<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
) -> Result<Json<JobDetail>> {
    let user_id = require_user(&headers)?;
    let job = fetch_owned(state.store.as_ref(), job_id, user_id).await?;
    Ok(Json(job.into()))
}

pub(super) async fn download_transcript<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
    Query(query): Query<TranscriptQuery>,
) -> Result<Response> {
    let user_id = require_user(&headers)?;
    let job = fetch_owned(state.store.as_ref(), job_id, user_id).await?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::TranscriptNotReady);
    }
    let transcript = job.transcript.ok_or(ApiError::TranscriptNotReady)?;

    let response = match query.format {
        TranscriptFormat::Txt => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            transcript,
        )
            .into_response(),
        TranscriptFormat::Srt => (
            [(header::CONTENT_TYPE, "application/x-subrip")],
            render_srt(job.segments.as_deref().unwrap_or_default()),
        )
            .into_response(),
    };
    Ok(response)
}

pub(super) async fn job_events<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, std::convert::Infallible>>>> {
    let user_id = require_user(&headers)?;
    let job = fetch_owned(state.store.as_ref(), job_id, user_id).await?;

    // Subscribe before snapshotting so no transition can slip between the
    // two; the bus itself is not a durable log.
    let mut sub = state.bus.subscribe(job_id);
    let snapshot = JobEvent::Progress {
        job_id,
        status: job.status,
        progress_pct: None,
        message: None,
        error: job.error.clone(),
    };
    let already_terminal = job.status.is_terminal();

    let stream = async_stream::stream! {
        if let Ok(payload) = serde_json::to_string(&snapshot) {
            yield Ok(Event::default().data(payload));
        }
        if !already_terminal {
            while let Some(event) = sub.recv().await {
                let terminal = matches!(
                    &event,
                    JobEvent::Progress { status, .. } if status.is_terminal()
                );
                if let Ok(payload) = serde_json::to_string(&event) {
                    yield Ok(Event::default().data(payload));
                }
                if terminal {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub(super) async fn cancel_job<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
) -> Result<Json<CancelResponse>> {
    let user_id = require_user(&headers)?;
    fetch_owned(state.store.as_ref(), job_id, user_id).await?;
    state.store.request_cancel(job_id).await?;
    tracing::info!(job_id, "job_cancel_requested");
    Ok(Json(CancelResponse {
        job_id,
        cancel_requested: true,
    }))
}

pub(super) async fn delete_job<S: JobStore, E: Embedder + 'static>(
    State(state): State<AppState<S, E>>,
    headers: HeaderMap,
    Path(job_id): Path<i64>,
) -> Result<StatusCode> {
    let user_id = require_user(&headers)?;
    let job = fetch_owned(state.store.as_ref(), job_id, user_id).await?;
    state.store.delete_job(job_id).await?;
    // Uploaded audio goes with the row; a missing file is not an error.
    let _ = tokio::fs::remove_file(&job.file_path).await;
    tracing::info!(job_id, "job_deleted");
    Ok(StatusCode::NO_CONTENT)
}
