use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or empty x-user-id header")]
    Unauthorized,

    #[error("job belongs to another user")]
    Forbidden,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("transcript is not available until the job completes")]
    TranscriptNotReady,

    #[error("the processing queue is not accepting work")]
    Unavailable,

    #[error("could not persist upload: {0}")]
    Upload(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] murmur_store::Error),

    #[error(transparent)]
    Search(#[from] murmur_search::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            Self::TranscriptNotReady => (
                StatusCode::NOT_FOUND,
                "transcript_not_ready",
                self.to_string(),
            ),
            Self::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", self.to_string()),
            Self::Upload(err) => {
                tracing::error!(error = %err, "upload_persist_failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "upload_failed",
                    "could not persist the uploaded file".to_string(),
                )
            }
            Self::Store(murmur_store::Error::JobNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "job_not_found",
                format!("job {id} not found"),
            ),
            Self::Search(murmur_search::Error::Embed(err)) => {
                tracing::error!(error = %err, "query_embedding_failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "embedding_unavailable",
                    "could not embed the query".to_string(),
                )
            }
            Self::Store(err) => {
                tracing::error!(error = %err, "store_error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
            Self::Search(err) => {
                tracing::error!(error = %err, "search_error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
