use murmur_job_interface::{ActivityError, JobStatus};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("illegal status transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("transcription already recorded for job {0}")]
    TranscriptAlreadySet(i64),

    #[error("chunk invariant violated: {0}")]
    InvariantViolation(String),

    #[error("job {job_id} has no chunk with index {chunk_index}")]
    MissingChunkIndex { job_id: i64, chunk_index: i32 },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    /// Connection-level trouble is worth another attempt; integrity
    /// violations are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Sqlx(_) | Error::Migrate(_))
    }
}

impl From<Error> for ActivityError {
    fn from(err: Error) -> Self {
        if err.is_retryable() {
            ActivityError::transient(err.to_string())
        } else {
            ActivityError::permanent(err.to_string())
        }
    }
}
