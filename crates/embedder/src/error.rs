use murmur_job_interface::ActivityError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("embedding endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("expected {expected}-dim embedding, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("malformed embeddings response: {0}")]
    MalformedResponse(String),
}

impl From<Error> for ActivityError {
    fn from(err: Error) -> Self {
        match &err {
            // A wrong dimension means the configured model does not match
            // the store's vector column; retrying cannot fix that.
            Error::DimensionMismatch { .. } => ActivityError::permanent(err.to_string()),
            Error::Api { status, .. } if (400..500).contains(status) && *status != 429 => {
                ActivityError::permanent(err.to_string())
            }
            _ => ActivityError::transient(err.to_string()),
        }
    }
}
