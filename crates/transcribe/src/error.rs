use std::path::PathBuf;

use murmur_job_interface::ActivityError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file-missing: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("decode-error: {0}")]
    Decode(String),

    #[error("model-error: {0}")]
    Model(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<Error> for ActivityError {
    fn from(err: Error) -> Self {
        match &err {
            Error::FileMissing(_) => ActivityError::permanent(err.to_string()),
            _ => ActivityError::transient(err.to_string()),
        }
    }
}
