/// How the scheduler should treat a failed activity attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorKind {
    /// Upstream hiccup; retried within the activity's policy.
    Transient,
    /// Missing file, invariant breach, malformed input. No retries.
    Permanent,
    /// Caller asked for the job to stop. Treated as permanent.
    Cancelled,
}

/// The error currency between activities and the scheduler: a kind the retry
/// machinery switches on, plus a human-readable message that ends up in
/// `Job.error` when retries are exhausted.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ActivityError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ActivityError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            message: "cancelled".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}
