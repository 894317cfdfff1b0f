use crate::JobStatus;

/// What the progress bus carries. `Lagging` is synthesized on the consumer
/// side when a slow subscriber has had events dropped; observers must
/// tolerate the gap and re-read current state from the store if they care.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum JobEvent {
    #[serde(rename = "progress")]
    Progress {
        job_id: i64,
        status: JobStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress_pct: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename = "lagging")]
    Lagging { job_id: i64, skipped: u64 },
}

impl JobEvent {
    pub fn status(job_id: i64, status: JobStatus, progress_pct: u8) -> Self {
        JobEvent::Progress {
            job_id,
            status,
            progress_pct: Some(progress_pct),
            message: None,
            error: None,
        }
    }

    pub fn message(job_id: i64, message: impl Into<String>) -> Self {
        JobEvent::Progress {
            job_id,
            status: JobStatus::Processing,
            progress_pct: None,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(job_id: i64, error: impl Into<String>) -> Self {
        JobEvent::Progress {
            job_id,
            status: JobStatus::Failed,
            progress_pct: None,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn job_id(&self) -> i64 {
        match self {
            JobEvent::Progress { job_id, .. } | JobEvent::Lagging { job_id, .. } => *job_id,
        }
    }
}
