use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One timed span of recognized speech, Whisper-style.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// The status state machine: `pending → processing → {completed, failed}`.
    /// Nothing leaves a terminal state.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

/// One uploaded audio file and everything the pipeline has derived from it.
///
/// `transcript` and `segments` are set together by the transcribe activity
/// and never rewritten. `workflow_run_id` is assigned once at creation and
/// scopes the activity completion markers, so a restarted scheduler finds
/// the markers written before the crash.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Job {
    pub id: i64,
    pub user_id: String,
    pub filename: String,
    pub file_path: String,
    pub status: JobStatus,
    pub transcript: Option<String>,
    pub segments: Option<Vec<Segment>>,
    pub language: Option<String>,
    pub error: Option<String>,
    pub workflow_run_id: Uuid,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
