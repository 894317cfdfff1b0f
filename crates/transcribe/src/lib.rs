mod error;
mod http;

pub use error::Error;
pub use http::{HttpTranscriber, HttpTranscriberBuilder};

use std::future::Future;
use std::path::Path;

use murmur_job_interface::Segment;

pub type Result<T> = std::result::Result<T, Error>;

/// Whisper model tiers, smallest to largest.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    pub model_size: ModelSize,
    /// Skip language detection and decode as this ISO 639-1 code.
    pub force_language: Option<String>,
}

/// Everything the transcribe stage persists: the full text, the timed
/// segments it was assembled from, and the detected language.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Transcription {
    pub transcript: String,
    pub segments: Vec<Segment>,
    pub language: String,
}

/// Audio file in, transcription out. A blocking long operation: expected
/// wall time is on the order of the audio duration.
pub trait Transcriber: Send + Sync {
    fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> impl Future<Output = Result<Transcription>> + Send;
}
