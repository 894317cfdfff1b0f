use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use murmur_job_interface::Segment;

use crate::{Error, Result, TranscribeOptions, Transcriber, Transcription};

// Transcription of long audio is itself long; the engine enforces the real
// start-to-close deadline, this is just the transport ceiling.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Client for a whisper-server-compatible transcription endpoint
/// (`POST <api_base>` with a multipart audio file, verbose-JSON response).
pub struct HttpTranscriber {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl HttpTranscriber {
    pub fn builder() -> HttpTranscriberBuilder {
        HttpTranscriberBuilder::default()
    }
}

impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        audio_path: &Path,
        options: &TranscribeOptions,
    ) -> Result<Transcription> {
        if !audio_path.exists() {
            return Err(Error::FileMissing(audio_path.to_path_buf()));
        }

        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        tracing::debug!(
            file = %file_name,
            size_bytes = bytes.len(),
            model = %options.model_size,
            "transcription_request"
        );

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("model", options.model_size.to_string())
            .text("response_format", "verbose_json");
        if let Some(language) = &options.force_language {
            form = form.text("language", language.clone());
        }

        let mut request = self.client.post(&self.api_base).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 | 415 | 422 => Error::Decode(format!("{status}: {body}")),
                _ => Error::Model(format!("{status}: {body}")),
            });
        }

        let body: VerboseResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("unparseable response: {e}")))?;

        Ok(Transcription {
            transcript: body.text,
            segments: body
                .segments
                .into_iter()
                .map(|s| Segment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
            language: body.language.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
struct VerboseResponse {
    text: String,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
    language: Option<String>,
}

#[derive(Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Default)]
pub struct HttpTranscriberBuilder {
    api_base: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl HttpTranscriberBuilder {
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> HttpTranscriber {
        HttpTranscriber {
            client: reqwest::Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .unwrap_or_default(),
            api_base: self.api_base.expect("api_base is required"),
            api_key: self.api_key,
        }
    }
}
