use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

// The oracle call is capped well below the chunk activity's own deadline so
// a wedged upstream burns retry budget, not the whole stage.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You segment transcripts into topic-coherent chunks. \
Given a transcript, partition it into consecutive spans, one per topic. \
Respond with JSON only, shaped as \
{\"chunks\": [{\"start_char_pos\": int, \"end_char_pos\": int, \
\"topic_summary\": string, \"keywords\": [string], \"confidence\": number}]}. \
Positions are character offsets into the transcript. Spans must cover the \
whole transcript in order, without gaps and without overlaps. topic_summary \
is one or two sentences; keywords is 3 to 7 short strings; confidence is \
your trust in the split, between 0 and 1.";

/// One topic-coherent span proposed by the oracle. Char positions are
/// character offsets into the transcript it was asked about.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SuggestedSpan {
    pub start_char_pos: usize,
    pub end_char_pos: usize,
    #[serde(default)]
    pub topic_summary: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("oracle returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed oracle output: {0}")]
    Malformed(String),
}

/// The LLM collaborator that proposes a topic partition of a transcript.
pub trait TopicOracle: Send + Sync {
    fn suggest_chunks(
        &self,
        transcript: &str,
    ) -> impl Future<Output = Result<Vec<SuggestedSpan>, OracleError>> + Send;
}

/// Placeholder oracle for sentence-only configurations. Always unavailable,
/// so the chunker's fallback path is taken without a network round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

impl TopicOracle for NoOracle {
    async fn suggest_chunks(&self, _transcript: &str) -> Result<Vec<SuggestedSpan>, OracleError> {
        Err(OracleError::Malformed("no oracle configured".to_string()))
    }
}

/// Chat-completions client for the topic oracle.
pub struct LlmTopicOracle {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl LlmTopicOracle {
    pub fn builder() -> LlmTopicOracleBuilder {
        LlmTopicOracleBuilder::default()
    }
}

impl TopicOracle for LlmTopicOracle {
    async fn suggest_chunks(&self, transcript: &str) -> Result<Vec<SuggestedSpan>, OracleError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": transcript },
            ],
        });

        let mut request = self.client.post(&self.api_base).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(format!("unparseable completion: {e}")))?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| OracleError::Malformed("completion had no choices".to_string()))?;

        let reply: OracleReply = serde_json::from_str(content)
            .map_err(|e| OracleError::Malformed(format!("content is not chunk JSON: {e}")))?;

        Ok(reply.chunks)
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct OracleReply {
    chunks: Vec<SuggestedSpan>,
}

#[derive(Default)]
pub struct LlmTopicOracleBuilder {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
}

impl LlmTopicOracleBuilder {
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> LlmTopicOracle {
        LlmTopicOracle {
            client: reqwest::Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .unwrap_or_default(),
            api_base: self.api_base.expect("api_base is required"),
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }
}
