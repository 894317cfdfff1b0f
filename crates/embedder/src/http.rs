use std::time::Duration;

use serde::Deserialize;

use crate::{EMBEDDING_DIM, Embedder, Error, Result, normalize};

const DEFAULT_BATCH_SIZE: usize = 64;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Client for an OpenAI-compatible `/embeddings` endpoint.
///
/// Batches are capped internally; output order always matches input order.
/// Whatever the model returns is re-normalized to unit length and checked
/// against [`EMBEDDING_DIM`] before it leaves this type.
pub struct HttpEmbedder {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn builder() -> HttpEmbedderBuilder {
        HttpEmbedderBuilder::default()
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.api_base).json(&serde_json::json!({
            "model": self.model,
            "input": texts,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: EmbeddingsResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(Error::MalformedResponse(format!(
                "sent {} inputs, got {} embeddings",
                texts.len(),
                body.data.len()
            )));
        }

        let mut data = body.data;
        data.sort_by_key(|item| item.index);

        data.into_iter()
            .map(|item| {
                let mut vec = item.embedding;
                if vec.len() != EMBEDDING_DIM {
                    return Err(Error::DimensionMismatch {
                        expected: EMBEDDING_DIM,
                        got: vec.len(),
                    });
                }
                if normalize(&mut vec) == 0.0 {
                    return Err(Error::MalformedResponse(
                        "model returned a zero vector".to_string(),
                    ));
                }
                Ok(vec)
            })
            .collect()
    }
}

impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk).await?);
        }
        Ok(out)
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Default)]
pub struct HttpEmbedderBuilder {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    batch_size: Option<usize>,
    timeout: Option<Duration>,
}

impl HttpEmbedderBuilder {
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

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size.max(1));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> HttpEmbedder {
        HttpEmbedder {
            client: reqwest::Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .unwrap_or_default(),
            api_base: self.api_base.expect("api_base is required"),
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        }
    }
}
