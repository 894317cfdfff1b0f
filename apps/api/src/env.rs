use std::sync::OnceLock;

use serde::Deserialize;

use murmur_chunker::ChunkingStrategy;
use murmur_transcribe::ModelSize;

fn default_port() -> u16 {
    8080
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_worker_pool_size() -> usize {
    3
}

fn default_heartbeat_interval_seconds() -> u64 {
    5
}

fn default_sentences_per_chunk() -> usize {
    3
}

fn default_transcribe_base_url() -> String {
    "http://127.0.0.1:9000/v1/audio/transcriptions".to_string()
}

fn default_oracle_base_url() -> String {
    "http://127.0.0.1:11434/v1/chat/completions".to_string()
}

#[derive(Deserialize)]
pub struct Env {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Postgres DSN. Absent means the in-memory store: fine for trying the
    /// service out, nothing survives a restart.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    #[serde(default = "default_heartbeat_interval_seconds")]
    pub heartbeat_interval_seconds: u64,

    #[serde(default = "default_transcribe_base_url")]
    pub transcribe_base_url: String,
    #[serde(default)]
    pub transcribe_api_key: Option<String>,
    #[serde(default)]
    pub transcribe_model_size: ModelSize,

    #[serde(default = "default_oracle_base_url")]
    pub oracle_base_url: String,
    #[serde(default)]
    pub oracle_api_key: Option<String>,
    #[serde(default)]
    pub oracle_model: Option<String>,
    #[serde(default)]
    pub chunking_strategy: ChunkingStrategy,
    #[serde(default = "default_sentences_per_chunk")]
    pub sentences_per_chunk: usize,

    /// OpenAI-compatible embeddings endpoint. Absent means the deterministic
    /// local hash embedder.
    #[serde(default)]
    pub embeddings_base_url: Option<String>,
    #[serde(default)]
    pub embeddings_api_key: Option<String>,
    #[serde(default)]
    pub embeddings_model: Option<String>,
}

static ENV: OnceLock<Env> = OnceLock::new();

pub fn env() -> &'static Env {
    ENV.get_or_init(|| {
        let _ = dotenvy::dotenv();
        envy::from_env().expect("Failed to load environment")
    })
}
