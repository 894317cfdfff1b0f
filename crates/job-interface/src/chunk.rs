use chrono::{DateTime, Utc};

/// A contiguous, topic-coherent span of a transcript.
///
/// Char positions are **character** offsets into `Job.transcript` (the topic
/// oracle speaks in characters, not bytes). For a job with N chunks the
/// indexes are a dense `0..N` and the char ranges tile the transcript with
/// no gaps and no overlap.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Chunk {
    pub id: i64,
    pub job_id: i64,
    pub chunk_index: i32,
    pub text: String,
    pub topic_summary: String,
    pub keywords: Vec<String>,
    pub confidence: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub start_char_pos: usize,
    pub end_char_pos: usize,
    /// Unit-normalized, or `None` until the embed activity has run.
    pub embedding: Option<Vec<f32>>,
}

/// What the chunker hands the store: a chunk before it has an id or a vector.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkDraft {
    pub chunk_index: i32,
    pub text: String,
    pub topic_summary: String,
    pub keywords: Vec<String>,
    pub confidence: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub start_char_pos: usize,
    pub end_char_pos: usize,
}

/// One ranked semantic-search result. `score` is cosine similarity in
/// `[-1, 1]`, higher is better; `created_at` is the parent job's.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct SearchHit {
    pub job_id: i64,
    pub chunk_id: i64,
    pub chunk_index: i32,
    pub text: String,
    pub topic_summary: String,
    pub score: f32,
    pub start_time: f64,
    pub end_time: f64,
    pub created_at: DateTime<Utc>,
}
