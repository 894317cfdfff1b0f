//! The single source of truth for jobs, chunks, and activity completion
//! markers. Nothing else in the pipeline shares mutable state; every
//! component reads and writes through [`JobStore`].
//!
//! Two implementations: [`PgStore`] (Postgres + pgvector, the production
//! backend) and [`MemoryStore`] (an exact-semantics twin used by the test
//! suite and for database-less local runs).

mod error;
mod memory;
mod pg;
mod validate;

pub use error::Error;
pub use memory::MemoryStore;
pub use pg::PgStore;

use std::collections::BTreeMap;
use std::future::Future;

use uuid::Uuid;

use murmur_job_interface::{Chunk, ChunkDraft, Job, JobStatus, SearchHit, Segment};

pub type Result<T> = std::result::Result<T, Error>;

/// Durable job/chunk storage with transactional activity writes.
///
/// The three activity writers (`save_transcription`, `replace_chunks`,
/// `patch_chunk_embeddings`) persist the activity's durable output *and* its
/// completion marker in one transaction: after a crash, a marker is present
/// exactly when the output is. That is the whole resume story.
pub trait JobStore: Send + Sync + 'static {
    /// Insert a `pending` job and assign it an id and a workflow run id.
    fn create_job(
        &self,
        user_id: &str,
        filename: &str,
        file_path: &str,
    ) -> impl Future<Output = Result<Job>> + Send;

    fn get_job(&self, job_id: i64) -> impl Future<Output = Result<Job>> + Send;

    /// The caller's jobs, newest first.
    fn list_jobs_by_user(&self, user_id: &str) -> impl Future<Output = Result<Vec<Job>>> + Send;

    /// Apply a status transition. Fails with [`Error::InvalidTransition`]
    /// when the state machine does not permit it.
    fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        error: Option<&str>,
    ) -> impl Future<Output = Result<Job>> + Send;

    /// One-shot write of the transcribe activity's output plus its marker.
    /// Rejects a second write for the same job.
    fn save_transcription(
        &self,
        job_id: i64,
        run_id: Uuid,
        transcript: &str,
        segments: &[Segment],
        language: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Atomically drop any existing chunks and insert the new ordered batch,
    /// plus the chunk activity's marker. The chunk-set invariants (dense
    /// indexes, gap-free coverage, monotone times) are enforced here, inside
    /// the same transaction.
    fn replace_chunks(
        &self,
        job_id: i64,
        run_id: Uuid,
        drafts: &[ChunkDraft],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Bulk-attach unit vectors by `chunk_index`, plus the embed activity's
    /// marker. Rejects the whole batch if any index is missing.
    fn patch_chunk_embeddings(
        &self,
        job_id: i64,
        run_id: Uuid,
        vectors: &BTreeMap<i32, Vec<f32>>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// A job's chunks in ascending `chunk_index` order.
    fn get_chunks(&self, job_id: i64) -> impl Future<Output = Result<Vec<Chunk>>> + Send;

    fn is_activity_complete(
        &self,
        run_id: Uuid,
        activity: &str,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Record a marker outside the combined writers. Idempotent; the payload
    /// is a compact summary, never the full output.
    fn mark_activity_complete(
        &self,
        run_id: Uuid,
        activity: &str,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Durable cancellation flag; running activities observe it on their
    /// next heartbeat tick.
    fn request_cancel(&self, job_id: i64) -> impl Future<Output = Result<()>> + Send;

    fn is_cancel_requested(&self, job_id: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Non-terminal jobs, oldest first. The scheduler re-enqueues these at
    /// startup.
    fn list_resumable_jobs(&self) -> impl Future<Output = Result<Vec<Job>>> + Send;

    /// Remove a job, its chunks, and its markers.
    fn delete_job(&self, job_id: i64) -> impl Future<Output = Result<()>> + Send;

    /// Rank the caller's chunks by cosine similarity to `query`. Only chunks
    /// of `completed` jobs with a stored embedding participate. Ordered by
    /// score descending, ties broken by `(created_at desc, chunk_id asc)`.
    fn search_chunks(
        &self,
        user_id: &str,
        query: &[f32],
        k: usize,
    ) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;
}

/// Activity names as they appear in the `activity_completions` table.
pub mod activity_names {
    pub const TRANSCRIBE: &str = "transcribe";
    pub const CHUNK: &str = "chunk";
    pub const EMBED: &str = "embed";
}
