use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use uuid::Uuid;

use murmur_job_interface::{Chunk, ChunkDraft, Job, JobStatus, SearchHit, Segment};

use crate::validate::{validate_chunk_set, validate_embedding};
use crate::{Error, JobStore, Result, activity_names};

/// In-memory twin of the Postgres store.
///
/// Same semantics, exact cosine scan instead of an ANN index. Backs the test
/// suite and `DATABASE_URL`-less local runs; everything in it is gone at
/// process exit, which is fine for both.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    jobs: BTreeMap<i64, Job>,
    chunks: BTreeMap<i64, Chunk>,
    markers: HashMap<(Uuid, String), serde_json::Value>,
    next_job_id: i64,
    next_chunk_id: i64,
}

impl Inner {
    fn job_mut(&mut self, job_id: i64) -> Result<&mut Job> {
        self.jobs.get_mut(&job_id).ok_or(Error::JobNotFound(job_id))
    }

    fn job(&self, job_id: i64) -> Result<&Job> {
        self.jobs.get(&job_id).ok_or(Error::JobNotFound(job_id))
    }

    /// `updated_at` strictly increases on every mutation, even when the
    /// clock has not visibly moved between two writes.
    fn touch(job: &mut Job) {
        let now = Utc::now();
        let floor = job.updated_at + Duration::microseconds(1);
        job.updated_at = if now > floor { now } else { floor };
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryStore {
    async fn create_job(&self, user_id: &str, filename: &str, file_path: &str) -> Result<Job> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_job_id += 1;
        let now = Utc::now();
        let job = Job {
            id: inner.next_job_id,
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            file_path: file_path.to_string(),
            status: JobStatus::Pending,
            transcript: None,
            segments: None,
            language: None,
            error: None,
            workflow_run_id: Uuid::new_v4(),
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        };
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, job_id: i64) -> Result<Job> {
        let inner = self.inner.lock().unwrap();
        inner.job(job_id).cloned()
    }

    async fn list_jobs_by_user(&self, user_id: &str) -> Result<Vec<Job>> {
        let inner = self.inner.lock().unwrap();
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn update_status(
        &self,
        job_id: i64,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<Job> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.job_mut(job_id)?;
        if !job.status.can_transition_to(status) {
            return Err(Error::InvalidTransition {
                from: job.status,
                to: status,
            });
        }
        job.status = status;
        job.error = error.map(str::to_string);
        Inner::touch(job);
        Ok(job.clone())
    }

    async fn save_transcription(
        &self,
        job_id: i64,
        run_id: Uuid,
        transcript: &str,
        segments: &[Segment],
        language: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.job_mut(job_id)?;
        if job.transcript.is_some() {
            return Err(Error::TranscriptAlreadySet(job_id));
        }
        job.transcript = Some(transcript.to_string());
        job.segments = Some(segments.to_vec());
        job.language = Some(language.to_string());
        Inner::touch(job);
        inner.markers.insert(
            (run_id, activity_names::TRANSCRIBE.to_string()),
            serde_json::json!({
                "chars": transcript.chars().count(),
                "segments": segments.len(),
                "language": language,
            }),
        );
        Ok(())
    }

    async fn replace_chunks(&self, job_id: i64, run_id: Uuid, drafts: &[ChunkDraft]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.job_mut(job_id)?;
        let transcript = job.transcript.clone().unwrap_or_default();
        validate_chunk_set(&transcript, drafts)?;
        Inner::touch(job);

        let stale: Vec<i64> = inner
            .chunks
            .values()
            .filter(|c| c.job_id == job_id)
            .map(|c| c.id)
            .collect();
        for id in stale {
            inner.chunks.remove(&id);
        }

        for draft in drafts {
            inner.next_chunk_id += 1;
            let chunk = Chunk {
                id: inner.next_chunk_id,
                job_id,
                chunk_index: draft.chunk_index,
                text: draft.text.clone(),
                topic_summary: draft.topic_summary.clone(),
                keywords: draft.keywords.clone(),
                confidence: draft.confidence,
                start_time: draft.start_time,
                end_time: draft.end_time,
                start_char_pos: draft.start_char_pos,
                end_char_pos: draft.end_char_pos,
                embedding: None,
            };
            inner.chunks.insert(chunk.id, chunk);
        }

        inner.markers.insert(
            (run_id, activity_names::CHUNK.to_string()),
            serde_json::json!({ "chunks": drafts.len() }),
        );
        Ok(())
    }

    async fn patch_chunk_embeddings(
        &self,
        job_id: i64,
        run_id: Uuid,
        vectors: &BTreeMap<i32, Vec<f32>>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.job(job_id)?;

        let by_index: HashMap<i32, i64> = inner
            .chunks
            .values()
            .filter(|c| c.job_id == job_id)
            .map(|c| (c.chunk_index, c.id))
            .collect();

        // All-or-nothing: check every vector before writing any of them.
        let mut updates = Vec::with_capacity(vectors.len());
        for (chunk_index, vec) in vectors {
            validate_embedding(vec)?;
            let id = by_index.get(chunk_index).ok_or(Error::MissingChunkIndex {
                job_id,
                chunk_index: *chunk_index,
            })?;
            updates.push((*id, vec.clone()));
        }
        for (id, vec) in updates {
            if let Some(chunk) = inner.chunks.get_mut(&id) {
                chunk.embedding = Some(vec);
            }
        }

        let job = inner.job_mut(job_id)?;
        Inner::touch(job);
        inner.markers.insert(
            (run_id, activity_names::EMBED.to_string()),
            serde_json::json!({ "embedded": vectors.len() }),
        );
        Ok(())
    }

    async fn get_chunks(&self, job_id: i64) -> Result<Vec<Chunk>> {
        let inner = self.inner.lock().unwrap();
        inner.job(job_id)?;
        let mut chunks: Vec<Chunk> = inner
            .chunks
            .values()
            .filter(|c| c.job_id == job_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn is_activity_complete(&self, run_id: Uuid, activity: &str) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.markers.contains_key(&(run_id, activity.to_string())))
    }

    async fn mark_activity_complete(
        &self,
        run_id: Uuid,
        activity: &str,
        payload: serde_json::Value,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .markers
            .entry((run_id, activity.to_string()))
            .or_insert(payload);
        Ok(())
    }

    async fn request_cancel(&self, job_id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.job_mut(job_id)?;
        job.cancel_requested = true;
        Inner::touch(job);
        Ok(())
    }

    async fn is_cancel_requested(&self, job_id: i64) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.job(job_id)?.cancel_requested)
    }

    async fn list_resumable_jobs(&self) -> Result<Vec<Job>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .values()
            .filter(|j| !j.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn delete_job(&self, job_id: i64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.jobs.remove(&job_id).ok_or(Error::JobNotFound(job_id))?;
        inner.chunks.retain(|_, c| c.job_id != job_id);
        inner.markers.retain(|(run, _), _| *run != job.workflow_run_id);
        Ok(())
    }

    async fn search_chunks(
        &self,
        user_id: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        let inner = self.inner.lock().unwrap();
        let mut hits: Vec<SearchHit> = inner
            .chunks
            .values()
            .filter_map(|chunk| {
                let job = inner.jobs.get(&chunk.job_id)?;
                if job.user_id != user_id || job.status != JobStatus::Completed {
                    return None;
                }
                let embedding = chunk.embedding.as_ref()?;
                let score: f32 = embedding.iter().zip(query).map(|(a, b)| a * b).sum();
                Some(SearchHit {
                    job_id: chunk.job_id,
                    chunk_id: chunk.id,
                    chunk_index: chunk.chunk_index,
                    text: chunk.text.clone(),
                    topic_summary: chunk.topic_summary.clone(),
                    score,
                    start_time: chunk.start_time,
                    end_time: chunk.end_time,
                    created_at: job.created_at,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}
