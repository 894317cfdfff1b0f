//! Semantic search over a user's chunks: embed the query once, let the
//! store rank by cosine similarity.

use std::sync::Arc;

use murmur_embedder::Embedder;
use murmur_job_interface::SearchHit;
use murmur_store::JobStore;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Embed(#[from] murmur_embedder::Error),

    #[error(transparent)]
    Store(#[from] murmur_store::Error),
}

pub struct SearchEngine<S, E> {
    store: Arc<S>,
    embedder: Arc<E>,
}

impl<S, E> Clone for SearchEngine<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            embedder: Arc::clone(&self.embedder),
        }
    }
}

impl<S, E> SearchEngine<S, E>
where
    S: JobStore,
    E: Embedder,
{
    pub fn new(store: Arc<S>, embedder: Arc<E>) -> Self {
        Self { store, embedder }
    }

    /// Top-`k` chunks owned by `user_id`, ranked by cosine similarity to
    /// `query`, score descending. Only completed jobs participate; the
    /// underlying index is approximate, so this is best-effort recall, not
    /// exact nearest neighbors.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, Error> {
        let query_vec = self.embedder.embed_one(query).await?;
        let hits = self.store.search_chunks(user_id, &query_vec, k).await?;
        tracing::debug!(user_id, k, hits = hits.len(), "semantic_search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use murmur_embedder::HashEmbedder;
    use murmur_job_interface::{ChunkDraft, JobStatus};
    use murmur_store::MemoryStore;

    use super::*;

    async fn seed_completed_job(
        store: &MemoryStore,
        embedder: &HashEmbedder,
        user_id: &str,
        text: &str,
    ) -> i64 {
        let job = store
            .create_job(user_id, "seed.wav", "/tmp/seed.wav")
            .await
            .unwrap();
        let run = job.workflow_run_id;
        store
            .save_transcription(job.id, run, text, &[], "en")
            .await
            .unwrap();
        store
            .replace_chunks(
                job.id,
                run,
                &[ChunkDraft {
                    chunk_index: 0,
                    text: text.to_string(),
                    topic_summary: String::new(),
                    keywords: Vec::new(),
                    confidence: 0.0,
                    start_time: 0.0,
                    end_time: 1.0,
                    start_char_pos: 0,
                    end_char_pos: text.chars().count(),
                }],
            )
            .await
            .unwrap();

        let mut vectors = BTreeMap::new();
        vectors.insert(0, embedder.embed_one(text).await.unwrap());
        store
            .patch_chunk_embeddings(job.id, run, &vectors)
            .await
            .unwrap();
        store
            .update_status(job.id, JobStatus::Processing, None)
            .await
            .unwrap();
        store
            .update_status(job.id, JobStatus::Completed, None)
            .await
            .unwrap();
        job.id
    }

    #[tokio::test]
    async fn ranks_lexically_related_chunks_first() {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(HashEmbedder::new());

        seed_completed_job(&store, &embedder, "u1", "photosynthesis in plants").await;
        seed_completed_job(&store, &embedder, "u1", "mitochondrial respiration").await;
        seed_completed_job(&store, &embedder, "u1", "recipe for bread").await;
        // Same content for a different user; must never surface for u1.
        seed_completed_job(&store, &embedder, "u2", "photosynthesis in plants").await;

        let engine = SearchEngine::new(Arc::clone(&store), Arc::clone(&embedder));
        let hits = engine.search("u1", "how plants make energy", 10).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "photosynthesis in plants");
        let bread = hits.iter().find(|h| h.text == "recipe for bread").unwrap();
        assert!(hits.iter().all(|h| bread.score <= h.score));
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn empty_corpus_returns_nothing() {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(HashEmbedder::new());
        let engine = SearchEngine::new(store, embedder);

        let hits = engine.search("u1", "anything at all", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn k_caps_the_result_count() {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(HashEmbedder::new());
        for i in 0..5 {
            seed_completed_job(&store, &embedder, "u1", &format!("topic number {i}")).await;
        }

        let engine = SearchEngine::new(Arc::clone(&store), Arc::clone(&embedder));
        let hits = engine.search("u1", "topic number", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
