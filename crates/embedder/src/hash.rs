use sha2::{Digest, Sha256};

use crate::{EMBEDDING_DIM, Embedder, Result, normalize};

/// Deterministic feature-hashed bag-of-words embedder.
///
/// Each lowercased alphanumeric token is hashed into one of
/// [`EMBEDDING_DIM`] buckets and the bucket counts are L2-normalized, so
/// texts sharing vocabulary land near each other under cosine similarity.
/// No model weights, no network: this is the offline/test stand-in for a
/// real embedding model. Empty text maps to the fixed unit vector `e0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn embed_text(text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; EMBEDDING_DIM];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let lowered = token.to_lowercase();
            let digest = Sha256::digest(lowered.as_bytes());
            let bucket = digest
                .iter()
                .take(8)
                .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
            vec[(bucket % EMBEDDING_DIM as u64) as usize] += 1.0;
            tokens += 1;
        }

        if tokens == 0 {
            vec[0] = 1.0;
            return vec;
        }

        normalize(&mut vec);
        vec
    }
}

impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::l2_norm;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn vectors_are_unit_norm() {
        let embedder = HashEmbedder::new();
        for text in ["hello world", "a", "the quick brown fox jumps over the lazy dog"] {
            let vec = embedder.embed_one(text).await.unwrap();
            assert_eq!(vec.len(), EMBEDDING_DIM);
            assert_relative_eq!(l2_norm(&vec), 1.0, epsilon = 1e-3);
        }
    }

    #[tokio::test]
    async fn same_text_same_vector() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed_one("photosynthesis in plants").await.unwrap();
        let b = embedder.embed_one("photosynthesis in plants").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn empty_text_is_the_fixed_unit_vector() {
        let embedder = HashEmbedder::new();
        let vec = embedder.embed_one("").await.unwrap();
        assert_relative_eq!(vec[0], 1.0);
        assert_relative_eq!(l2_norm(&vec), 1.0, epsilon = 1e-6);
    }

    #[tokio::test]
    async fn batch_order_matches_input_order() {
        let embedder = HashEmbedder::new();
        let texts = vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 3);
        for (text, vec) in texts.iter().zip(&batch) {
            assert_eq!(vec, &embedder.embed_one(text).await.unwrap());
        }
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::new();
        let query = embedder.embed_one("how plants make energy").await.unwrap();
        let photosynthesis = embedder
            .embed_one("photosynthesis in plants")
            .await
            .unwrap();
        let bread = embedder.embed_one("recipe for bread").await.unwrap();

        assert!(dot(&query, &photosynthesis) > dot(&query, &bread));
    }

    #[tokio::test]
    async fn casing_does_not_change_the_vector() {
        let embedder = HashEmbedder::new();
        let a = embedder.embed_one("Hello World").await.unwrap();
        let b = embedder.embed_one("hello world").await.unwrap();
        assert_eq!(a, b);
    }
}
