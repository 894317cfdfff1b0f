mod error;
mod hash;
mod http;

pub use error::Error;
pub use hash::HashEmbedder;
pub use http::{HttpEmbedder, HttpEmbedderBuilder};

pub use murmur_job_interface::EMBEDDING_DIM;

use std::future::Future;

pub type Result<T> = std::result::Result<T, Error>;

/// Text to fixed-dimension unit vector, batched.
///
/// Implementations are pure functions of `(model, text)`: the same text maps
/// to the same vector for the life of the process. Output order matches
/// input order, every vector has [`EMBEDDING_DIM`] dimensions, and every
/// vector is L2-normalized.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;

    fn embed_one(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send
    where
        Self: Sized,
    {
        async move {
            let texts = vec![text.to_string()];
            let mut vecs = self.embed_batch(&texts).await?;
            vecs.pop()
                .ok_or_else(|| Error::MalformedResponse("empty batch result".to_string()))
        }
    }
}

pub fn l2_norm(vec: &[f32]) -> f32 {
    vec.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale to unit length in place. Zero vectors are left untouched and the
/// zero norm is returned so callers can decide what a zero embedding means.
pub fn normalize(vec: &mut [f32]) -> f32 {
    let norm = l2_norm(vec);
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
    norm
}
