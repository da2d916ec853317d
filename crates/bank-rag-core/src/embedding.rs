//! Embedding trait plus the vector helpers shared by both stores.
//!
//! Providers that call a model (HTTP or in-process) live in the `bank-rag`
//! app crate; this module stays free of I/O.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Turns texts into fixed-length vectors.
///
/// The knowledge index and the customer index must be queried with the
/// same provider they were built with. The SQLite index records
/// [`model_name`](EmbeddingProvider::model_name) for that check.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier, e.g. `"multilingual-e5-base"`.
    fn model_name(&self) -> &str;
    /// Vector length, e.g. `768`.
    fn dims(&self) -> usize;
    /// One vector per input text, same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single question.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let mut vectors = provider.embed(&[text.to_string()]).await?;
    if vectors.is_empty() {
        return Err(anyhow!(
            "{} returned no vector for the query",
            provider.model_name()
        ));
    }
    Ok(vectors.swap_remove(0))
}

/// Pack a vector into a SQLite BLOB, four little-endian bytes per value.
///
/// ```rust
/// use bank_rag_core::embedding::{blob_to_vec, vec_to_blob};
///
/// let blob = vec_to_blob(&[0.5, -1.0]);
/// assert_eq!(blob.len(), 8);
/// assert_eq!(blob_to_vec(&blob), vec![0.5, -1.0]);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Unpack a BLOB written by [`vec_to_blob`]. Trailing bytes that do not
/// form a whole `f32` are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity in `[-1, 1]`.
///
/// Mismatched lengths, empty input and zero vectors score `0.0`, so a
/// stale or corrupt vector ranks last instead of failing the search.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(d, x2, y2), (x, y)| {
            (d + x * y, x2 + x * x, y2 + y * y)
        });

    let norm = (sq_a * sq_b).sqrt();
    if norm < f32::EPSILON {
        0.0
    } else {
        dot / norm
    }
}
