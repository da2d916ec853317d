//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait is the seam between retrieval and storage: the
//! knowledge index is served from SQLite (`bank-rag`'s `SqliteStore`),
//! the per-customer index from [`memory::InMemoryStore`].
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{MetadataFilter, ScoredEntry, VectorEntry};

/// Abstract embedding index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](VectorStore::insert) | Add entries with their vectors and metadata |
/// | [`search`](VectorStore::search) | Cosine nearest neighbours, optionally filtered |
/// | [`count`](VectorStore::count) | Number of stored entries |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add entries. Entries with an existing id are replaced.
    async fn insert(&self, entries: &[VectorEntry]) -> Result<()>;

    /// Return up to `limit` entries ranked by cosine similarity to
    /// `query_vec`, best first.
    ///
    /// When `filter` is given, only entries whose metadata matches it are
    /// considered at all.
    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;
}

/// Rank scored entries best first and keep the top `limit`.
pub fn top_k(mut entries: Vec<ScoredEntry>, limit: usize) -> Vec<ScoredEntry> {
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(limit);
    entries
}
