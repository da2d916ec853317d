//! In-memory [`VectorStore`] implementation.
//!
//! Holds entries in a `Vec` behind `std::sync::RwLock`. Search is
//! brute-force cosine similarity; the metadata filter is applied before
//! scoring so non-matching entries never become candidates.
//!
//! Used for the per-customer index, which is rebuilt from the CSV at every
//! start of the assistant, and in tests.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{MetadataFilter, ScoredEntry, VectorEntry};

use super::{top_k, VectorStore};

/// In-memory vector store.
pub struct InMemoryStore {
    entries: RwLock<Vec<VectorEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn insert(&self, entries: &[VectorEntry]) -> Result<()> {
        let mut stored = self
            .entries
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        for entry in entries {
            stored.retain(|e| e.id != entry.id);
            stored.push(entry.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        let stored = self
            .entries
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        let candidates: Vec<ScoredEntry> = stored
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(&e.metadata)))
            .map(|e| ScoredEntry {
                id: e.id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(query_vec, &e.vector) as f64,
            })
            .collect();
        Ok(top_k(candidates, limit))
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .entries
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))?;
        Ok(stored.len())
    }
}
