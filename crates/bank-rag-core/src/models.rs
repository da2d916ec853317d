//! Core data models shared by the indexer, the stores, and the retriever.

use std::collections::BTreeMap;

use crate::chunk::content_hash;

/// Metadata key carrying the source file name of a knowledge chunk.
pub const SOURCE_KEY: &str = "source";

/// Metadata key carrying the customer number of a customer entry.
pub const CUSTOMER_ID_KEY: &str = "customer_id";

/// A contiguous window of a source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    /// File name of the document this chunk was cut from.
    pub source: String,
    pub chunk_index: i64,
    /// Character (not byte) offset of the window inside the document.
    pub start: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// A text paired with its embedding and string metadata.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub id: String,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
    pub vector: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

impl VectorEntry {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        vector: Vec<f32>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            hash: content_hash(&text),
            text,
            vector,
            metadata,
        }
    }

    /// Build an entry from a knowledge chunk, tagging it with its source.
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(SOURCE_KEY.to_string(), chunk.source.clone());
        Self {
            id: chunk.id.clone(),
            text: chunk.text.clone(),
            hash: chunk.hash.clone(),
            vector,
            metadata,
        }
    }
}

/// A search hit: the entry's text and metadata plus its cosine score.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f64,
}

impl ScoredEntry {
    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .map(String::as_str)
            .unwrap_or("Unbekannt")
    }
}

/// Exact-match constraint on one metadata key.
///
/// Stores apply the filter before ranking, so an entry whose tag differs can
/// never be returned regardless of its similarity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, metadata: &BTreeMap<String, String>) -> bool {
        metadata.get(&self.key) == Some(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_hashes_text() {
        let entry = VectorEntry::new("0", "Kunde A", vec![1.0], BTreeMap::new());
        assert_eq!(entry.hash, content_hash("Kunde A"));
        assert_eq!(entry.hash.len(), 64);
    }

    #[test]
    fn test_from_chunk_keeps_chunk_hash() {
        let chunk = Chunk {
            id: "c1".to_string(),
            source: "agb_regeln.txt".to_string(),
            chunk_index: 0,
            start: 0,
            text: "§ 2 Kündigung".to_string(),
            hash: "precomputed".to_string(),
        };
        let entry = VectorEntry::from_chunk(&chunk, vec![0.5]);
        assert_eq!(entry.hash, "precomputed");
        assert_eq!(entry.metadata[SOURCE_KEY], "agb_regeln.txt");
    }
}
