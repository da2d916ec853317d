//! Fixed-window text splitter.
//!
//! Splits document text into [`Chunk`]s of at most `chunk_size` characters,
//! each overlapping its predecessor by `chunk_overlap` characters.
//!
//! # Algorithm
//!
//! 1. Count the document length `L` in chars (not bytes, so umlauts and
//!    other multibyte characters are never split).
//! 2. Emit windows `[s, min(s + C, L))` for `s = 0, C-O, 2(C-O), …`.
//! 3. Stop after the first window that reaches `L`.
//!
//! Start offsets therefore advance by exactly `C - O` and the final window
//! always ends at `L`: trailing content is never dropped.
//!
//! # Example
//!
//! ```rust
//! use bank_rag_core::chunk::{split_text, ChunkParams};
//!
//! let params = ChunkParams::new(10, 2).unwrap();
//! let chunks = split_text("agb.txt", "abcdefghijklmnopqrst", &params);
//! let starts: Vec<usize> = chunks.iter().map(|c| c.start).collect();
//! assert_eq!(starts, vec![0, 8, 16]);
//! assert_eq!(chunks[2].text, "qrst");
//! ```

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Window size and overlap, fixed for a whole indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkParams {
    /// Validate and build splitting parameters.
    ///
    /// # Errors
    ///
    /// Fails if `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Distance between consecutive window starts.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split `text` into overlapping windows tagged with `source`.
///
/// Empty or whitespace-only text yields no chunks.
pub fn split_text(source: &str, text: &str, params: &ChunkParams) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    // Byte offset of every char, plus the end, so windows slice on boundaries.
    let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    bounds.push(text.len());
    let len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index: i64 = 0;

    loop {
        let end = (start + params.chunk_size).min(len);
        let piece = &text[bounds[start]..bounds[end]];
        chunks.push(make_chunk(source, index, start, piece));
        if end == len {
            break;
        }
        start += params.stride();
        index += 1;
    }

    chunks
}

/// Hex-encoded SHA-256 of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(source: &str, index: i64, start: usize, text: &str) -> Chunk {
    Chunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        chunk_index: index,
        start,
        text: text.to_string(),
        hash: content_hash(text),
    }
}
