//! SQLite-backed [`VectorStore`] implementation for the knowledge index.
//!
//! Vectors are stored as little-endian `f32` BLOBs and ranked in Rust by
//! cosine similarity. The metadata filter is part of the SQL `WHERE`
//! clause, so filtered-out rows are never loaded.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use bank_rag_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use bank_rag_core::models::{MetadataFilter, ScoredEntry, VectorEntry};
use bank_rag_core::store::{top_k, VectorStore};

/// Build parameters recorded alongside the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub model: String,
    pub dims: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub built_at: String,
}

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Record the parameters the index was built with.
    pub async fn write_info(&self, info: &IndexInfo) -> Result<()> {
        let pairs = [
            ("model", info.model.clone()),
            ("dims", info.dims.to_string()),
            ("chunk_size", info.chunk_size.to_string()),
            ("chunk_overlap", info.chunk_overlap.to_string()),
            ("built_at", info.built_at.clone()),
        ];
        for (key, value) in pairs {
            sqlx::query(
                r#"
                INSERT INTO index_meta (key, value) VALUES (?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Read the build parameters, if the index has them.
    pub async fn read_info(&self) -> Result<Option<IndexInfo>> {
        let rows = sqlx::query("SELECT key, value FROM index_meta")
            .fetch_all(&self.pool)
            .await?;
        let meta: BTreeMap<String, String> = rows
            .iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect();

        let field = |key: &str| meta.get(key).cloned();
        let number = |key: &str| meta.get(key).and_then(|v| v.parse::<usize>().ok());

        Ok(match (
            field("model"),
            number("dims"),
            number("chunk_size"),
            number("chunk_overlap"),
        ) {
            (Some(model), Some(dims), Some(chunk_size), Some(chunk_overlap)) => Some(IndexInfo {
                model,
                dims,
                chunk_size,
                chunk_overlap,
                built_at: field("built_at").unwrap_or_default(),
            }),
            _ => None,
        })
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn insert(&self, entries: &[VectorEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            sqlx::query("DELETE FROM entry_metadata WHERE entry_id = ?")
                .bind(&entry.id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO entries (id, text, hash) VALUES (?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    text = excluded.text,
                    hash = excluded.hash
                "#,
            )
            .bind(&entry.id)
            .bind(&entry.text)
            .bind(&entry.hash)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO entry_vectors (entry_id, embedding) VALUES (?, ?)
                ON CONFLICT(entry_id) DO UPDATE SET embedding = excluded.embedding
                "#,
            )
            .bind(&entry.id)
            .bind(vec_to_blob(&entry.vector))
            .execute(&mut *tx)
            .await?;

            for (key, value) in &entry.metadata {
                sqlx::query("INSERT INTO entry_metadata (entry_id, key, value) VALUES (?, ?, ?)")
                    .bind(&entry.id)
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredEntry>> {
        let rows = match filter {
            Some(f) => {
                sqlx::query(
                    r#"
                    SELECT e.id, e.text, v.embedding
                    FROM entries e
                    JOIN entry_vectors v ON v.entry_id = e.id
                    WHERE EXISTS (
                        SELECT 1 FROM entry_metadata m
                        WHERE m.entry_id = e.id AND m.key = ? AND m.value = ?
                    )
                    "#,
                )
                .bind(&f.key)
                .bind(&f.value)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT e.id, e.text, v.embedding
                    FROM entries e
                    JOIN entry_vectors v ON v.entry_id = e.id
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let candidates: Vec<ScoredEntry> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = blob_to_vec(&blob);
                ScoredEntry {
                    id: row.get("id"),
                    text: row.get("text"),
                    metadata: BTreeMap::new(),
                    score: cosine_similarity(query_vec, &vec) as f64,
                }
            })
            .collect();

        let mut hits = top_k(candidates, limit);
        if hits.is_empty() {
            return Ok(hits);
        }

        // Metadata for all hits in one round trip.
        let placeholders = vec!["?"; hits.len()].join(", ");
        let sql = format!(
            "SELECT entry_id, key, value FROM entry_metadata WHERE entry_id IN ({})",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for hit in &hits {
            query = query.bind(&hit.id);
        }
        let mut by_entry: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        for row in query.fetch_all(&self.pool).await? {
            by_entry
                .entry(row.get("entry_id"))
                .or_default()
                .insert(row.get("key"), row.get("value"));
        }
        for hit in &mut hits {
            hit.metadata = by_entry.remove(&hit.id).unwrap_or_default();
        }

        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entry_vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }
}
