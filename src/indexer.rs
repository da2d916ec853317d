//! Knowledge indexing pipeline.
//!
//! Discovers the text files in the knowledge directory, splits them into
//! overlapping windows, embeds every window and writes a fresh SQLite
//! index. Each run replaces the previous index completely: the new index is
//! built in a staging file beside the target and renamed over it once it is
//! complete, so a failed run leaves the old index in place.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use bank_rag_core::chunk::{split_text, ChunkParams};
use bank_rag_core::embedding::EmbeddingProvider;
use bank_rag_core::models::{Chunk, VectorEntry};
use bank_rag_core::store::VectorStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::migrate;
use crate::sqlite_store::{IndexInfo, SqliteStore};

/// Counters reported after a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub files_found: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub chunks_written: usize,
}

/// Run the `index` command.
pub async fn run_index(config: &Config) -> Result<()> {
    let files = discover_files(&config.paths.knowledge_dir, &config.chunking.include_globs)?;
    if files.is_empty() {
        println!(
            "No text files found in {}; index left unchanged.",
            config.paths.knowledge_dir.display()
        );
        return Ok(());
    }

    let embedder = create_provider(&config.embedding)?;
    let stats = build_index(config, &files, embedder.as_ref()).await?;

    println!("index {}", config.paths.knowledge_store.display());
    println!("  files found: {}", stats.files_found);
    println!("  files indexed: {}", stats.files_indexed);
    println!("  files skipped: {}", stats.files_skipped);
    println!("  chunks written: {}", stats.chunks_written);
    println!("  model: {}", embedder.model_name());
    println!("ok");
    Ok(())
}

/// Top-level files of `dir` matching `include_globs`, sorted by name.
pub fn discover_files(dir: &Path, include_globs: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Knowledge directory does not exist: {}", dir.display());
    }
    let include_set = build_globset(include_globs)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if include_set.is_match(&name) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Chunk, embed and persist `files` into `config.paths.knowledge_store`.
///
/// Unreadable files are skipped. Embedding failures abort before the
/// existing index is touched.
pub async fn build_index(
    config: &Config,
    files: &[PathBuf],
    embedder: &dyn EmbeddingProvider,
) -> Result<IndexStats> {
    let params = ChunkParams::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
    let mut stats = IndexStats {
        files_found: files.len(),
        ..IndexStats::default()
    };

    let mut chunks: Vec<Chunk> = Vec::new();
    for path in files {
        let text = match std::fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                stats.files_skipped += 1;
                continue;
            }
        };
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let file_chunks = split_text(&source, &text, &params);
        debug!(source = %source, chunks = file_chunks.len(), "document split");
        chunks.extend(file_chunks);
        stats.files_indexed += 1;
    }

    let entries = embed_chunks(&chunks, embedder, config.embedding.batch_size).await?;

    let info = IndexInfo {
        model: embedder.model_name().to_string(),
        dims: embedder.dims(),
        chunk_size: params.chunk_size(),
        chunk_overlap: params.chunk_overlap(),
        built_at: chrono::Utc::now().to_rfc3339(),
    };
    write_index(&config.paths.knowledge_store, &entries, &info).await?;

    stats.chunks_written = entries.len();
    info!(
        files = stats.files_indexed,
        skipped = stats.files_skipped,
        chunks = stats.chunks_written,
        "knowledge index written"
    );
    Ok(stats)
}

async fn embed_chunks(
    chunks: &[Chunk],
    embedder: &dyn EmbeddingProvider,
    batch_size: usize,
) -> Result<Vec<VectorEntry>> {
    let mut entries = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .await
            .context("Failed to embed knowledge chunks")?;
        if vectors.len() != batch.len() {
            bail!(
                "Embedding provider returned {} vectors for {} chunks",
                vectors.len(),
                batch.len()
            );
        }
        entries.extend(
            batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| VectorEntry::from_chunk(chunk, vector)),
        );
        debug!(embedded = entries.len(), total = chunks.len(), "embedding progress");
    }
    Ok(entries)
}

/// Write a complete index to a staging file, then move it over `target`.
async fn write_index(target: &Path, entries: &[VectorEntry], info: &IndexInfo) -> Result<()> {
    let staging = staging_path(target);
    if staging.exists() {
        std::fs::remove_file(&staging).with_context(|| {
            format!("Failed to remove stale staging file: {}", staging.display())
        })?;
    }

    if let Err(e) = fill_staging(&staging, entries, info).await {
        let _ = std::fs::remove_file(&staging);
        return Err(e.context("Failed to write knowledge index"));
    }

    std::fs::rename(&staging, target).with_context(|| {
        format!(
            "Failed to replace knowledge store {} with {}",
            target.display(),
            staging.display()
        )
    })?;
    Ok(())
}

async fn fill_staging(staging: &Path, entries: &[VectorEntry], info: &IndexInfo) -> Result<()> {
    let pool = db::connect(staging).await?;
    let written: Result<()> = async {
        migrate::run_migrations(&pool).await?;
        let store = SqliteStore::new(pool.clone());
        store.insert(entries).await?;
        store.write_info(info).await
    }
    .await;
    pool.close().await;
    written
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "knowledge_store".to_string());
    target.with_file_name(format!("{}.staging", name))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
