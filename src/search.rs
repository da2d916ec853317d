//! `search` command: query the knowledge index without the language model.

use anyhow::{bail, Result};
use tracing::warn;

use bank_rag_core::embedding::{embed_query, EmbeddingProvider};
use bank_rag_core::models::ScoredEntry;
use bank_rag_core::store::VectorStore;

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::retrieval::preview;
use crate::sqlite_store::SqliteStore;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    let limit = limit.unwrap_or(config.retrieval.knowledge_k);
    if limit == 0 {
        bail!("--limit must be > 0");
    }

    let pool = db::connect_read_only(&config.paths.knowledge_store).await?;
    let store = SqliteStore::new(pool);
    let embedder = create_provider(&config.embedding)?;

    check_index_model(&store, embedder.as_ref()).await;

    let query_vec = embed_query(embedder.as_ref(), query).await?;
    let results = store.search(&query_vec, limit, None).await?;
    store.close().await;

    print_results(&results);
    Ok(())
}

/// Warn when the index was built with a different embedding model.
pub async fn check_index_model(store: &SqliteStore, embedder: &dyn EmbeddingProvider) {
    match store.read_info().await {
        Ok(Some(info)) if info.model != embedder.model_name() => warn!(
            index_model = %info.model,
            query_model = %embedder.model_name(),
            "knowledge index was built with a different embedding model; rerun `bankbot index`"
        ),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not read knowledge index metadata"),
    }
}

fn print_results(results: &[ScoredEntry]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, result) in results.iter().enumerate() {
        println!("{}. [{:.2}] {}", i + 1, result.score, result.source());
        println!("    excerpt: \"{}\"", preview(&result.text).trim());
        println!("    id: {}", result.id);
        println!();
    }
}
