//! Indexer and retrieval against a real SQLite file, with a deterministic
//! embedder standing in for the model.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use bank_rag::config::{parse_config, Config};
use bank_rag::customers::{build_customer_index, parse_customers};
use bank_rag::db;
use bank_rag::indexer::{build_index, discover_files};
use bank_rag::retrieval::{Retriever, NO_CUSTOMER_DATA, NO_KNOWLEDGE};
use bank_rag::sqlite_store::SqliteStore;
use bank_rag_core::embedding::EmbeddingProvider;
use bank_rag_core::store::VectorStore;

const DIMS: usize = 32;

/// Hashed bag-of-words vectors: texts sharing words end up close.
struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-test"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }
}

fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        let mut h = DefaultHasher::new();
        word.to_lowercase().hash(&mut h);
        v[(h.finish() % DIMS as u64) as usize] += 1.0;
    }
    v
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn model_name(&self) -> &str {
        "failing"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("embedding service down")
    }
}

const AGB: &str = "Nur Kunden der Risikoklasse 1, 2 oder 3 dürfen Genossenschaftsanteile erwerben. \
Kunden der Risikoklasse 4 und 5 sind vom Kauf weiterer Anteile ausgeschlossen. \
Genossenschaftsanteile kosten 500 Euro pro Anteil. Es können nur ganze Anteile gekauft werden.";

const FAQ: &str = "Die Filialen sind montags bis freitags von 9 bis 17 Uhr geöffnet. \
Das Online-Banking steht rund um die Uhr zur Verfügung.";

const CSV: &str = "\
Kundennummer,Nachname,Vorname,Passwort,Geburtsdatum,Kontoart,IBAN,Kontostand,Dispo_Limit,Ist_Mitglied,Anzahl_Genossenschaftsanteile,TAN_Verfahren,Risikoklasse
12345678,Muster,Anna,4321,1985-03-12,Girokonto,DE89370400440532013000,1520.35,2000,ja,3,TAN,2
87654321,Beispiel,Ben,0815,1995-07-01,Sparkonto,DE02120300000000202051,80.00,0,nein,0,PIN,5
";

fn setup(chunk_size: usize, chunk_overlap: usize) -> (TempDir, Config) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("knowledge_base")).unwrap();
    let cfg = parse_config(&format!(
        r#"[paths]
customers_csv = "{root}/knowledge_base/bank_daten.csv"
knowledge_dir = "{root}/knowledge_base"
knowledge_store = "{root}/vector_db/knowledge_store.sqlite"

[chunking]
chunk_size = {chunk_size}
chunk_overlap = {chunk_overlap}

[embedding]
batch_size = 3
"#,
        root = root.display(),
    ))
    .unwrap();
    (tmp, cfg)
}

fn knowledge_file(cfg: &Config, name: &str) -> PathBuf {
    cfg.paths.knowledge_dir.join(name)
}

async fn index(cfg: &Config) -> Result<bank_rag::indexer::IndexStats> {
    let files = discover_files(&cfg.paths.knowledge_dir, &cfg.chunking.include_globs)?;
    build_index(cfg, &files, &HashEmbedder).await
}

async fn open_store(cfg: &Config) -> SqliteStore {
    SqliteStore::new(
        db::connect_read_only(&cfg.paths.knowledge_store)
            .await
            .unwrap(),
    )
}

#[tokio::test]
async fn test_reindex_replaces_previous_index() {
    let (_tmp, cfg) = setup(80, 20);
    fs::write(knowledge_file(&cfg, "agb_regeln.txt"), AGB).unwrap();
    fs::write(knowledge_file(&cfg, "faq.txt"), FAQ).unwrap();

    let first = index(&cfg).await.unwrap();
    assert_eq!(first.files_indexed, 2);
    let store = open_store(&cfg).await;
    assert_eq!(store.count().await.unwrap(), first.chunks_written);
    store.close().await;

    fs::remove_file(knowledge_file(&cfg, "faq.txt")).unwrap();
    let second = index(&cfg).await.unwrap();
    assert_eq!(second.files_indexed, 1);
    assert!(second.chunks_written < first.chunks_written);

    let store = open_store(&cfg).await;
    assert_eq!(store.count().await.unwrap(), second.chunks_written);
    let hits = store
        .search(&hash_vector("Filialen geöffnet"), 50, None)
        .await
        .unwrap();
    assert!(hits.iter().all(|h| h.source() == "agb_regeln.txt"));
    store.close().await;
}

#[tokio::test]
async fn test_unreadable_file_is_skipped() {
    let (_tmp, cfg) = setup(600, 50);
    fs::write(knowledge_file(&cfg, "agb_regeln.txt"), AGB).unwrap();
    fs::write(knowledge_file(&cfg, "kaputt.txt"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
    fs::write(knowledge_file(&cfg, "leer.txt"), "   \n").unwrap();

    let stats = index(&cfg).await.unwrap();
    assert_eq!(stats.files_found, 3);
    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.files_indexed, 2);
    assert_eq!(stats.chunks_written, 1);
}

#[tokio::test]
async fn test_index_records_build_parameters() {
    let (_tmp, cfg) = setup(120, 30);
    fs::write(knowledge_file(&cfg, "agb_regeln.txt"), AGB).unwrap();
    index(&cfg).await.unwrap();

    let store = open_store(&cfg).await;
    let info = store.read_info().await.unwrap().unwrap();
    assert_eq!(info.model, "hash-test");
    assert_eq!(info.dims, DIMS);
    assert_eq!(info.chunk_size, 120);
    assert_eq!(info.chunk_overlap, 30);
    assert!(!info.built_at.is_empty());
    store.close().await;
}

#[tokio::test]
async fn test_failed_embedding_keeps_old_index() {
    let (_tmp, cfg) = setup(80, 20);
    fs::write(knowledge_file(&cfg, "agb_regeln.txt"), AGB).unwrap();
    let stats = index(&cfg).await.unwrap();

    fs::write(knowledge_file(&cfg, "faq.txt"), FAQ).unwrap();
    let files = discover_files(&cfg.paths.knowledge_dir, &cfg.chunking.include_globs).unwrap();
    assert!(build_index(&cfg, &files, &FailingEmbedder).await.is_err());

    let store = open_store(&cfg).await;
    assert_eq!(store.count().await.unwrap(), stats.chunks_written);
    store.close().await;
}

#[tokio::test]
async fn test_dual_retrieval_end_to_end() {
    let (_tmp, cfg) = setup(600, 50);
    fs::write(knowledge_file(&cfg, "agb_regeln.txt"), AGB).unwrap();
    fs::write(knowledge_file(&cfg, "faq.txt"), FAQ).unwrap();
    index(&cfg).await.unwrap();

    let data = parse_customers(CSV.as_bytes()).unwrap();
    let customers = build_customer_index(&data.profiles, &HashEmbedder)
        .await
        .unwrap();
    let retriever = Retriever::new(
        Some(Box::new(open_store(&cfg).await)),
        Box::new(customers),
        Box::new(HashEmbedder),
        1,
        1,
    );

    // The question names Ben, but Anna is logged in: only her record
    // may come back.
    let ctx = retriever
        .retrieve("Darf Ben Beispiel mit Risikoklasse 5 Genossenschaftsanteile kaufen?", "12345678")
        .await;
    assert!(ctx.knowledge.starts_with("Quelle agb_regeln.txt: "));
    assert!(ctx.customer.contains("Kundennummer: 12345678"));
    assert!(!ctx.customer.contains("87654321"));

    let ctx = retriever.retrieve("Kontostand?", "99999999").await;
    assert_eq!(ctx.customer, NO_CUSTOMER_DATA);
}

#[tokio::test]
async fn test_missing_index_gives_placeholder() {
    let (_tmp, cfg) = setup(600, 50);
    assert!(db::connect_read_only(&cfg.paths.knowledge_store).await.is_err());

    let data = parse_customers(CSV.as_bytes()).unwrap();
    let customers = build_customer_index(&data.profiles, &HashEmbedder)
        .await
        .unwrap();
    let retriever = Retriever::new(None, Box::new(customers), Box::new(HashEmbedder), 4, 1);
    let ctx = retriever.retrieve("Was kostet ein Anteil?", "87654321").await;
    assert_eq!(ctx.knowledge, NO_KNOWLEDGE);
    assert!(ctx.customer.contains("Kunde Ben Beispiel"));
}
