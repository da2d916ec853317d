//! Dual retrieval: general knowledge plus the logged-in customer's record.
//!
//! The question is embedded once and the vector is used against both
//! stores. The customer lookup always carries an equality filter on the
//! authenticated customer number, which the store applies before ranking,
//! so another customer's entry can never be a candidate.
//!
//! Any retrieval failure degrades to a fixed placeholder; the assistant
//! keeps answering with whatever context is left.

use tracing::{info, warn};

use bank_rag_core::embedding::{embed_query, EmbeddingProvider};
use bank_rag_core::models::{MetadataFilter, ScoredEntry, CUSTOMER_ID_KEY};
use bank_rag_core::store::VectorStore;

/// Knowledge context used when the index is missing, empty or failing.
pub const NO_KNOWLEDGE: &str = "Keine allgemeinen Infos verfügbar.";

/// Customer context used when no record matches the logged-in customer.
pub const NO_CUSTOMER_DATA: &str = "Keine Kundendaten gefunden.";

const PREVIEW_CHARS: usize = 100;

/// The two prompt contexts for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedContext {
    pub knowledge: String,
    pub customer: String,
}

pub struct Retriever {
    knowledge: Option<Box<dyn VectorStore>>,
    customers: Box<dyn VectorStore>,
    embedder: Box<dyn EmbeddingProvider>,
    knowledge_k: usize,
    customer_k: usize,
}

impl Retriever {
    /// `knowledge` is `None` when no persisted index could be opened.
    pub fn new(
        knowledge: Option<Box<dyn VectorStore>>,
        customers: Box<dyn VectorStore>,
        embedder: Box<dyn EmbeddingProvider>,
        knowledge_k: usize,
        customer_k: usize,
    ) -> Self {
        Self {
            knowledge,
            customers,
            embedder,
            knowledge_k,
            customer_k,
        }
    }

    /// Retrieve both contexts for `question` on behalf of `customer_id`.
    pub async fn retrieve(&self, question: &str, customer_id: &str) -> RetrievedContext {
        let query_vec = match embed_query(self.embedder.as_ref(), question).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "failed to embed question, answering without context");
                return RetrievedContext {
                    knowledge: NO_KNOWLEDGE.to_string(),
                    customer: NO_CUSTOMER_DATA.to_string(),
                };
            }
        };

        RetrievedContext {
            knowledge: self.knowledge_context(&query_vec).await,
            customer: self.customer_context(&query_vec, customer_id).await,
        }
    }

    /// Top-K knowledge chunks as `Quelle {source}: {text}` blocks.
    pub async fn knowledge_context(&self, query_vec: &[f32]) -> String {
        let Some(store) = &self.knowledge else {
            return NO_KNOWLEDGE.to_string();
        };

        let hits = match store.search(query_vec, self.knowledge_k, None).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "knowledge search failed");
                return NO_KNOWLEDGE.to_string();
            }
        };

        if hits.is_empty() {
            info!("no matching knowledge chunks");
            return NO_KNOWLEDGE.to_string();
        }

        info!(count = hits.len(), "knowledge chunks retrieved");
        for (i, hit) in hits.iter().enumerate() {
            info!(
                chunk = i + 1,
                source = %hit.source(),
                score = hit.score,
                preview = %preview(&hit.text),
                "knowledge chunk"
            );
        }

        format_knowledge(&hits)
    }

    /// Best customer entry tagged with `customer_id`.
    pub async fn customer_context(&self, query_vec: &[f32], customer_id: &str) -> String {
        let filter = MetadataFilter::eq(CUSTOMER_ID_KEY, customer_id.trim());
        match self
            .customers
            .search(query_vec, self.customer_k, Some(&filter))
            .await
        {
            Ok(hits) if !hits.is_empty() => {
                info!(customer_id = %filter.value, "customer record retrieved");
                hits.iter()
                    .map(|h| h.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Ok(_) => {
                warn!(customer_id = %filter.value, "no customer record found");
                NO_CUSTOMER_DATA.to_string()
            }
            Err(e) => {
                warn!(error = %e, "customer search failed");
                NO_CUSTOMER_DATA.to_string()
            }
        }
    }
}

fn format_knowledge(hits: &[ScoredEntry]) -> String {
    hits.iter()
        .map(|h| format!("Quelle {}: {}", h.source(), h.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First characters of `text` on a single line.
pub fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", cut)
    }
}
