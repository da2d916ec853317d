//! Customer CSV loading and the in-memory customer index.
//!
//! The CSV is read once at startup of `chat`. Each row is split into the
//! credential (handed to [`AuthGate`](crate::auth::AuthGate)) and a
//! [`CustomerProfile`]; only profiles are embedded.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use bank_rag_core::embedding::EmbeddingProvider;
use bank_rag_core::models::{VectorEntry, CUSTOMER_ID_KEY};
use bank_rag_core::store::memory::InMemoryStore;
use bank_rag_core::store::VectorStore;

use crate::models::{CustomerProfile, CustomerRecord};

/// Loaded customer table, already separated into credentials and profiles.
#[derive(Debug, Default)]
pub struct CustomerData {
    /// Profiles in file order.
    pub profiles: Vec<CustomerProfile>,
    /// `customer_id -> password`.
    pub credentials: HashMap<String, String>,
}

impl CustomerData {
    pub fn profile(&self, customer_id: &str) -> Option<&CustomerProfile> {
        let id = customer_id.trim();
        self.profiles.iter().find(|p| p.customer_id == id)
    }
}

/// Read the customer CSV. A missing or unreadable file is an error;
/// malformed rows are logged and skipped.
pub fn load_customers(path: &Path) -> Result<CustomerData> {
    let file = std::fs::File::open(path).with_context(|| {
        format!(
            "Customer file not found: {} (run `bankbot generate-data` first)",
            path.display()
        )
    })?;
    let data = parse_customers(file)
        .with_context(|| format!("Failed to read customer file: {}", path.display()))?;
    info!(
        customers = data.profiles.len(),
        path = %path.display(),
        "customer records loaded"
    );
    Ok(data)
}

pub fn parse_customers<R: Read>(reader: R) -> Result<CustomerData> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    // Header problems (missing Kundennummer/Passwort columns) surface on the
    // first row; an unreadable header line is fatal.
    rdr.headers().context("CSV header row is unreadable")?;

    let mut data = CustomerData::default();
    for (i, row) in rdr.deserialize::<CustomerRecord>().enumerate() {
        // Line 1 is the header.
        let line = i + 2;
        let record = match row {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "skipping malformed customer row");
                continue;
            }
        };
        if record.customer_id.is_empty() {
            warn!(line, "skipping customer row without Kundennummer");
            continue;
        }
        if data.credentials.contains_key(&record.customer_id) {
            warn!(line, customer_id = %record.customer_id, "skipping duplicate Kundennummer");
            continue;
        }

        let (password, profile) = record.into_parts();
        data.credentials
            .insert(profile.customer_id.clone(), password);
        data.profiles.push(profile);
    }

    Ok(data)
}

/// Embed every profile into a fresh in-memory store. Entry ids are the row
/// positions; each entry is tagged with its customer number.
pub async fn build_customer_index(
    profiles: &[CustomerProfile],
    embedder: &dyn EmbeddingProvider,
) -> Result<InMemoryStore> {
    let store = InMemoryStore::new();
    if profiles.is_empty() {
        return Ok(store);
    }

    let texts: Vec<String> = profiles.iter().map(|p| p.retrieval_text()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .context("Failed to embed customer records")?;
    if vectors.len() != texts.len() {
        anyhow::bail!(
            "Embedding provider returned {} vectors for {} customer records",
            vectors.len(),
            texts.len()
        );
    }

    let entries: Vec<VectorEntry> = profiles
        .iter()
        .zip(texts)
        .zip(vectors)
        .enumerate()
        .map(|(i, ((profile, text), vector))| {
            let mut metadata = BTreeMap::new();
            metadata.insert(CUSTOMER_ID_KEY.to_string(), profile.customer_id.clone());
            VectorEntry::new(i.to_string(), text, vector, metadata)
        })
        .collect();

    store.insert(&entries).await?;
    info!(entries = entries.len(), "customer index ready");
    Ok(store)
}
