//! Interactive assistant: login gate plus the question/answer loop.
//!
//! All state is built once by [`AppContext::load`] and passed by reference
//! into [`run_session`]. The loop alternates between two states:
//!
//! - **logged out**: ask for customer number and password. An exit keyword
//!   (or end of input) ends the session.
//! - **logged in**: answer questions for that customer. An exit keyword
//!   logs out and returns to the login prompt.
//!
//! Each question is answered independently; nothing is carried across
//! turns.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use bank_rag_core::store::VectorStore;

use crate::auth::AuthGate;
use crate::config::Config;
use crate::customers::{build_customer_index, load_customers, CustomerData};
use crate::db;
use crate::embedding::create_provider;
use crate::llm::{create_model, GenerationParams, LanguageModel};
use crate::prompt::build_prompt;
use crate::retrieval::Retriever;
use crate::search::check_index_model;
use crate::sqlite_store::SqliteStore;

/// Input words that leave the current state (case-insensitive).
pub const EXIT_KEYWORDS: [&str; 3] = ["q", "logout", "exit"];

pub fn is_exit(input: &str) -> bool {
    let word = input.trim().to_lowercase();
    EXIT_KEYWORDS.contains(&word.as_str())
}

/// Everything the assistant needs, built once at startup.
pub struct AppContext {
    auth: AuthGate,
    customers: CustomerData,
    retriever: Retriever,
    model: Box<dyn LanguageModel>,
    max_new_tokens: u32,
}

impl AppContext {
    pub fn new(
        auth: AuthGate,
        customers: CustomerData,
        retriever: Retriever,
        model: Box<dyn LanguageModel>,
        max_new_tokens: u32,
    ) -> Self {
        Self {
            auth,
            customers,
            retriever,
            model,
            max_new_tokens,
        }
    }

    /// Load the customer table, build both indexes and the model client.
    ///
    /// A missing customer file or an unusable embedding/model
    /// configuration is fatal. A missing knowledge index is not: the
    /// assistant then answers with the knowledge placeholder.
    pub async fn load(config: &Config) -> Result<Self> {
        let mut data = load_customers(&config.paths.customers_csv)?;
        let auth = AuthGate::new(std::mem::take(&mut data.credentials));

        let embedder = create_provider(&config.embedding)?;
        let customer_index = build_customer_index(&data.profiles, embedder.as_ref()).await?;

        let knowledge: Option<Box<dyn VectorStore>> =
            match db::connect_read_only(&config.paths.knowledge_store).await {
                Ok(pool) => {
                    let store = SqliteStore::new(pool);
                    check_index_model(&store, embedder.as_ref()).await;
                    info!(path = %config.paths.knowledge_store.display(), "knowledge index opened");
                    Some(Box::new(store) as Box<dyn VectorStore>)
                }
                Err(e) => {
                    warn!(error = %e, "knowledge index unavailable, answering without it");
                    None
                }
            };

        let retriever = Retriever::new(
            knowledge,
            Box::new(customer_index),
            embedder,
            config.retrieval.knowledge_k,
            config.retrieval.customer_k,
        );
        let model = create_model(&config.llm).context("Failed to create language model client")?;
        info!(model = model.model_name(), "language model client ready");

        Ok(Self::new(
            auth,
            data,
            retriever,
            model,
            config.llm.max_new_tokens,
        ))
    }

    /// Answer one question for the logged-in customer.
    pub async fn answer(&self, question: &str, customer_id: &str) -> Result<String> {
        let context = self.retriever.retrieve(question, customer_id).await;
        let prompt = build_prompt(&context.knowledge, &context.customer, question);
        let params = GenerationParams::deterministic(self.max_new_tokens);
        let reply = self
            .model
            .generate(&prompt, &params)
            .await
            .context("Answer generation failed")?;
        Ok(reply.trim().to_string())
    }
}

/// Run the `chat` command on the process console.
pub async fn run_chat(config: &Config) -> Result<()> {
    let ctx = AppContext::load(config).await?;
    println!("\nSystem bereit! Bitte anmelden.");
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_session(&ctx, stdin.lock(), stdout.lock()).await
}

/// Drive the login/question loop until exit or end of input.
pub async fn run_session<R: BufRead, W: Write>(
    ctx: &AppContext,
    mut input: R,
    mut output: W,
) -> Result<()> {
    let mut logged_in: Option<String> = None;

    loop {
        match logged_in.clone() {
            None => {
                write!(output, "\nKundennummer (oder 'q'): ")?;
                output.flush()?;
                let Some(customer_id) = read_line(&mut input)? else {
                    break;
                };
                if is_exit(&customer_id) {
                    break;
                }

                write!(output, "Passwort: ")?;
                output.flush()?;
                let Some(secret) = read_line(&mut input)? else {
                    break;
                };

                if ctx.auth.check(&customer_id, &secret) {
                    let id = customer_id.trim().to_string();
                    match ctx.customers.profile(&id) {
                        Some(profile) => writeln!(
                            output,
                            "\nAnmeldung erfolgreich. Willkommen, {}! Sie können nun Fragen stellen.",
                            profile.display_name()
                        )?,
                        None => writeln!(
                            output,
                            "\nAnmeldung erfolgreich. Sie können nun Fragen stellen."
                        )?,
                    }
                    info!(customer_id = %id, "customer logged in");
                    logged_in = Some(id);
                } else {
                    writeln!(output, "Login fehlgeschlagen.")?;
                }
            }
            Some(customer_id) => {
                write!(output, "\nFrage (Kunde {}): ", customer_id)?;
                output.flush()?;
                let Some(question) = read_line(&mut input)? else {
                    break;
                };
                if is_exit(&question) {
                    writeln!(output, "--- Logout ---")?;
                    info!(customer_id = %customer_id, "customer logged out");
                    logged_in = None;
                    continue;
                }
                if question.trim().is_empty() {
                    continue;
                }

                writeln!(output, "...")?;
                output.flush()?;
                let answer = ctx.answer(question.trim(), &customer_id).await?;
                writeln!(output, "Assistent: {}", answer)?;
                writeln!(output, "{}", "-".repeat(40))?;
            }
        }
    }

    writeln!(output, "\nAuf Wiedersehen.")?;
    output.flush()?;
    Ok(())
}

/// One line without its terminator; `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context("Failed to read input")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
}
