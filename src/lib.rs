//! # Bank RAG
//!
//! Retrieval-augmented assistant prototype for a cooperative bank.
//!
//! The crate generates synthetic customer data and policy clauses with a
//! language model, indexes the policy text into a SQLite vector store, and
//! runs an interactive assistant that answers a logged-in customer's
//! questions from two sources: the general knowledge index and that
//! customer's own record.
//!
//! ## Architecture
//!
//! ```text
//! generate-data ──▶ customers.csv ──────────────┐
//! generate-policy ─▶ knowledge/*.txt             │
//!                        │                       ▼
//!                        ▼               ┌───────────────┐
//!                 ┌─────────────┐        │ Auth gate +   │
//!                 │  Indexer    │        │ customer index│
//!                 │ chunk+embed │        └──────┬────────┘
//!                 └─────┬───────┘               │
//!                       ▼                       ▼
//!                 SQLite index ─────────▶ Retriever ──▶ Prompt ──▶ LLM
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Customer record and password-free profile |
//! | [`customers`] | CSV loading and the in-memory customer index |
//! | [`auth`] | Simulated login check |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Language-model clients |
//! | [`generate`] | Synthetic data and policy generators |
//! | [`indexer`] | Knowledge indexing pipeline |
//! | [`sqlite_store`] | SQLite vector store |
//! | [`retrieval`] | Dual retrieval |
//! | [`prompt`] | Prompt assembly |
//! | [`search`] | Knowledge search command |
//! | [`session`] | Interactive assistant loop |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod auth;
pub mod config;
pub mod customers;
pub mod db;
pub mod embedding;
pub mod generate;
pub mod indexer;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod retrieval;
pub mod search;
pub mod session;
pub mod sqlite_store;
