//! # Bank RAG Core
//!
//! Shared, I/O-free logic for the cooperative bank assistant: data models,
//! fixed-window chunking, the vector store abstraction with metadata
//! filtering, and the embedding trait.
//!
//! This crate contains no tokio, sqlx, filesystem or network access. The
//! `bank-rag` app crate supplies the SQLite store, the embedding providers,
//! and the language-model clients.

pub mod chunk;
pub mod embedding;
pub mod models;
pub mod store;
