//! TOML configuration parsing and validation.
//!
//! Every command reads the same file (default `./config/bankbot.toml`).
//! Sections other than `[paths]` may be omitted and fall back to the
//! defaults below, which reproduce the prototype's fixed constants.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub paths: PathsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Customer CSV written by `generate-data` and read by `chat`.
    pub customers_csv: PathBuf,
    /// Directory of policy/knowledge text files.
    pub knowledge_dir: PathBuf,
    /// SQLite file holding the persisted knowledge index.
    pub knowledge_store: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            include_globs: default_include_globs(),
        }
    }
}

fn default_chunk_size() -> usize {
    600
}
fn default_chunk_overlap() -> usize {
    50
}
fn default_include_globs() -> Vec<String> {
    vec!["*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of knowledge chunks placed in the prompt.
    #[serde(default = "default_knowledge_k")]
    pub knowledge_k: usize,
    /// Number of customer records placed in the prompt.
    #[serde(default = "default_customer_k")]
    pub customer_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            knowledge_k: default_knowledge_k(),
            customer_k: default_customer_k(),
        }
    }
}

fn default_knowledge_k() -> usize {
    4
}
fn default_customer_k() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: Some("multilingual-e5-base".to_string()),
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// `ollama` or `openai` (any OpenAI-compatible chat completions API).
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding an optional bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    /// Upper bound for a single model call.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            url: None,
            api_key_env: default_api_key_env(),
            max_new_tokens: default_max_new_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_llm_model() -> String {
    "mistral:7b-instruct-v0.2-q4_0".to_string()
}
fn default_api_key_env() -> String {
    "HF_TOKEN".to_string()
}
fn default_max_new_tokens() -> u32 {
    512
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    /// Number of customer rows requested from the model.
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_data_max_new_tokens")]
    pub data_max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            data_max_new_tokens: default_data_max_new_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

fn default_rows() -> usize {
    35
}
fn default_data_max_new_tokens() -> u32 {
    4000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }
    if config.chunking.include_globs.is_empty() {
        anyhow::bail!("chunking.include_globs must not be empty");
    }

    // Validate retrieval
    if config.retrieval.knowledge_k < 1 {
        anyhow::bail!("retrieval.knowledge_k must be >= 1");
    }
    if config.retrieval.customer_k < 1 {
        anyhow::bail!("retrieval.customer_k must be >= 1");
    }

    // Validate embedding
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "ollama" => {}
        "openai" => {
            if config.llm.url.is_none() {
                anyhow::bail!("llm.url must be specified when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be ollama or openai.",
            other
        ),
    }
    if config.llm.max_new_tokens == 0 {
        anyhow::bail!("llm.max_new_tokens must be > 0");
    }
    if config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    if config.generator.rows == 0 {
        anyhow::bail!("generator.rows must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[paths]
customers_csv = "knowledge_base/bank_daten.csv"
knowledge_dir = "knowledge_base"
knowledge_store = "vector_db/knowledge_store.sqlite"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 600);
        assert_eq!(cfg.chunking.chunk_overlap, 50);
        assert_eq!(cfg.retrieval.knowledge_k, 4);
        assert_eq!(cfg.retrieval.customer_k, 1);
        assert_eq!(cfg.embedding.provider, "local");
        assert_eq!(
            cfg.embedding.model.as_deref(),
            Some("multilingual-e5-base")
        );
        assert_eq!(cfg.llm.max_new_tokens, 512);
        assert_eq!(cfg.llm.api_key_env, "HF_TOKEN");
        assert_eq!(cfg.generator.rows, 35);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let toml = format!("{}\n[chunking]\nchunk_size = 50\nchunk_overlap = 50\n", MINIMAL);
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_remote_embedding_requires_dims() {
        let toml = format!(
            "{}\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n",
            MINIMAL
        );
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn test_unknown_llm_provider_rejected() {
        let toml = format!("{}\n[llm]\nprovider = \"openvino\"\n", MINIMAL);
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("openvino"));
    }

    #[test]
    fn test_openai_llm_requires_url() {
        let toml = format!("{}\n[llm]\nprovider = \"openai\"\n", MINIMAL);
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let cfg = parse_config(include_str!("../config/bankbot.example.toml")).unwrap();
        assert_eq!(cfg.llm.provider, "ollama");
        assert_eq!(cfg.chunking.include_globs, vec!["*.txt".to_string()]);
    }

    #[test]
    fn test_missing_paths_section_fails() {
        assert!(parse_config("[chunking]\nchunk_size = 100\n").is_err());
    }
}
