//! Language-model clients.
//!
//! Generation is delegated to a model server over HTTP. Two wire formats
//! are supported:
//! - **[`OllamaChat`]**: `POST {url}/api/chat` with `stream: false`.
//! - **[`OpenAiChat`]**: any OpenAI-compatible `POST {url}/chat/completions`
//!   (Hugging Face router, vLLM, TGI, ...).
//!
//! Every request is a single user message and every call is bounded by
//! `llm.timeout_secs`. Calls are not retried; a failure or timeout is
//! returned to the caller. Only the assistant message content is returned,
//! never the echoed prompt.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::config::LlmConfig;

/// Decoding settings for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    /// `None` means greedy decoding.
    pub sampling: Option<Sampling>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationParams {
    pub fn deterministic(max_new_tokens: u32) -> Self {
        Self {
            max_new_tokens,
            sampling: None,
        }
    }

    pub fn sampled(max_new_tokens: u32, temperature: f32, top_p: f32) -> Self {
        Self {
            max_new_tokens,
            sampling: Some(Sampling { temperature, top_p }),
        }
    }

    fn temperature(&self) -> f32 {
        self.sampling.map_or(0.0, |s| s.temperature)
    }

    fn top_p(&self) -> f32 {
        self.sampling.map_or(1.0, |s| s.top_p)
    }
}

/// A text generator reachable by the assistant and the generators.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Send `prompt` as a single user message and return the reply text.
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

// ============ Ollama ============

pub struct OllamaChat {
    model: String,
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        Ok(Self {
            model: config.model.clone(),
            url,
            client: reqwest::Client::builder().build()?,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "options": {
                "temperature": params.temperature(),
                "top_p": params.top_p(),
                "num_predict": params.max_new_tokens,
            },
        });
        let endpoint = format!("{}/api/chat", self.url.trim_end_matches('/'));
        let request = self.client.post(&endpoint).json(&body);
        let json = send_bounded("Ollama", request, self.timeout)
            .await
            .map_err(|e| anyhow::anyhow!("{} (is Ollama running at {}?)", e, self.url))?;
        parse_ollama_chat(&json)
    }
}

fn parse_ollama_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}

// ============ OpenAI-compatible ============

pub struct OpenAiChat {
    model: String,
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiChat {
    /// The bearer token is read from the variable named by
    /// `llm.api_key_env`; a missing token is allowed for local servers.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.url required for openai provider"))?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::debug!(var = %config.api_key_env, "no API token set, sending unauthenticated requests");
        }
        Ok(Self {
            model: config.model.clone(),
            url,
            api_key,
            client: reqwest::Client::builder().build()?,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": params.max_new_tokens,
            "temperature": params.temperature(),
            "top_p": params.top_p(),
            "stream": false,
        });
        let endpoint = format!("{}/chat/completions", self.url.trim_end_matches('/'));
        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        let json = send_bounded("OpenAI-compatible", request, self.timeout).await?;
        parse_openai_chat(&json)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid chat completion response: missing choices[0].message.content")
        })
}

/// Send one request and decode the JSON reply, failing after `timeout`.
async fn send_bounded(
    label: &str,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<serde_json::Value> {
    let call = async {
        let response = request
            .send()
            .await
            .with_context(|| format!("{} connection error", label))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("{} API error {}: {}", label, status, body_text);
        }
        let json: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("{} returned invalid JSON", label))?;
        Ok::<_, anyhow::Error>(json)
    };

    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => bail!(
            "{} model call timed out after {}s",
            label,
            timeout.as_secs()
        ),
    }
}

/// Create the configured [`LanguageModel`].
///
/// | Config Value | Client |
/// |-------------|--------|
/// | `"ollama"` | [`OllamaChat`] |
/// | `"openai"` | [`OpenAiChat`] |
pub fn create_model(config: &LlmConfig) -> Result<Box<dyn LanguageModel>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        "openai" => Ok(Box::new(OpenAiChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ollama_chat_returns_only_content() {
        let json = serde_json::json!({
            "model": "mistral",
            "message": { "role": "assistant", "content": "Guten Tag!" },
            "done": true
        });
        assert_eq!(parse_ollama_chat(&json).unwrap(), "Guten Tag!");
    }

    #[test]
    fn test_parse_ollama_chat_missing_content() {
        let json = serde_json::json!({ "error": "model not found" });
        assert!(parse_ollama_chat(&json).is_err());
    }

    #[test]
    fn test_parse_openai_chat() {
        let json = serde_json::json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Antwort" } }
            ]
        });
        assert_eq!(parse_openai_chat(&json).unwrap(), "Antwort");
    }

    #[test]
    fn test_parse_openai_chat_empty_choices() {
        assert!(parse_openai_chat(&serde_json::json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_generation_params() {
        let greedy = GenerationParams::deterministic(512);
        assert_eq!(greedy.temperature(), 0.0);
        assert_eq!(greedy.top_p(), 1.0);

        let sampled = GenerationParams::sampled(4000, 0.7, 0.9);
        assert_eq!(sampled.temperature(), 0.7);
        assert_eq!(sampled.top_p(), 0.9);
        assert_eq!(sampled.max_new_tokens, 4000);
    }

    #[test]
    fn test_create_model_rejects_unknown() {
        let config = LlmConfig {
            provider: "openvino".to_string(),
            ..LlmConfig::default()
        };
        assert!(create_model(&config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails() {
        let config = LlmConfig {
            url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let model = OllamaChat::new(&config).unwrap();
        let result = model
            .generate("Hallo", &GenerationParams::deterministic(8))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections without ever answering.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = LlmConfig {
            url: Some(format!("http://{}", addr)),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let model = OllamaChat::new(&config).unwrap();
        let started = std::time::Instant::now();
        let err = model
            .generate("Hallo", &GenerationParams::deterministic(8))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.to_string().contains("timed out after 1s"), "{}", err);
        assert!(elapsed >= Duration::from_millis(900));
        assert!(elapsed < Duration::from_secs(10));
        server.abort();
    }
}
