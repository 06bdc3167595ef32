//! LLM backend trait and concrete implementations.
//!
//! `OpenAiCompatibleBackend` covers Groq (the default), OpenAI and any other
//! `/v1/chat/completions` provider. `OllamaBackend` adds Ollama's native
//! embeddings endpoint.

use std::sync::Arc;

use amitybot_common::config::{LlmBackendKind, LlmConfig};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Empty completion from {0}")]
    EmptyCompletion(String),
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError>;
    fn model_id(&self) -> &str;
    fn backend_name(&self) -> &'static str;
    fn is_local(&self) -> bool;
}

/// Build the backend selected in `[llm]`.
pub fn build_backend(cfg: &LlmConfig) -> Arc<dyn LlmBackend> {
    let api_key = cfg.api_key.as_ref().map(|k| k.expose_secret().to_string());
    match cfg.backend {
        LlmBackendKind::OpenAiCompatible => {
            Arc::new(OpenAiCompatibleBackend::new(cfg.endpoint(), &cfg.model, api_key))
        }
        LlmBackendKind::OpenAi => {
            Arc::new(OpenAiCompatibleBackend::openai(api_key.unwrap_or_default(), &cfg.model))
        }
        LlmBackendKind::Ollama => Arc::new(OllamaBackend::new(cfg.endpoint(), &cfg.model)),
    }
}

// ── Helpers: OpenAI-style wire format ────────────────────────────────────────

fn chat_body(req: &LlmRequest, default_model: &str) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model":       req.model.as_deref().unwrap_or(default_model),
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(1000),
        "temperature": req.temperature.unwrap_or(0.7),
    });
    if let Some(top_p) = req.top_p {
        body["top_p"] = serde_json::json!(top_p);
    }
    body
}

pub(crate) fn parse_openai_response(
    json: &serde_json::Value,
    fallback_model: &str,
) -> Result<LlmResponse, LlmError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(LlmError::EmptyCompletion(fallback_model.to_string()));
    }
    Ok(LlmResponse {
        content,
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    })
}

pub(crate) fn parse_openai_embeddings(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, LlmError> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| LlmError::Unavailable("embedding response has no data array".to_string()))?;
    data.iter()
        .map(|item| -> Result<Vec<f32>, LlmError> {
            Ok(serde_json::from_value(item["embedding"].clone())?)
        })
        .collect()
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    if status >= 400 {
        let body: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| text.chars().take(200).collect());
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(serde_json::from_str(&text)?)
}

// ── OpenAI-compatible chat and embeddings ───────────────────────────────────

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Client for any endpoint speaking the OpenAI `/v1` wire format.
/// OpenAI itself is the same client pointed at api.openai.com.
pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    pub embedding_model: Option<String>,
    api_key: Option<String>,
    name: &'static str,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            embedding_model: None,
            api_key,
            name: "openai_compatible",
            client: reqwest::Client::new(),
        }
    }

    /// The hosted OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let mut backend = Self::new(OPENAI_BASE_URL, model, Some(api_key.into()))
            .with_embedding_model(OPENAI_EMBEDDING_MODEL);
        backend.name = "openai";
        backend
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, LlmError> {
        let mut req = self.client.post(self.url(path)).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        check_response_status(req.send().await?).await
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let json = self.post_json("chat/completions", &chat_body(&req, &self.model)).await?;
        parse_openai_response(&json, &self.model)
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        let model = self.embedding_model.as_deref().unwrap_or(&self.model);
        let json = self
            .post_json("embeddings", &serde_json::json!({ "model": model, "input": texts }))
            .await?;
        parse_openai_embeddings(&json)
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &'static str { self.name }
    fn is_local(&self) -> bool { false }
}

// ── Ollama (local) ───────────────────────────────────────────────────────────

/// Local Ollama: chat through its OpenAI-compatible endpoint, embeddings
/// through the native `/api/embeddings`, one text per call.
pub struct OllamaBackend {
    chat: OpenAiCompatibleBackend,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { chat: OpenAiCompatibleBackend::new(base_url, model, None) }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.chat.complete(req).await
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/api/embeddings", self.chat.base_url.trim_end_matches('/'));
        let mut vectors = Vec::with_capacity(texts.len());
        for prompt in texts {
            let body = serde_json::json!({ "model": self.chat.model, "prompt": prompt });
            let resp = self.chat.client.post(&url).json(&body).send().await?;
            let json = check_response_status(resp).await?;
            vectors.push(serde_json::from_value(json["embedding"].clone())?);
        }
        Ok(vectors)
    }

    fn model_id(&self) -> &str { self.chat.model_id() }
    fn backend_name(&self) -> &'static str { "ollama" }
    fn is_local(&self) -> bool { true }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_openai_compatible_with_no_key() {
        let b = OpenAiCompatibleBackend::new("http://localhost:1234/", "local-model", None);
        assert_eq!(b.model_id(), "local-model");
        assert_eq!(b.url("chat/completions"), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn test_openai_preset() {
        let b = OpenAiCompatibleBackend::openai("sk-test", "gpt-4o-mini");
        assert_eq!(b.backend_name(), "openai");
        assert_eq!(b.url("embeddings"), "https://api.openai.com/v1/embeddings");
        assert_eq!(b.embedding_model.as_deref(), Some("text-embedding-3-small"));
    }

    #[test]
    fn test_ollama_is_local() {
        let b = OllamaBackend::new("http://localhost:11434", "llama3:8b");
        assert!(b.is_local());
        assert_eq!(b.backend_name(), "ollama");
    }

    #[test]
    fn test_build_backend_defaults_to_groq() {
        let mut cfg = LlmConfig::default();
        cfg.api_key = Some(SecretString::from("gsk-test".to_string()));
        let b = build_backend(&cfg);
        assert_eq!(b.backend_name(), "openai_compatible");
        assert_eq!(b.model_id(), "compound-beta");
        assert!(!b.is_local());
    }

    #[test]
    fn test_build_backend_ollama_defaults_to_local() {
        let cfg = LlmConfig { backend: LlmBackendKind::Ollama, ..LlmConfig::default() };
        let b = build_backend(&cfg);
        assert_eq!(b.backend_name(), "ollama");
        assert!(b.is_local());
    }

    #[test]
    fn test_chat_body_carries_sampling_params() {
        let req = LlmRequest {
            messages: vec![Message::system("sys"), Message::user("hi")],
            max_tokens: Some(1000),
            temperature: Some(0.7),
            top_p: Some(0.9),
            ..Default::default()
        };
        let body = chat_body(&req, "compound-beta");
        assert_eq!(body["model"], "compound-beta");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 1000);
        assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_parse_openai_response_trims_content() {
        let json = serde_json::json!({
            "model": "compound-beta",
            "choices": [{"message": {"content": "  Hello there \n"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        });
        let resp = parse_openai_response(&json, "fallback").unwrap();
        assert_eq!(resp.content, "Hello there");
        assert_eq!(resp.prompt_tokens, 12);
        assert_eq!(resp.completion_tokens, 3);
    }

    #[test]
    fn test_parse_openai_response_rejects_empty() {
        let json = serde_json::json!({"choices": [{"message": {"content": ""}}]});
        assert!(matches!(
            parse_openai_response(&json, "m"),
            Err(LlmError::EmptyCompletion(_))
        ));
    }

    #[test]
    fn test_parse_embeddings() {
        let json = serde_json::json!({"data": [{"embedding": [0.1, 0.2]}, {"embedding": [0.3, 0.4]}]});
        let out = parse_openai_embeddings(&json).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], vec![0.3_f32, 0.4]);
    }
}
