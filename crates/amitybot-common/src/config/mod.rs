//! Configuration loading for AmityBot.
//! Reads amitybot.toml from the current directory or the path in AMITYBOT_CONFIG,
//! then applies environment overrides (a `.env` file is honoured).

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{AmityError, Result};
use crate::models::Role;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub kb: KbConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub crm: CrmConfig,
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// `["*"]` mirrors the request origin (credentials stay enabled).
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "bool_true")]
    pub require_admin_session: bool,
    /// Build the index at startup when the persisted store is empty.
    #[serde(default = "bool_true")]
    pub index_on_startup: bool,
}

fn default_bind()             -> String      { "0.0.0.0:8000".to_string() }
fn default_cors_origins()     -> Vec<String> { vec!["*".to_string()] }
fn default_max_upload_bytes() -> usize       { 20 * 1024 * 1024 }
fn default_session_ttl()      -> u64         { 24 * 60 * 60 }
fn default_cookie_name()      -> String      { "amitybot_session".to_string() }
fn bool_true()                -> bool        { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
            session_ttl_secs: default_session_ttl(),
            cookie_name: default_cookie_name(),
            require_admin_session: true,
            index_on_startup: true,
        }
    }
}

// ── LLM ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackendKind {
    /// Groq, Together, OpenRouter, vLLM, LM Studio, ...
    #[default]
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub backend: LlmBackendKind,
    /// Unset means the default endpoint for `backend`; see `endpoint()`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Only ever taken from the environment (`GROQ_API_KEY` / `LLM_API_KEY`).
    #[serde(skip)]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

fn default_llm_model()    -> String { "compound-beta".to_string() }
fn default_temperature()  -> f32    { 0.7 }
fn default_max_tokens()   -> u32    { 1000 }
fn default_top_p()        -> f32    { 0.9 }
fn default_system_prompt() -> String {
    "You are AmityBot, a helpful assistant for Amity University. \
     Provide accurate, friendly, and informative responses."
        .to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackendKind::default(),
            base_url: None,
            model: default_llm_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl LlmConfig {
    /// Base URL the chat backend talks to.
    pub fn endpoint(&self) -> &str {
        match (&self.base_url, self.backend) {
            (Some(url), _) => url.as_str(),
            (None, LlmBackendKind::Ollama) => DEFAULT_OLLAMA_URL,
            (None, _) => DEFAULT_GROQ_URL,
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackendKind {
    /// Local feature hashing, no network.
    #[default]
    Hashing,
    Ollama,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

impl std::str::FromStr for EmbeddingBackendKind {
    type Err = AmityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hashing"           => Ok(Self::Hashing),
            "ollama"            => Ok(Self::Ollama),
            "openai_compatible" => Ok(Self::OpenAiCompatible),
            other => Err(AmityError::Config(format!("unknown embedding backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackendKind,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default = "default_embed_dim")]
    pub dimension: usize,
    pub base_url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embed_model() -> String { "BAAI/bge-small-en-v1.5".to_string() }
fn default_embed_dim()   -> usize  { 384 }
fn default_batch_size()  -> usize  { 32 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackendKind::default(),
            model: default_embed_model(),
            dimension: default_embed_dim(),
            base_url: None,
            batch_size: default_batch_size(),
        }
    }
}

// ── Knowledge base ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct KbConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_min_doc_chars")]
    pub min_document_chars: usize,
    #[serde(default = "default_ocr_command")]
    pub ocr_command: String,
}

fn default_data_dir()      -> PathBuf { PathBuf::from("data") }
fn default_store_dir()     -> PathBuf { PathBuf::from("chroma_db") }
fn default_chunk_size()    -> usize   { 500 }
fn default_chunk_overlap() -> usize   { 100 }
fn default_min_doc_chars() -> usize   { 50 }
fn default_ocr_command()   -> String  { "tesseract".to_string() }

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_dir: default_store_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_document_chars: default_min_doc_chars(),
            ocr_command: default_ocr_command(),
        }
    }
}

// ── RAG ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_retrieve_k")]
    pub retrieve_k: usize,
    #[serde(default = "default_general_docs")]
    pub general_docs: usize,
    #[serde(default = "default_logged_in_docs")]
    pub logged_in_docs: usize,
    #[serde(default = "default_context_chars")]
    pub context_char_limit: usize,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    #[serde(default = "default_max_history")]
    pub max_history_turns: usize,
    #[serde(default = "default_max_query")]
    pub max_query_chars: usize,
    /// Chat histories untouched for this long are dropped.
    #[serde(default = "default_chat_idle")]
    pub chat_session_idle_secs: u64,
}

fn default_retrieve_k()     -> usize { 5 }
fn default_general_docs()   -> usize { 2 }
fn default_logged_in_docs() -> usize { 5 }
fn default_context_chars()  -> usize { 3000 }
fn default_history_window() -> usize { 4 }
fn default_max_history()    -> usize { 50 }
fn default_max_query()      -> usize { 1000 }
fn default_chat_idle()      -> u64   { 60 * 60 }

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            retrieve_k: default_retrieve_k(),
            general_docs: default_general_docs(),
            logged_in_docs: default_logged_in_docs(),
            context_char_limit: default_context_chars(),
            history_window: default_history_window(),
            max_history_turns: default_max_history(),
            max_query_chars: default_max_query(),
            chat_session_idle_secs: default_chat_idle(),
        }
    }
}

impl RagConfig {
    /// How many retrieved chunks a caller with `role` gets in the prompt.
    pub fn docs_for(&self, role: Role) -> usize {
        match role {
            Role::General  => self.general_docs,
            Role::LoggedIn => self.logged_in_docs,
        }
    }
}

// ── Auth / CRM ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    #[serde(default = "default_seed_role")]
    pub role: Role,
}

fn default_seed_role() -> Role { Role::LoggedIn }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_seed_users")]
    pub seed_users: Vec<SeedUser>,
    #[serde(default = "bool_true")]
    pub allow_registration: bool,
}

fn default_seed_users() -> Vec<SeedUser> {
    vec![SeedUser {
        username: "admin".to_string(),
        password: "admin".to_string(),
        role: Role::LoggedIn,
    }]
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { seed_users: default_seed_users(), allow_registration: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    #[serde(default = "default_max_sync_logs")]
    pub max_sync_logs: usize,
}

fn default_max_sync_logs() -> usize { 100 }

impl Default for CrmConfig {
    fn default() -> Self {
        Self { max_sync_logs: default_max_sync_logs() }
    }
}

mod tests;

impl Config {
    /// Load configuration from amitybot.toml plus environment overrides.
    /// A missing file is not an error: built-in defaults apply.
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenvy::dotenv();

        let path = std::env::var("AMITYBOT_CONFIG")
            .unwrap_or_else(|_| "amitybot.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&content)?
        } else {
            tracing::info!(path = %path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `KEY=value` overrides; `lookup` is `std::env::var` in production.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AMITYBOT_BIND")    { self.server.bind = v; }
        if let Some(v) = get("LLM_BASE_URL")     { self.llm.base_url = Some(v); }
        if let Some(v) = get("GROQ_MODEL").or_else(|| get("LLM_MODEL")) {
            self.llm.model = v;
        }
        if let Some(v) = get("GROQ_API_KEY").or_else(|| get("LLM_API_KEY")) {
            self.llm.api_key = Some(SecretString::from(v));
        }
        if let Some(v) = get("DATA_DIR") { self.kb.data_dir = PathBuf::from(v); }
        if let Some(v) = get("VECTOR_STORE_DIR").or_else(|| get("CHROMA_DB_DIR")) {
            self.kb.store_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CHUNK_SIZE")    { self.kb.chunk_size = parse_num("CHUNK_SIZE", &v)?; }
        if let Some(v) = get("CHUNK_OVERLAP") { self.kb.chunk_overlap = parse_num("CHUNK_OVERLAP", &v)?; }
        if let Some(v) = get("EMBEDDING_BACKEND") { self.embedding.backend = v.parse()?; }
        if let Some(v) = get("EMBEDDING_MODEL")   { self.embedding.model = v; }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.kb.chunk_size == 0 {
            return Err(AmityError::Config("kb.chunk_size must be positive".into()));
        }
        if self.kb.chunk_overlap >= self.kb.chunk_size {
            return Err(AmityError::Config(format!(
                "kb.chunk_overlap ({}) must be smaller than kb.chunk_size ({})",
                self.kb.chunk_overlap, self.kb.chunk_size
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(AmityError::Config("embedding.dimension must be positive".into()));
        }
        if self.rag.retrieve_k == 0 {
            return Err(AmityError::Config("rag.retrieve_k must be positive".into()));
        }
        Ok(())
    }
}

fn parse_num(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| AmityError::Config(format!("{key} must be a number, got '{value}'")))
}
