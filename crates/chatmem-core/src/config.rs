//! ============================================================================
//! Configuration - Environment-sourced service settings
//! ============================================================================
//! Every option has a default except the completion API key. Callers load
//! `.env` (dotenvy) before calling [`ChatConfig::from_env`].
//! ============================================================================

use serde::Serialize;
use std::str::FromStr;

use crate::completion::DEFAULT_CHAT_MODEL;
use crate::error::ConfigError;
use crate::memory::{
    COLLECTION_NAME, DEFAULT_BASE_URL, DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_TOP_K,
};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Where conversation turns are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    Qdrant,
    /// In-process store, lost on restart
    Memory,
}

impl FromStr for MemoryBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(MemoryBackend::Qdrant),
            "memory" | "in-memory" | "in_memory" => Ok(MemoryBackend::Memory),
            _ => Err(format!("Unknown memory backend: {}", s)),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize)]
pub struct ChatConfig {
    pub host: String,
    pub port: u16,
    pub memory_backend: MemoryBackend,
    pub qdrant_url: String,
    #[serde(skip_serializing)]
    pub qdrant_api_key: Option<String>,
    pub collection: String,
    pub memory_top_k: u64,
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub chat_model: String,
    pub llm_temperature: Option<f32>,
    pub llm_max_tokens: Option<u32>,
    #[serde(skip_serializing)]
    pub embedding_api_key: Option<String>,
    pub embedding_base_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            memory_backend: MemoryBackend::Qdrant,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            qdrant_api_key: None,
            collection: COLLECTION_NAME.to_string(),
            memory_top_k: DEFAULT_TOP_K,
            llm_api_key: None,
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            llm_temperature: None,
            llm_max_tokens: None,
            embedding_api_key: None,
            embedding_base_url: DEFAULT_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl ChatConfig {
    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            memory_backend: parse_or(&get, "MEMORY_BACKEND", defaults.memory_backend)?,
            qdrant_url: get("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            qdrant_api_key: get("QDRANT_API_KEY"),
            collection: get("MEMORY_COLLECTION").unwrap_or(defaults.collection),
            memory_top_k: at_least_one(
                "MEMORY_TOP_K",
                parse_or(&get, "MEMORY_TOP_K", defaults.memory_top_k)?,
            )?,
            llm_api_key: get("LLM_API_KEY").or_else(|| get("LITELLM_API_KEY")),
            llm_base_url: get("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            chat_model: get("CHAT_MODEL").unwrap_or(defaults.chat_model),
            llm_temperature: parse_opt(&get, "LLM_TEMPERATURE")?,
            llm_max_tokens: parse_opt(&get, "LLM_MAX_TOKENS")?,
            embedding_api_key: get("EMBEDDING_API_KEY"),
            embedding_base_url: get("EMBEDDING_BASE_URL").unwrap_or(defaults.embedding_base_url),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            embedding_dim: at_least_one(
                "EMBEDDING_DIM",
                parse_or(&get, "EMBEDDING_DIM", defaults.embedding_dim)?,
            )?,
        })
    }

    /// Completion API key, required to serve chat requests
    pub fn require_llm_api_key(&self) -> Result<&str, ConfigError> {
        self.llm_api_key
            .as_deref()
            .ok_or(ConfigError::MissingKey("LLM_API_KEY"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw,
        }),
        None => Ok(default),
    }
}

fn parse_opt<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw })
        })
        .transpose()
}

/// Zero-sized searches and vectors are rejected by the store
fn at_least_one<T>(key: &'static str, value: T) -> Result<T, ConfigError>
where
    T: Copy + PartialOrd + From<u8> + ToString,
{
    if value < T::from(1) {
        return Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        });
    }
    Ok(value)
}
