//! ============================================================================
//! Embedding Service - Vector embeddings for semantic memory search
//! ============================================================================
//! Generates text embeddings through any OpenAI-compatible `/embeddings`
//! endpoint (Gemini, OpenAI, local gateways).
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Dimension of [`DEFAULT_EMBEDDING_MODEL`] vectors
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

/// Default OpenAI-compatible base URL (Gemini)
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Maps text to fixed-length vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts, in input order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned"))
    }

    /// Length of the produced vectors
    fn dimension(&self) -> usize;
}

/// Embedding service backed by an OpenAI-compatible HTTP API
pub struct EmbeddingService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: Option<String>,
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingUsage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl EmbeddingService {
    /// Create a service with the default endpoint, model and dimension
    pub fn new(api_key: String) -> Self {
        Self::new_custom(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_EMBEDDING_MODEL.to_string(),
            DEFAULT_EMBEDDING_DIM,
        )
    }

    /// Create with custom base URL, model and dimension
    pub fn new_custom(api_key: String, base_url: String, model: String, dimension: usize) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimension,
        }
    }

    /// Get the current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Embedder for EmbeddingService {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let request = EmbeddingRequest {
            model: &self.model,
            input: &texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send embedding request: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(anyhow!(
                    "Embedding API error ({}): {}",
                    status,
                    error.error.message
                ));
            }
            return Err(anyhow!("Embedding API error ({}): {}", status, body));
        }

        let embedding_response: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow!("Failed to parse embedding response: {}", e))?;

        if let Some(usage) = &embedding_response.usage {
            debug!(
                "Embedding tokens used: {} (model: {})",
                usage.total_tokens,
                embedding_response.model.as_deref().unwrap_or(&self.model)
            );
        }

        if embedding_response.data.len() != texts.len() {
            return Err(anyhow!(
                "Embedding API returned {} vectors for {} inputs",
                embedding_response.data.len(),
                texts.len()
            ));
        }

        let mut embeddings: Vec<(usize, Vec<f32>)> = embedding_response
            .data
            .into_iter()
            .map(|d| (d.index, d.embedding))
            .collect();
        embeddings.sort_by_key(|(idx, _)| *idx);

        Ok(embeddings.into_iter().map(|(_, e)| e).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedding service, preferring a dedicated key over the shared one
pub fn create_embedding_service(
    embedding_api_key: Option<String>,
    fallback_api_key: Option<String>,
    base_url: String,
    model: String,
    dimension: usize,
) -> Result<EmbeddingService> {
    if let Some(key) = embedding_api_key.filter(|k| !k.is_empty()) {
        debug!("Using dedicated embedding API key");
        return Ok(EmbeddingService::new_custom(key, base_url, model, dimension));
    }

    if let Some(key) = fallback_api_key.filter(|k| !k.is_empty()) {
        warn!("EMBEDDING_API_KEY not set, reusing the completion API key for embeddings");
        return Ok(EmbeddingService::new_custom(key, base_url, model, dimension));
    }

    Err(anyhow!(
        "No embedding API key available (tried EMBEDDING_API_KEY and LLM_API_KEY)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_creation() {
        let service = EmbeddingService::new("test-key".to_string());
        assert_eq!(service.base_url(), DEFAULT_BASE_URL);
        assert_eq!(service.model(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(service.dimension(), DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn test_key_fallback() {
        let service = create_embedding_service(
            Some(String::new()),
            Some("shared".to_string()),
            "http://localhost/v1/".to_string(),
            "m".to_string(),
            3,
        )
        .unwrap();
        assert_eq!(service.base_url(), "http://localhost/v1");

        assert!(create_embedding_service(None, None, String::new(), String::new(), 3).is_err());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let service = EmbeddingService::new("test-key".to_string());
        let result = service.embed(vec![]).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embeddings_sorted_by_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[{"embedding":[2.0,2.0],"index":1},{"embedding":[1.0,1.0],"index":0}],
                    "model":"m","usage":{"prompt_tokens":4,"total_tokens":4}}"#,
            )
            .create_async()
            .await;

        let service =
            EmbeddingService::new_custom("test-key".into(), server.url(), "m".into(), 2);
        let vectors = service
            .embed(vec!["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
    }

    #[tokio::test]
    async fn test_api_error_message_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(401)
            .with_body(r#"{"error":{"message":"bad key","type":"auth"}}"#)
            .create_async()
            .await;

        let service = EmbeddingService::new_custom("k".into(), server.url(), "m".into(), 2);
        let err = service.embed_single("hello").await.unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }
}
