//! ============================================================================
//! CHATMEM-SERVER: HTTP surface for the memory chat service
//! ============================================================================
//! Dependencies are built once from [`ChatConfig`] at startup and shared by
//! every request through [`AppState`].
//! ============================================================================

mod routes;
mod stream;

pub use routes::router;
pub use stream::{chunk_reply, STREAM_CHUNK_CHARS};

use anyhow::{Context, Result};
use chatmem_core::memory::create_embedding_service;
use chatmem_core::{
    ChatConfig, ChatService, CompletionClient, Embedder, InMemoryTurnStore, MemoryBackend,
    MemoryManager, OpenAiCompatClient, QdrantTurnStore, TurnStore,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self {
            chat: Arc::new(chat),
        }
    }
}

/// Open the configured turn store for vectors of `dimension` floats
pub async fn build_turn_store(
    config: &ChatConfig,
    dimension: usize,
) -> Result<Arc<dyn TurnStore>> {
    match config.memory_backend {
        MemoryBackend::Qdrant => {
            let store = QdrantTurnStore::new(
                &config.qdrant_url,
                config.qdrant_api_key.clone(),
                &config.collection,
                dimension,
            )
            .await
            .with_context(|| format!("Memory store unavailable at {}", config.qdrant_url))?;
            info!(
                "Memory store ready (Qdrant: {}, collection: {}, dim: {})",
                config.qdrant_url,
                store.collection(),
                dimension
            );
            Ok(Arc::new(store))
        }
        MemoryBackend::Memory => {
            warn!("Using in-process memory store; turns are lost on restart");
            Ok(Arc::new(InMemoryTurnStore::new()))
        }
    }
}

/// Build the chat service and all of its collaborators
pub async fn build_chat_service(config: &ChatConfig) -> Result<ChatService> {
    let llm_api_key = config.require_llm_api_key()?.to_string();

    let embeddings = create_embedding_service(
        config.embedding_api_key.clone(),
        Some(llm_api_key.clone()),
        config.embedding_base_url.clone(),
        config.embedding_model.clone(),
        config.embedding_dim,
    )?;
    info!(
        "Embedding service ready ({} at {})",
        embeddings.model(),
        embeddings.base_url()
    );

    let store = build_turn_store(config, embeddings.dimension()).await?;

    let mut completion = OpenAiCompatClient::new_custom(
        llm_api_key,
        config.llm_base_url.clone(),
        config.chat_model.clone(),
    );
    if let Some(temperature) = config.llm_temperature {
        completion = completion.with_temperature(temperature);
    }
    if let Some(max_tokens) = config.llm_max_tokens {
        completion = completion.with_max_tokens(max_tokens);
    }
    info!(
        "Completion client ready (model: {} at {})",
        completion.model(),
        completion.base_url()
    );

    let memory = MemoryManager::new(store, Arc::new(embeddings));
    Ok(ChatService::new(memory, Arc::new(completion)).with_top_k(config.memory_top_k))
}
