//! ============================================================================
//! CHATMEM-CORE: memory-augmented chat
//! ============================================================================
//! This crate holds everything behind the `/chat` endpoint:
//! - Embedding client for OpenAI-compatible `/embeddings` APIs
//! - Session-scoped turn storage in Qdrant (or in-process)
//! - Completion client for OpenAI-compatible `/chat/completions` APIs
//! - The chat service tying them together
//! ============================================================================

pub mod chat;
pub mod completion;
pub mod config;
pub mod error;
pub mod memory;

// Re-export main types for convenience
pub use chat::{build_prompt, ChatReply, ChatRequest, ChatService, SYSTEM_PROMPT};
pub use completion::{ChatMessage, CompletionClient, OpenAiCompatClient, DEFAULT_CHAT_MODEL};
pub use config::{ChatConfig, MemoryBackend};
pub use error::{ChatError, ConfigError, EMPTY_MESSAGE_ERROR, GENERIC_ERROR};
pub use memory::{
    ConversationTurn, Embedder, EmbeddingService, InMemoryTurnStore, MemoryManager,
    QdrantTurnStore, Role, TurnStore,
};
