//! ============================================================================
//! Memory Module - Session-scoped conversation memory
//! ============================================================================
//! Provides vector-based storage of conversation turns for semantic recall.
//!
//! ## Architecture
//! ```text
//! User Message → Embed → Vector Search (session filter) → Prior Turns
//!                                              ↓
//!                     [System Prompt] + [Prior Turns] + [User Message]
//!                                              ↓
//!                                     Completion API
//!                                              ↓
//!                          Store User Turn + Assistant Turn
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use chatmem_core::memory::{EmbeddingService, MemoryManager, QdrantTurnStore};
//!
//! let embeddings = Arc::new(EmbeddingService::new(api_key));
//! let store = Arc::new(QdrantTurnStore::new(url, None, "chat-memory", 768).await?);
//! let manager = MemoryManager::new(store, embeddings);
//!
//! manager.store_exchange("session-1", "Hello", "Hi! How can I help?").await?;
//! let relevant = manager.retrieve_memory("session-1", "greeting", 5).await?;
//! ```
//! ============================================================================

mod embeddings;
mod in_memory;
mod manager;
mod store;
mod types;

pub use embeddings::{
    create_embedding_service, Embedder, EmbeddingService, DEFAULT_BASE_URL,
    DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL,
};
pub use in_memory::{cosine_similarity, InMemoryTurnStore};
pub use manager::{MemoryManager, DEFAULT_TOP_K};
pub use store::{QdrantTurnStore, TurnStore, COLLECTION_NAME, SESSION_FIELD};
pub use types::{
    resolve_session_id, CollectionStats, ConversationTurn, Role, DEFAULT_SESSION_ID,
};
