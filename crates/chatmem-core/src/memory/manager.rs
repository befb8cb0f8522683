//! ============================================================================
//! Memory Manager - Orchestrates memory storage and retrieval
//! ============================================================================
//! Combines an embedder with a turn store: session-scoped similarity recall
//! and append-only persistence of conversation turns.
//! ============================================================================

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::{debug, info};

use super::embeddings::Embedder;
use super::store::TurnStore;
use super::types::{CollectionStats, ConversationTurn, Role};

/// Number of prior turns replayed into each prompt
pub const DEFAULT_TOP_K: u64 = 5;

/// Memory manager combining store and embeddings
#[derive(Clone)]
pub struct MemoryManager {
    store: Arc<dyn TurnStore>,
    embeddings: Arc<dyn Embedder>,
}

impl MemoryManager {
    pub fn new(store: Arc<dyn TurnStore>, embeddings: Arc<dyn Embedder>) -> Self {
        Self { store, embeddings }
    }

    /// Turns of `session_id` most similar to `query`, most similar first
    pub async fn retrieve_memory(
        &self,
        session_id: &str,
        query: &str,
        limit: u64,
    ) -> Result<Vec<ConversationTurn>> {
        debug!("Retrieving memory for session {}", session_id);

        let query_embedding = self.embeddings.embed_single(query).await?;

        self.store
            .search_turns(session_id, query_embedding, limit)
            .await
    }

    /// Store a single turn with an auto-generated embedding
    pub async fn store_turn(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<ConversationTurn> {
        let embedding = self.embeddings.embed_single(content).await?;
        let turn = ConversationTurn::new(session_id, role, content).with_embedding(embedding);

        self.store.upsert_turn(&turn).await?;

        debug!("Stored turn {}", turn.key);
        Ok(turn)
    }

    /// Persist both sides of an exchange, user turn first.
    ///
    /// Both texts are embedded in one call; if that fails nothing is written,
    /// and a failed user write stops before the assistant write.
    pub async fn store_exchange(
        &self,
        session_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<Vec<ConversationTurn>> {
        let mut embeddings = self
            .embeddings
            .embed(vec![user_message.to_string(), reply.to_string()])
            .await?
            .into_iter();

        let (Some(user_embedding), Some(reply_embedding)) = (embeddings.next(), embeddings.next())
        else {
            return Err(anyhow!("Embedder returned fewer vectors than inputs"));
        };

        let turns = [
            ConversationTurn::user(session_id, user_message).with_embedding(user_embedding),
            ConversationTurn::assistant(session_id, reply).with_embedding(reply_embedding),
        ];

        for turn in &turns {
            self.store.upsert_turn(turn).await?;
        }

        info!("Stored exchange for session {}", session_id);
        Ok(turns.into())
    }

    /// Check if the memory system is healthy
    pub async fn health_check(&self) -> Result<bool> {
        self.store.health_check().await
    }

    pub async fn stats(&self) -> Result<CollectionStats> {
        self.store.stats().await
    }
}
