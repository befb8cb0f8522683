//! In-process turn store for local development and tests.
//!
//! Holds every turn in a vector and ranks by cosine similarity. Nothing
//! survives a restart.

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use tokio::sync::RwLock;

use super::store::{validate_turn, TurnStore};
use super::types::{CollectionStats, ConversationTurn};

#[derive(Default)]
pub struct InMemoryTurnStore {
    turns: RwLock<Vec<ConversationTurn>>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored turns in insertion order
    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.read().await.clone()
    }

    /// Stored turns belonging to one session, in insertion order
    pub async fn session_turns(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.turns
            .read()
            .await
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TurnStore for InMemoryTurnStore {
    async fn upsert_turn(&self, turn: &ConversationTurn) -> Result<()> {
        validate_turn(turn)?;

        let mut turns = self.turns.write().await;
        match turns.iter_mut().find(|t| t.id == turn.id) {
            Some(existing) => *existing = turn.clone(),
            None => turns.push(turn.clone()),
        }
        Ok(())
    }

    async fn search_turns(
        &self,
        session_id: &str,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ConversationTurn>> {
        let turns = self.turns.read().await;

        let mut scored: Vec<(f32, &ConversationTurn)> = turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .map(|t| (cosine_similarity(&query_embedding, &t.embedding), t))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit as usize)
            .map(|(_, t)| ConversationTurn {
                embedding: vec![],
                ..t.clone()
            })
            .collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn stats(&self) -> Result<CollectionStats> {
        Ok(CollectionStats {
            points_count: self.turns.read().await.len() as u64,
        })
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
