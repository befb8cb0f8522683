//! ============================================================================
//! Memory Store - Qdrant vector database operations
//! ============================================================================
//! Stores conversation turns and retrieves them by vector similarity,
//! always scoped to a single session.
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, Condition, CreateCollectionBuilder,
    CreateFieldIndexCollectionBuilder, Distance, FieldType, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{CollectionStats, ConversationTurn, Role};

/// Default collection name for conversation turns
pub const COLLECTION_NAME: &str = "chat-memory";

/// Payload field holding the session id
pub const SESSION_FIELD: &str = "session_id";

/// Append-only storage of conversation turns with session-filtered similarity search
#[async_trait]
pub trait TurnStore: Send + Sync {
    /// Write a turn; the turn must carry its embedding
    async fn upsert_turn(&self, turn: &ConversationTurn) -> Result<()>;

    /// Top `limit` turns of `session_id` nearest to `query_embedding`, most similar first
    async fn search_turns(
        &self,
        session_id: &str,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ConversationTurn>>;

    /// Check if the store is healthy/connected
    async fn health_check(&self) -> Result<bool>;

    async fn stats(&self) -> Result<CollectionStats>;
}

/// Reject turns that must never reach the store
pub(crate) fn validate_turn(turn: &ConversationTurn) -> Result<()> {
    if turn.embedding.is_empty() {
        return Err(anyhow!("Cannot store turn without embedding"));
    }
    if turn.content.is_empty() {
        return Err(anyhow!("Cannot store turn with empty content"));
    }
    if !turn.role.is_persistable() {
        return Err(anyhow!("Cannot store {} turns", turn.role));
    }
    Ok(())
}

/// Turn store backed by a Qdrant collection
pub struct QdrantTurnStore {
    client: Qdrant,
    collection: String,
}

impl QdrantTurnStore {
    /// Connect to Qdrant and make sure the collection exists
    pub async fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .map_err(|e| anyhow!("Failed to create Qdrant client: {}", e))?;

        let store = Self {
            client,
            collection: collection.to_string(),
        };

        store.ensure_collection(dimension).await?;

        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| anyhow!("Failed to check collection existence: {}", e))?;

        if exists {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!("Creating collection: {}", self.collection);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| anyhow!("Failed to create collection: {}", e))?;

        self.client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                &self.collection,
                SESSION_FIELD,
                FieldType::Keyword,
            ))
            .await
            .map_err(|e| anyhow!("Failed to create session index: {}", e))?;

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }
}

#[async_trait]
impl TurnStore for QdrantTurnStore {
    async fn upsert_turn(&self, turn: &ConversationTurn) -> Result<()> {
        validate_turn(turn)?;

        debug!("Storing turn {} ({})", turn.key, turn.id);

        let payload: HashMap<String, Value> = [
            (SESSION_FIELD.to_string(), Value::from(turn.session_id.clone())),
            ("role".to_string(), Value::from(turn.role.to_string())),
            ("content".to_string(), Value::from(turn.content.clone())),
            ("key".to_string(), Value::from(turn.key.clone())),
            ("created_at".to_string(), Value::from(turn.created_at)),
        ]
        .into_iter()
        .collect();

        let point = PointStruct::new(turn.id.to_string(), turn.embedding.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| anyhow!("Failed to upsert turn: {}", e))?;

        Ok(())
    }

    async fn search_turns(
        &self,
        session_id: &str,
        query_embedding: Vec<f32>,
        limit: u64,
    ) -> Result<Vec<ConversationTurn>> {
        debug!("Searching turns for session {} (limit: {})", session_id, limit);

        let filter = Filter::must([Condition::matches(SESSION_FIELD, session_id.to_string())]);

        let search_result = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_embedding, limit)
                    .filter(filter)
                    .with_payload(true),
            )
            .await
            .map_err(|e| anyhow!("Failed to search turns: {}", e))?;

        // Qdrant returns results ranked by score; keep that order
        let turns: Vec<ConversationTurn> = search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let id = extract_uuid_from_point_id(point.id?)?;
                turn_from_payload(id, &point.payload)
            })
            .collect();

        debug!("Found {} matching turns", turns.len());
        Ok(turns)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.health_check().await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Qdrant health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn stats(&self) -> Result<CollectionStats> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| anyhow!("Failed to get collection info: {}", e))?;

        Ok(CollectionStats {
            points_count: info.result.and_then(|r| r.points_count).unwrap_or(0),
        })
    }
}

fn turn_from_payload(id: Uuid, payload: &HashMap<String, Value>) -> Option<ConversationTurn> {
    let role = match get_string(payload, "role")?.parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
            warn!("Skipping turn {}: {}", id, e);
            return None;
        }
    };

    Some(ConversationTurn {
        id,
        key: get_string(payload, "key").unwrap_or_default(),
        session_id: get_string(payload, SESSION_FIELD)?,
        role,
        content: get_string(payload, "content")?,
        embedding: vec![],
        created_at: get_i64(payload, "created_at").unwrap_or(0),
    })
}

fn extract_uuid_from_point_id(point_id: qdrant_client::qdrant::PointId) -> Option<Uuid> {
    match point_id.point_id_options? {
        PointIdOptions::Uuid(uuid_str) => Uuid::parse_str(&uuid_str).ok(),
        PointIdOptions::Num(_) => None,
    }
}

fn get_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn get_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
    payload.get(key).and_then(|v| v.as_integer())
}
