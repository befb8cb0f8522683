//! ============================================================================
//! Memory Types - Data structures for conversation memory
//! ============================================================================
//! Defines conversation turns, roles and store statistics.
//! ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session id used when the caller does not supply one
pub const DEFAULT_SESSION_ID: &str = "default";

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Only injected at prompt-assembly time, never persisted
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Whether turns with this role may be written to the memory store
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Role::System)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A single turn in a conversation, as stored in the vector database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Point id in the vector store
    pub id: Uuid,
    /// Readable storage label: `{session}-{role}-{hex}`
    pub key: String,
    /// Conversation this turn belongs to
    pub session_id: String,
    pub role: Role,
    /// Message content
    pub content: String,
    /// Vector embedding (not returned from searches)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Unix timestamp
    pub created_at: i64,
}

impl ConversationTurn {
    pub fn new(session_id: impl Into<String>, role: Role, content: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let id = Uuid::new_v4();
        let suffix: String = id.simple().to_string().chars().take(8).collect();
        Self {
            id,
            key: format!("{}-{}-{}", session_id, role, suffix),
            session_id,
            role,
            content: content.into(),
            embedding: Vec::new(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn user(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session_id, Role::User, content)
    }

    pub fn assistant(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(session_id, Role::Assistant, content)
    }

    /// Attach a pre-computed embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Resolve the caller-supplied session id, falling back to [`DEFAULT_SESSION_ID`]
pub fn resolve_session_id(session_id: Option<&str>) -> String {
    match session_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => DEFAULT_SESSION_ID.to_string(),
    }
}

/// Collection statistics
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub points_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_creation() {
        let turn = ConversationTurn::user("session-a", "Hello");

        assert_eq!(turn.session_id, "session-a");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Hello");
        assert!(turn.embedding.is_empty());
        assert!(turn.key.starts_with("session-a-user-"));
        assert_eq!(turn.key.len(), "session-a-user-".len() + 8);
    }

    #[test]
    fn test_turn_ids_are_unique() {
        let a = ConversationTurn::assistant("s", "same");
        let b = ConversationTurn::assistant("s", "same");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("Assistant".parse::<Role>().unwrap(), Role::Assistant);
        assert!("tool".parse::<Role>().is_err());
        assert!(!Role::System.is_persistable());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_resolve_session_id() {
        assert_eq!(resolve_session_id(None), "default");
        assert_eq!(resolve_session_id(Some("   ")), "default");
        assert_eq!(resolve_session_id(Some("abc")), "abc");
    }
}
