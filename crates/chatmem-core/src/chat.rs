//! ============================================================================
//! Chat Service - Memory-augmented chat orchestration
//! ============================================================================
//! Per request: recall prior turns of the session, assemble the prompt,
//! call the completion API, persist the exchange, return the reply.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::completion::{ChatMessage, CompletionClient};
use crate::error::ChatError;
use crate::memory::{resolve_session_id, ConversationTurn, MemoryManager, DEFAULT_TOP_K};

/// Fixed instructions placed first in every prompt
pub const SYSTEM_PROMPT: &str = r#"You are a friendly and expert coding assistant. 
Always respond in a conversational, encouraging tone. 
Be empathetic, use natural language, and offer helpful suggestions. 
If the user seems stuck, reassure them and offer step-by-step guidance.

BEHAVIOR GUIDELINES:
1. Review your answer for clarity and completeness.
2. Structure responses with clear sections and headings.
3. Keep initial responses concise but comprehensive.
4. End with: "Need more details on any part? Just ask!"
5. Focus on coding problems, debugging, and project development.

RESPONSE FORMAT:
- Start with a brief, friendly summary.
- Provide essential code/steps only.
- Use clear headings when needed.
- Be precise, actionable, and supportive.

SPECIALTIES: Python, JavaScript, web development, debugging, project architecture, best practices.
"#;

/// Body of `POST /chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Successful `POST /chat` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Prompt order: system instructions, recalled turns as returned, new message last
pub fn build_prompt(
    system_prompt: &str,
    memory: &[ConversationTurn],
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(memory.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(
        memory
            .iter()
            .map(|turn| ChatMessage::new(turn.role, turn.content.clone())),
    );
    messages.push(ChatMessage::user(user_message));
    messages
}

/// Chat handler with its dependencies injected once at startup
#[derive(Clone)]
pub struct ChatService {
    memory: MemoryManager,
    completion: Arc<dyn CompletionClient>,
    top_k: u64,
}

impl ChatService {
    pub fn new(memory: MemoryManager, completion: Arc<dyn CompletionClient>) -> Self {
        Self {
            memory,
            completion,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: u64) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    /// Handle one chat message.
    ///
    /// A failure while persisting the exchange is logged and the reply is
    /// still returned.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let message = request.message;
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let session_id = resolve_session_id(request.session_id.as_deref());

        let memory = self
            .memory
            .retrieve_memory(&session_id, &message, self.top_k)
            .await
            .map_err(ChatError::Retrieval)?;
        debug!(
            "Recalled {} turns for session {}",
            memory.len(),
            session_id
        );

        let prompt = build_prompt(SYSTEM_PROMPT, &memory, &message);
        debug!(
            "Sending {} messages to {}",
            prompt.len(),
            self.completion.model()
        );

        let reply = self
            .completion
            .complete(&prompt)
            .await
            .map_err(ChatError::Completion)?;

        match self
            .memory
            .store_exchange(&session_id, &message, &reply)
            .await
        {
            Ok(_) => info!("Answered message for session {}", session_id),
            Err(e) => error!(
                "Failed to store exchange for session {}: {:#}",
                session_id, e
            ),
        }

        Ok(ChatReply { response: reply })
    }
}
