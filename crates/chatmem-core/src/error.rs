//! Error types surfaced at the chat and configuration boundaries.

/// Message returned to callers for an empty or missing chat message
pub const EMPTY_MESSAGE_ERROR: &str = "No message provided";

/// Message returned to callers for any internal failure
pub const GENERIC_ERROR: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// Failures of a single chat request
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No message provided")]
    EmptyMessage,

    #[error("Memory retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),

    #[error("Completion failed: {0:#}")]
    Completion(anyhow::Error),
}

impl ChatError {
    /// Whether the caller is at fault (as opposed to an upstream failure)
    pub fn is_client_error(&self) -> bool {
        matches!(self, ChatError::EmptyMessage)
    }

    /// Text safe to show the caller; upstream detail is never included
    pub fn public_message(&self) -> &'static str {
        match self {
            ChatError::EmptyMessage => EMPTY_MESSAGE_ERROR,
            ChatError::Retrieval(_) | ChatError::Completion(_) => GENERIC_ERROR,
        }
    }
}

/// Invalid or missing configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set. Add it to the environment or .env")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
