//! Core trait for generation backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error types for generation calls.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Backend is not available
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Request reached the service but failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// A single generation request: role instruction, user message, budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Role-specific system instruction
    pub system_instruction: String,
    /// The user-facing message to respond to
    pub user_message: String,
    /// Maximum tokens to generate
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn new(
        system_instruction: impl Into<String>,
        user_message: impl Into<String>,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_message: user_message.into(),
            max_output_tokens,
        }
    }
}

/// Core trait for text-generation backends.
///
/// Abstracts over inference services (vLLM, Ollama, OpenAI) behind the
/// minimal interface the story engine consumes.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend identifier (e.g. model name).
    fn id(&self) -> &str;

    /// Check if the backend is currently reachable.
    async fn is_available(&self) -> bool;

    /// Generate text for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
