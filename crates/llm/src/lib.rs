//! Reply generation for the phone agent
//!
//! Features:
//! - OpenAI-compatible chat completions backend
//! - File-backed knowledge base injected into the system prompt
//! - Adapter implementing the core `LanguageModel` trait with a hard timeout

pub mod adapter;
pub mod backend;
pub mod knowledge;
pub mod prompt;

pub use adapter::ChatModel;
pub use backend::{GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use knowledge::KnowledgeBase;
pub use prompt::{Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Network(err.to_string())
    }
}

impl From<LlmError> for phone_agent_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(ms) => phone_agent_core::Error::Timeout(ms),
            LlmError::Configuration(msg) => phone_agent_core::Error::Config(msg),
            other => phone_agent_core::Error::GenerationFailed(other.to_string()),
        }
    }
}
