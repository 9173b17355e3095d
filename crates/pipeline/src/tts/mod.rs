//! Text-to-speech backends and the synthesis gateway
//!
//! Backends are a closed set ([`TtsProvider`]) chosen once at startup. Each
//! implements [`TtsBackend`]; the gateway adds timeouts and the one-way
//! fallback, and [`SpeechService`] puts the audio cache in front of it.

pub mod elevenlabs;
pub mod gateway;
pub mod openai;
pub mod service;

pub use elevenlabs::ElevenLabsTts;
pub use gateway::SynthesisGateway;
pub use openai::OpenAiTts;
pub use service::SpeechService;

pub use phone_agent_config::TtsProvider;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Speech synthesis errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TtsError {
    #[error("Synthesis failed on {backend}: {cause}")]
    SynthesisFailed { backend: String, cause: String },

    #[error("Synthesis on {backend} timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TtsError {
    pub fn failed(backend: TtsProvider, cause: impl Into<String>) -> Self {
        TtsError::SynthesisFailed {
            backend: backend.as_str().to_string(),
            cause: cause.into(),
        }
    }
}

impl From<TtsError> for phone_agent_core::Error {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::SynthesisFailed { backend, cause } => {
                phone_agent_core::Error::SynthesisFailed { backend, cause }
            }
            TtsError::Timeout { backend, timeout_ms } => phone_agent_core::Error::SynthesisFailed {
                backend,
                cause: format!("timed out after {}ms", timeout_ms),
            },
            TtsError::Configuration(msg) => phone_agent_core::Error::Config(msg),
        }
    }
}

/// One speech synthesis backend: text + voice -> MP3 bytes
#[async_trait]
pub trait TtsBackend: Send + Sync + 'static {
    /// Synthesize `text` with `voice`
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, TtsError>;

    /// Which provider this backend talks to
    fn provider(&self) -> TtsProvider;
}
