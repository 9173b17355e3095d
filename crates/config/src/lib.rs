//! Configuration management for the phone agent
//!
//! Supports loading configuration from:
//! - TOML/YAML files under `config/` (`default`, then the runtime environment)
//! - Environment variables (`PHONE_AGENT__SECTION__KEY`)
//! - Conventional credential variables (`OPENAI_API_KEY`, `TWILIO_AUTH_TOKEN`, ...)
//!   used as field defaults

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, ElevenLabsTtsConfig, LlmConfig, ObservabilityConfig,
    OpenAiTtsConfig, PersistenceConfig, RuntimeEnvironment, ServerConfig, Settings,
    TelephonyConfig, TtsConfig, TtsProvider,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
