//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{cache, endpoints, llm, telephony, tts};
use crate::ConfigError;

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode
    #[default]
    Development,
    /// Staging mode
    Staging,
    /// Production mode
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Telephony provider credentials and gather behavior
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Speech synthesis and audio cache
    #[serde(default)]
    pub tts: TtsConfig,

    /// Generation backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// Persistence configuration (ScyllaDB)
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL used in audio links (e.g. `https://agent.example.com`).
    /// When unset, links are built from the request's Host header.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// CORS allowed origins (empty = permissive)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
            timeout_seconds: default_timeout(),
            cors_origins: Vec::new(),
        }
    }
}

/// Telephony provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    #[serde(default = "default_account_sid")]
    pub account_sid: String,

    /// Shared secret for webhook signatures
    #[serde(default = "default_auth_token")]
    pub auth_token: String,

    #[serde(default = "default_phone_number")]
    pub phone_number: String,

    /// Seconds of silence before a gather gives up
    #[serde(default = "default_gather_timeout")]
    pub gather_timeout_secs: u32,

    /// Speech recognition language hint
    #[serde(default = "default_language")]
    pub language: String,

    /// Provider voice for plain-text fallback
    #[serde(default = "default_fallback_voice")]
    pub fallback_voice: String,
}

fn env_or_empty(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

fn default_account_sid() -> String {
    env_or_empty("TWILIO_ACCOUNT_SID")
}

fn default_auth_token() -> String {
    env_or_empty("TWILIO_AUTH_TOKEN")
}

fn default_phone_number() -> String {
    env_or_empty("TWILIO_PHONE_NUMBER")
}

fn default_gather_timeout() -> u32 {
    telephony::GATHER_TIMEOUT_SECS
}

fn default_language() -> String {
    telephony::LANGUAGE.to_string()
}

fn default_fallback_voice() -> String {
    telephony::FALLBACK_VOICE.to_string()
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: default_account_sid(),
            auth_token: default_auth_token(),
            phone_number: default_phone_number(),
            gather_timeout_secs: default_gather_timeout(),
            language: default_language(),
            fallback_voice: default_fallback_voice(),
        }
    }
}

/// Speech synthesis backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    /// Default backend
    #[default]
    OpenAi,
    ElevenLabs,
}

impl TtsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsProvider::OpenAi => "openai",
            TtsProvider::ElevenLabs => "elevenlabs",
        }
    }

    /// The default backend never falls back to itself
    pub fn is_default(&self) -> bool {
        *self == TtsProvider::default()
    }
}

impl std::fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Active backend
    #[serde(default)]
    pub provider: TtsProvider,

    /// Active voice identifier (an OpenAI voice name or an ElevenLabs voice id)
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Upper bound for one backend call
    #[serde(default = "default_tts_timeout_ms")]
    pub timeout_ms: u64,

    /// Audio cache entry lifetime
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Background expiry sweep interval
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[serde(default)]
    pub openai: OpenAiTtsConfig,

    #[serde(default)]
    pub elevenlabs: ElevenLabsTtsConfig,
}

fn default_voice() -> String {
    std::env::var("OPENAI_VOICE").unwrap_or_else(|_| tts::DEFAULT_VOICE.to_string())
}

fn default_tts_timeout_ms() -> u64 {
    tts::TIMEOUT_MS
}

fn default_cache_ttl() -> u64 {
    cache::TTL_SECS
}

fn default_sweep_interval() -> u64 {
    cache::SWEEP_INTERVAL_SECS
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            voice: default_voice(),
            timeout_ms: default_tts_timeout_ms(),
            cache_ttl_secs: default_cache_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            openai: OpenAiTtsConfig::default(),
            elevenlabs: ElevenLabsTtsConfig::default(),
        }
    }
}

impl TtsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// OpenAI speech tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiTtsConfig {
    /// Defaults to `OPENAI_API_KEY`
    #[serde(default = "default_openai_api_key")]
    pub api_key: String,

    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_openai_tts_model")]
    pub model: String,

    #[serde(default = "default_openai_speed")]
    pub speed: f32,

    /// Voice used when this backend serves as the fallback for another
    #[serde(default = "default_fallback_tts_voice")]
    pub fallback_voice: String,
}

fn default_openai_api_key() -> String {
    env_or_empty("OPENAI_API_KEY")
}

fn default_openai_endpoint() -> String {
    endpoints::OPENAI_API.to_string()
}

fn default_openai_tts_model() -> String {
    tts::OPENAI_MODEL.to_string()
}

fn default_openai_speed() -> f32 {
    tts::OPENAI_SPEED
}

fn default_fallback_tts_voice() -> String {
    tts::DEFAULT_VOICE.to_string()
}

impl Default for OpenAiTtsConfig {
    fn default() -> Self {
        Self {
            api_key: default_openai_api_key(),
            endpoint: default_openai_endpoint(),
            model: default_openai_tts_model(),
            speed: default_openai_speed(),
            fallback_voice: default_fallback_tts_voice(),
        }
    }
}

/// ElevenLabs speech tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevenLabsTtsConfig {
    /// Defaults to `ELEVENLABS_API_KEY`
    #[serde(default = "default_elevenlabs_api_key")]
    pub api_key: String,

    #[serde(default = "default_elevenlabs_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_elevenlabs_model")]
    pub model_id: String,

    #[serde(default = "default_stability")]
    pub stability: f32,

    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
}

fn default_elevenlabs_api_key() -> String {
    env_or_empty("ELEVENLABS_API_KEY")
}

fn default_elevenlabs_endpoint() -> String {
    endpoints::ELEVENLABS_API.to_string()
}

fn default_elevenlabs_model() -> String {
    tts::ELEVENLABS_MODEL_ID.to_string()
}

fn default_stability() -> f32 {
    tts::ELEVENLABS_STABILITY
}

fn default_similarity_boost() -> f32 {
    tts::ELEVENLABS_SIMILARITY_BOOST
}

impl Default for ElevenLabsTtsConfig {
    fn default() -> Self {
        Self {
            api_key: default_elevenlabs_api_key(),
            endpoint: default_elevenlabs_endpoint(),
            model_id: default_elevenlabs_model(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
        }
    }
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Defaults to `OPENAI_API_KEY`
    #[serde(default = "default_openai_api_key")]
    pub api_key: String,

    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,

    /// Plain-text knowledge consumed by the system prompt
    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base_path: String,
}

fn default_llm_model() -> String {
    llm::MODEL.to_string()
}

fn default_temperature() -> f32 {
    llm::TEMPERATURE
}

fn default_max_tokens() -> u32 {
    llm::MAX_TOKENS
}

fn default_llm_timeout_ms() -> u64 {
    llm::TIMEOUT_MS
}

fn default_knowledge_base_path() -> String {
    llm::KNOWLEDGE_BASE_PATH.to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: default_openai_api_key(),
            endpoint: default_openai_endpoint(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_llm_timeout_ms(),
            knowledge_base_path: default_knowledge_base_path(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Persistence configuration for ScyllaDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable ScyllaDB persistence (false = in-memory only)
    #[serde(default)]
    pub enabled: bool,

    /// ScyllaDB host addresses
    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    /// ScyllaDB keyspace name
    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    /// ScyllaDB replication factor
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec!["127.0.0.1:9042".to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| "phone_agent".to_string())
}

fn default_replication_factor() -> u8 {
    1
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable the Prometheus recorder and `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Every required key that is missing, in a stable order.
    pub fn missing_required(&self) -> Vec<String> {
        let mut missing = Vec::new();
        let mut require = |key: &str, value: &str| {
            if value.trim().is_empty() {
                missing.push(key.to_string());
            }
        };

        require("telephony.account_sid", &self.telephony.account_sid);
        // Development may run without signature checks
        if !self.environment.is_development() {
            require("telephony.auth_token", &self.telephony.auth_token);
        }
        require("telephony.phone_number", &self.telephony.phone_number);
        require("llm.api_key", &self.llm.api_key);
        // OpenAI speech is needed as primary or as fallback
        require("tts.openai.api_key", &self.tts.openai.api_key);
        if self.tts.provider == TtsProvider::ElevenLabs {
            require("tts.elevenlabs.api_key", &self.tts.elevenlabs.api_key);
        }
        require("tts.voice", &self.tts.voice);

        if self.persistence.enabled && self.persistence.scylla_hosts.is_empty() {
            missing.push("persistence.scylla_hosts".to_string());
        }

        missing
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        self.validate_server()?;
        self.validate_tts()?;
        self.validate_llm()?;

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if let Some(base) = &self.server.public_base_url {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "server.public_base_url".to_string(),
                    message: format!("Must start with http:// or https://, got {}", base),
                });
            }
        }

        Ok(())
    }

    fn validate_tts(&self) -> Result<(), ConfigError> {
        let tts = &self.tts;

        if tts.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts.cache_ttl_secs".to_string(),
                message: "TTL must be at least 1 second".to_string(),
            });
        }

        if tts.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts.sweep_interval_secs".to_string(),
                message: "Sweep interval must be at least 1 second".to_string(),
            });
        }

        if tts.timeout_ms < 100 {
            return Err(ConfigError::InvalidValue {
                field: "tts.timeout_ms".to_string(),
                message: "Timeout too low (minimum 100ms)".to_string(),
            });
        }

        if !(0.25..=4.0).contains(&tts.openai.speed) {
            return Err(ConfigError::InvalidValue {
                field: "tts.openai.speed".to_string(),
                message: format!("Must be between 0.25 and 4.0, got {}", tts.openai.speed),
            });
        }

        if !(0.0..=1.0).contains(&tts.elevenlabs.stability) {
            return Err(ConfigError::InvalidValue {
                field: "tts.elevenlabs.stability".to_string(),
                message: format!(
                    "Must be between 0.0 and 1.0, got {}",
                    tts.elevenlabs.stability
                ),
            });
        }

        if !(0.0..=1.0).contains(&tts.elevenlabs.similarity_boost) {
            return Err(ConfigError::InvalidValue {
                field: "tts.elevenlabs.similarity_boost".to_string(),
                message: format!(
                    "Must be between 0.0 and 1.0, got {}",
                    tts.elevenlabs.similarity_boost
                ),
            });
        }

        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", self.llm.temperature),
            });
        }

        if self.llm.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.max_tokens".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from `config/` plus the environment
///
/// Priority: env vars > config/{env} > config/default > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit config directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::from(dir.join("default")).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    // Load from environment variables, e.g. PHONE_AGENT__TTS__PROVIDER=elevenlabs
    builder = builder.add_source(
        Environment::with_prefix("PHONE_AGENT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
