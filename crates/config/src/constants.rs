//! Centralized constants for the phone agent
//!
//! Default values shared by the settings defaults and the backends, so the
//! same endpoint or tuning value is never spelled out twice.

/// External service endpoints
pub mod endpoints {
    /// OpenAI REST API base
    pub const OPENAI_API: &str = "https://api.openai.com/v1";

    /// ElevenLabs REST API base
    pub const ELEVENLABS_API: &str = "https://api.elevenlabs.io";
}

/// Speech synthesis defaults
pub mod tts {
    /// Voice used when none is configured
    pub const DEFAULT_VOICE: &str = "sage";

    /// OpenAI speech model
    pub const OPENAI_MODEL: &str = "tts-1-hd";

    /// OpenAI playback speed (valid range 0.25 - 4.0)
    pub const OPENAI_SPEED: f32 = 1.0;

    /// ElevenLabs voice stability
    pub const ELEVENLABS_STABILITY: f32 = 0.5;

    /// ElevenLabs similarity boost
    pub const ELEVENLABS_SIMILARITY_BOOST: f32 = 0.75;

    /// ElevenLabs model
    pub const ELEVENLABS_MODEL_ID: &str = "eleven_monolingual_v1";

    /// Upper bound on a single backend synthesis call
    pub const TIMEOUT_MS: u64 = 5_000;
}

/// Audio cache defaults
pub mod cache {
    /// Entry lifetime measured from insertion
    pub const TTL_SECS: u64 = 3_600;

    /// How often the background sweep purges expired entries
    pub const SWEEP_INTERVAL_SECS: u64 = 60;
}

/// Generation defaults
pub mod llm {
    pub const MODEL: &str = "gpt-4o-mini";
    pub const TEMPERATURE: f32 = 0.7;

    /// Roughly ten seconds of speech
    pub const MAX_TOKENS: u32 = 80;

    pub const TIMEOUT_MS: u64 = 8_000;

    pub const KNOWLEDGE_BASE_PATH: &str = "knowledge-base.txt";
}

/// Telephony defaults
pub mod telephony {
    /// Seconds of silence before the gather times out
    pub const GATHER_TIMEOUT_SECS: u32 = 3;

    pub const LANGUAGE: &str = "en-US";

    /// Provider-side voice used for plain `<Say>` when synthesis is unavailable
    pub const FALLBACK_VOICE: &str = "Polly.Ruth";
}
