//! Speech pipeline for the phone agent
//!
//! Components, leaf first:
//! - [`cache::AudioCache`]: content-addressed store of synthesized audio
//! - [`tts::SynthesisGateway`]: backend selection with one-way fallback
//! - [`tts::SpeechService`]: cache-first synthesis returning cache keys
//! - [`filler::FillerPreloader`]: startup synthesis of pinned prompts

pub mod cache;
pub mod filler;
pub mod tts;

pub use cache::{AudioCache, CacheStats, Clock, ManualClock, SystemClock};
pub use filler::{random_filler, random_filler_with, FillerPreloader, PreloadReport, FILLER_PHRASES};
pub use tts::{
    ElevenLabsTts, OpenAiTts, SpeechService, SynthesisGateway, TtsBackend, TtsError, TtsProvider,
};
