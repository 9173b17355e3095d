//! Filler phrases
//!
//! Short acknowledgments played while a reply is generated. They are
//! synthesized once at startup and pinned in the audio cache, together with
//! any other fixed prompts the caller hands over.

use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

use crate::cache::AudioCache;
use crate::tts::SpeechService;

/// Process-wide acknowledgment phrases, in a fixed order
pub const FILLER_PHRASES: [&str; 6] = [
    "Let me help you with that.",
    "Sure, let me check that for you.",
    "Great question.",
    "Absolutely, here's what I can tell you.",
    "Let me find that information.",
    "One moment please.",
];

/// Outcome of a preload run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreloadReport {
    /// Phrases now resident in the cache
    pub loaded: usize,
    /// Phrases that failed to synthesize
    pub failed: Vec<String>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct FillerPreloader {
    speech: Arc<SpeechService>,
}

impl FillerPreloader {
    pub fn new(speech: Arc<SpeechService>) -> Self {
        Self { speech }
    }

    /// Synthesize and pin every filler phrase for `voice`
    pub async fn preload(&self, voice: &str) -> PreloadReport {
        self.preload_phrases(&FILLER_PHRASES, voice).await
    }

    /// Synthesize and pin `phrases` for `voice`.
    ///
    /// Failures are logged per phrase; the run never aborts.
    pub async fn preload_phrases(&self, phrases: &[&str], voice: &str) -> PreloadReport {
        let results = join_all(phrases.iter().map(|phrase| async move {
            (*phrase, self.speech.resolve_pinned(phrase, voice).await)
        }))
        .await;

        let mut report = PreloadReport::default();
        for (phrase, result) in results {
            match result {
                Ok(key) => {
                    tracing::info!(phrase = %phrase, key = %key, "Cached prompt audio");
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(phrase = %phrase, error = %e, "Failed to preload prompt audio");
                    report.failed.push(phrase.to_string());
                }
            }
        }

        tracing::info!(
            voice = %voice,
            loaded = report.loaded,
            failed = report.failed.len(),
            "Prompt preload finished"
        );
        report
    }
}

/// Pick a filler uniformly at random. The key is returned whether or not the
/// audio is currently cached.
pub fn random_filler(voice: &str) -> (&'static str, String) {
    random_filler_with(&mut rand::thread_rng(), voice)
}

/// [`random_filler`] with an explicit RNG
pub fn random_filler_with<R: Rng + ?Sized>(rng: &mut R, voice: &str) -> (&'static str, String) {
    let phrase = FILLER_PHRASES
        .choose(rng)
        .copied()
        .unwrap_or(FILLER_PHRASES[0]);
    (phrase, AudioCache::key_for(phrase, voice))
}
