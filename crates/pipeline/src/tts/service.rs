//! Cache-first synthesis
//!
//! Resolves (text, voice) to an audio cache key, synthesizing through the
//! gateway only on a miss. Cache misses are never errors.

use std::sync::Arc;

use crate::cache::AudioCache;

use super::{SynthesisGateway, TtsError, TtsProvider};

pub struct SpeechService {
    cache: Arc<AudioCache>,
    gateway: Arc<SynthesisGateway>,
}

impl SpeechService {
    pub fn new(cache: Arc<AudioCache>, gateway: Arc<SynthesisGateway>) -> Self {
        Self { cache, gateway }
    }

    /// Key of cached audio for (text, voice), synthesizing on a miss
    pub async fn resolve(&self, text: &str, voice: &str) -> Result<String, TtsError> {
        self.resolve_inner(text, voice, false).await
    }

    /// Like [`resolve`](Self::resolve), but the entry is pinned against expiry
    pub async fn resolve_pinned(&self, text: &str, voice: &str) -> Result<String, TtsError> {
        self.resolve_inner(text, voice, true).await
    }

    async fn resolve_inner(&self, text: &str, voice: &str, pinned: bool) -> Result<String, TtsError> {
        let key = AudioCache::key_for(text, voice);

        if self.cache.get(&key).is_some() {
            if pinned {
                self.cache.pin(&key);
            }
            tracing::debug!(key = %key, "Audio cache hit");
            return Ok(key);
        }

        tracing::debug!(key = %key, chars = text.len(), "Audio cache miss, synthesizing");
        let audio = self.gateway.synthesize(text, voice).await?;

        let stored = if pinned {
            self.cache.put_pinned(text, voice, audio)
        } else {
            self.cache.put(text, voice, audio)
        };
        Ok(stored)
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        &self.cache
    }

    pub fn provider(&self) -> TtsProvider {
        self.gateway.provider()
    }
}
