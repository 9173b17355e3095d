//! Synthesis Gateway
//!
//! Routes synthesis to the configured backend, bounds every call with a
//! timeout, and retries once on the default backend when a non-default
//! primary fails. The default backend never falls back to itself.

use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

use phone_agent_config::TtsConfig;

use super::{ElevenLabsTts, OpenAiTts, TtsBackend, TtsError, TtsProvider};

struct Fallback {
    backend: Arc<dyn TtsBackend>,
    voice: String,
}

pub struct SynthesisGateway {
    primary: Arc<dyn TtsBackend>,
    fallback: Option<Fallback>,
    timeout: Duration,
}

impl SynthesisGateway {
    /// Gateway over a single backend with no fallback
    pub fn new(primary: Arc<dyn TtsBackend>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            timeout,
        }
    }

    /// Add the default-backend fallback.
    ///
    /// Ignored when the primary already is the default backend.
    pub fn with_fallback(mut self, backend: Arc<dyn TtsBackend>, voice: impl Into<String>) -> Self {
        if self.primary.provider().is_default() {
            tracing::warn!(
                primary = %self.primary.provider(),
                "Primary is the default synthesis backend; fallback not installed"
            );
            return self;
        }
        self.fallback = Some(Fallback {
            backend,
            voice: voice.into(),
        });
        self
    }

    /// Build the gateway selected by configuration
    pub fn from_config(config: &TtsConfig) -> Result<Self, TtsError> {
        let timeout = config.timeout();
        let openai = || -> Result<Arc<dyn TtsBackend>, TtsError> {
            Ok(Arc::new(OpenAiTts::new(config.openai.clone())?))
        };

        let gateway = match config.provider {
            TtsProvider::OpenAi => Self::new(openai()?, timeout),
            TtsProvider::ElevenLabs => {
                let primary: Arc<dyn TtsBackend> =
                    Arc::new(ElevenLabsTts::new(config.elevenlabs.clone())?);
                let gateway = Self::new(primary, timeout);
                match openai() {
                    Ok(backend) => gateway.with_fallback(backend, &config.openai.fallback_voice),
                    Err(e) => {
                        tracing::warn!(error = %e, "OpenAI fallback unavailable");
                        gateway
                    }
                }
            }
        };

        tracing::info!(
            provider = %config.provider,
            fallback = gateway.has_fallback(),
            timeout_ms = config.timeout_ms,
            "Synthesis gateway ready"
        );
        Ok(gateway)
    }

    /// Active backend
    pub fn provider(&self) -> TtsProvider {
        self.primary.provider()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Synthesize `text` with `voice` on the active backend, falling back
    /// once to the default backend when the active one is not the default.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, TtsError> {
        let primary_err = match self.call(&*self.primary, text, voice).await {
            Ok(audio) => return Ok(audio),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            tracing::error!(error = %primary_err, "Synthesis failed");
            return Err(primary_err);
        };

        tracing::warn!(
            error = %primary_err,
            primary = %self.primary.provider(),
            fallback = %fallback.backend.provider(),
            fallback_voice = %fallback.voice,
            "Primary synthesis failed, falling back"
        );
        metrics::counter!("phone_agent_synthesis_fallback_total").increment(1);

        self.call(&*fallback.backend, text, &fallback.voice)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Fallback synthesis failed");
                e
            })
    }

    async fn call(&self, backend: &dyn TtsBackend, text: &str, voice: &str) -> Result<Bytes, TtsError> {
        let provider = backend.provider();
        let start = Instant::now();

        let result = match tokio::time::timeout(self.timeout, backend.synthesize(text, voice)).await {
            Ok(result) => result,
            Err(_) => Err(TtsError::Timeout {
                backend: provider.as_str().to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("phone_agent_synthesis_ms", "backend" => provider.as_str())
            .record(elapsed_ms);
        tracing::debug!(
            backend = %provider,
            chars = text.len(),
            elapsed_ms,
            ok = result.is_ok(),
            "Synthesis call finished"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Scripted backend recording the voices it was asked for
    struct FakeBackend {
        provider: TtsProvider,
        fail: bool,
        delay: Option<Duration>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn new(provider: TtsProvider, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                provider,
                fail,
                delay: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn slow(provider: TtsProvider, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                provider,
                fail: false,
                delay: Some(delay),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TtsBackend for FakeBackend {
        async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, TtsError> {
            self.calls.lock().push(voice.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(TtsError::failed(self.provider, "scripted failure"));
            }
            Ok(Bytes::from(format!("{}:{}:{}", self.provider, voice, text)))
        }

        fn provider(&self) -> TtsProvider {
            self.provider
        }
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_primary_success() {
        let openai = FakeBackend::new(TtsProvider::OpenAi, false);
        let gateway = SynthesisGateway::new(openai.clone(), TIMEOUT);

        let audio = gateway.synthesize("hi", "sage").await.unwrap();
        assert_eq!(audio, Bytes::from("openai:sage:hi"));
        assert_eq!(gateway.provider(), TtsProvider::OpenAi);
    }

    #[tokio::test]
    async fn test_non_default_primary_falls_back_to_default() {
        let eleven = FakeBackend::new(TtsProvider::ElevenLabs, true);
        let openai = FakeBackend::new(TtsProvider::OpenAi, false);
        let gateway =
            SynthesisGateway::new(eleven.clone(), TIMEOUT).with_fallback(openai.clone(), "sage");

        let audio = gateway.synthesize("hi", "voice-123").await.unwrap();
        assert_eq!(audio, Bytes::from("openai:sage:hi"));
        assert_eq!(*eleven.calls.lock(), vec!["voice-123".to_string()]);
        assert_eq!(*openai.calls.lock(), vec!["sage".to_string()]);
    }

    #[tokio::test]
    async fn test_default_primary_error_propagates_unmodified() {
        let openai = FakeBackend::new(TtsProvider::OpenAi, true);
        let other = FakeBackend::new(TtsProvider::OpenAi, false);
        // Fallback request is ignored for the default backend
        let gateway = SynthesisGateway::new(openai.clone(), TIMEOUT).with_fallback(other.clone(), "sage");
        assert!(!gateway.has_fallback());

        let err = gateway.synthesize("hi", "sage").await.unwrap_err();
        assert_eq!(err, TtsError::failed(TtsProvider::OpenAi, "scripted failure"));
        assert!(other.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_both_backends_failing_surfaces_fallback_error() {
        let eleven = FakeBackend::new(TtsProvider::ElevenLabs, true);
        let openai = FakeBackend::new(TtsProvider::OpenAi, true);
        let gateway = SynthesisGateway::new(eleven, TIMEOUT).with_fallback(openai, "sage");

        let err = gateway.synthesize("hi", "voice-123").await.unwrap_err();
        assert!(matches!(err, TtsError::SynthesisFailed { ref backend, .. } if backend == "openai"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure_and_falls_back() {
        let eleven = FakeBackend::slow(TtsProvider::ElevenLabs, Duration::from_secs(30));
        let openai = FakeBackend::new(TtsProvider::OpenAi, false);
        let gateway = SynthesisGateway::new(eleven, Duration::from_millis(500))
            .with_fallback(openai, "sage");

        let audio = gateway.synthesize("hi", "voice-123").await.unwrap();
        assert_eq!(audio, Bytes::from("openai:sage:hi"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_on_default_backend() {
        let openai = FakeBackend::slow(TtsProvider::OpenAi, Duration::from_secs(30));
        let gateway = SynthesisGateway::new(openai, Duration::from_millis(500));

        let err = gateway.synthesize("hi", "sage").await.unwrap_err();
        assert_eq!(
            err,
            TtsError::Timeout {
                backend: "openai".into(),
                timeout_ms: 500
            }
        );
    }

    #[test]
    fn test_from_config_requires_keys() {
        let mut config = TtsConfig::default();
        config.openai.api_key = String::new();
        assert!(SynthesisGateway::from_config(&config).is_err());

        config.openai.api_key = "sk-test".into();
        let gateway = SynthesisGateway::from_config(&config).unwrap();
        assert_eq!(gateway.provider(), TtsProvider::OpenAi);
        assert!(!gateway.has_fallback());

        config.provider = TtsProvider::ElevenLabs;
        config.elevenlabs.api_key = "xi-test".into();
        let gateway = SynthesisGateway::from_config(&config).unwrap();
        assert_eq!(gateway.provider(), TtsProvider::ElevenLabs);
        assert!(gateway.has_fallback());
    }
}
