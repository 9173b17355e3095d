//! ElevenLabs speech backend (`/v1/text-to-speech/{voice_id}`)

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use phone_agent_config::ElevenLabsTtsConfig;

use super::{TtsBackend, TtsError, TtsProvider};

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// ElevenLabs text-to-speech. The voice is an ElevenLabs voice id.
pub struct ElevenLabsTts {
    client: reqwest::Client,
    config: ElevenLabsTtsConfig,
}

impl ElevenLabsTts {
    pub fn new(config: ElevenLabsTtsConfig) -> Result<Self, TtsError> {
        if config.api_key.trim().is_empty() {
            return Err(TtsError::Configuration(
                "ElevenLabs requires an API key".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TtsError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn speech_url(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.endpoint.trim_end_matches('/'),
            voice_id
        )
    }

    fn request<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
            },
        }
    }
}

#[async_trait]
impl TtsBackend for ElevenLabsTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, TtsError> {
        let response = self
            .client
            .post(self.speech_url(voice))
            .header("xi-api-key", &self.config.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&self.request(text))
            .send()
            .await
            .map_err(|e| TtsError::failed(TtsProvider::ElevenLabs, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::failed(
                TtsProvider::ElevenLabs,
                format!("HTTP {}: {}", status, body),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| TtsError::failed(TtsProvider::ElevenLabs, e.to_string()))
    }

    fn provider(&self) -> TtsProvider {
        TtsProvider::ElevenLabs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ElevenLabsTtsConfig {
        ElevenLabsTtsConfig {
            api_key: "xi-test".into(),
            ..ElevenLabsTtsConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        let mut cfg = config();
        cfg.api_key = " ".into();
        assert!(ElevenLabsTts::new(cfg).is_err());
    }

    #[test]
    fn test_speech_url_includes_voice() {
        let tts = ElevenLabsTts::new(config()).unwrap();
        assert_eq!(
            tts.speech_url("21m00Tcm4TlvDq8ikWAM"),
            "https://api.elevenlabs.io/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"
        );
    }

    #[test]
    fn test_request_carries_voice_settings() {
        let tts = ElevenLabsTts::new(config()).unwrap();
        let json = serde_json::to_value(tts.request("One moment please.")).unwrap();

        assert_eq!(json["text"], "One moment please.");
        assert_eq!(json["model_id"], "eleven_monolingual_v1");
        assert_eq!(json["voice_settings"]["stability"], 0.5);
        assert_eq!(json["voice_settings"]["similarity_boost"], 0.75);
    }
}
