//! OpenAI speech backend (`/audio/speech`)

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use phone_agent_config::OpenAiTtsConfig;

use super::{TtsBackend, TtsError, TtsProvider};

/// Request body for the speech endpoint
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
    response_format: &'static str,
}

/// OpenAI text-to-speech
pub struct OpenAiTts {
    client: reqwest::Client,
    config: OpenAiTtsConfig,
}

impl OpenAiTts {
    pub fn new(config: OpenAiTtsConfig) -> Result<Self, TtsError> {
        if config.api_key.trim().is_empty() {
            return Err(TtsError::Configuration(
                "OpenAI speech requires an API key".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TtsError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.config.endpoint.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, text: &'a str, voice: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.config.model,
            input: text,
            voice,
            speed: self.config.speed,
            response_format: "mp3",
        }
    }
}

#[async_trait]
impl TtsBackend for OpenAiTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes, TtsError> {
        let response = self
            .client
            .post(self.speech_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request(text, voice))
            .send()
            .await
            .map_err(|e| TtsError::failed(TtsProvider::OpenAi, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::failed(
                TtsProvider::OpenAi,
                format!("HTTP {}: {}", status, body),
            ));
        }

        response
            .bytes()
            .await
            .map_err(|e| TtsError::failed(TtsProvider::OpenAi, e.to_string()))
    }

    fn provider(&self) -> TtsProvider {
        TtsProvider::OpenAi
    }
}
