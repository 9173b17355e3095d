//! Language Model adapter
//!
//! Bridges the LlmBackend trait to the core LanguageModel trait. Each call
//! reloads the knowledge base, builds the prompt, and bounds generation with
//! a hard timeout.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use phone_agent_config::LlmConfig;
use phone_agent_core::{Error, LanguageModel, Result, Turn};

use crate::backend::{LlmBackend, OpenAIBackend, OpenAIConfig};
use crate::knowledge::KnowledgeBase;
use crate::prompt::PromptBuilder;
use crate::LlmError;

pub struct ChatModel {
    backend: Arc<dyn LlmBackend>,
    knowledge: KnowledgeBase,
    prompt: PromptBuilder,
    timeout: Duration,
    model_name: String,
}

impl ChatModel {
    pub fn new(backend: Arc<dyn LlmBackend>, knowledge: KnowledgeBase, timeout: Duration) -> Self {
        let model_name = backend.model_name().to_string();
        Self {
            backend,
            knowledge,
            prompt: PromptBuilder::default(),
            timeout,
            model_name,
        }
    }

    /// OpenAI-backed model from configuration
    pub fn from_config(config: &LlmConfig) -> std::result::Result<Self, LlmError> {
        let backend = OpenAIBackend::new(OpenAIConfig::from(config))?;
        Ok(Self::new(
            Arc::new(backend),
            KnowledgeBase::new(&config.knowledge_base_path),
            config.timeout(),
        ))
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge
    }
}

#[async_trait]
impl LanguageModel for ChatModel {
    async fn generate(&self, user_text: &str, history: &[Turn]) -> Result<String> {
        let knowledge = self.knowledge.load().await;
        let messages = self
            .prompt
            .clone()
            .system_prompt(&knowledge)
            .with_history(history)
            .user_message(user_text)
            .build();

        let timeout_ms = self.timeout.as_millis() as u64;
        let result = tokio::time::timeout(self.timeout, self.backend.generate(&messages))
            .await
            .map_err(|_| LlmError::Timeout(timeout_ms))
            .and_then(|r| r);

        match result {
            Ok(generated) => Ok(generated.text),
            Err(e) => {
                tracing::error!(model = %self.model_name, error = %e, "Reply generation failed");
                Err(Error::from(e))
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
