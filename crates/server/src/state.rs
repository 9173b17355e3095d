//! Application State
//!
//! Shared services held by every handler.

use std::sync::Arc;
use std::time::Instant;

use phone_agent_agent::{ConversationState, OrchestratorConfig, TurnOrchestrator};
use phone_agent_config::Settings;
use phone_agent_core::{ConversationStore, LanguageModel};
use phone_agent_llm::{ChatModel, KnowledgeBase};
use phone_agent_pipeline::{AudioCache, SpeechService, SynthesisGateway};

use crate::signature::SignatureValidator;
use crate::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub orchestrator: Arc<TurnOrchestrator>,
    pub knowledge: KnowledgeBase,
    pub signatures: Arc<SignatureValidator>,
    started_at: Instant,
}

impl AppState {
    /// Assemble state from already-built services
    pub fn new(
        config: Settings,
        speech: Arc<SpeechService>,
        llm: Arc<dyn LanguageModel>,
        store: Arc<dyn ConversationStore>,
        knowledge: KnowledgeBase,
    ) -> Self {
        let orchestrator = TurnOrchestrator::new(
            speech,
            llm,
            ConversationState::new(store),
            OrchestratorConfig::from(&config),
        );
        let signatures = SignatureValidator::new(&config.telephony.auth_token);

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            knowledge,
            signatures: Arc::new(signatures),
            started_at: Instant::now(),
        }
    }

    /// Build the configured backends around `store`
    pub fn from_settings(config: Settings, store: Arc<dyn ConversationStore>) -> Result<Self, ServerError> {
        let cache = Arc::new(AudioCache::new(config.tts.cache_ttl()));
        let gateway = SynthesisGateway::from_config(&config.tts)
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let speech = Arc::new(SpeechService::new(cache, Arc::new(gateway)));

        let llm = ChatModel::from_config(&config.llm).map_err(|e| ServerError::Config(e.to_string()))?;
        let knowledge = llm.knowledge_base().clone();

        tracing::info!(
            tts = %config.tts.provider,
            voice = %config.tts.voice,
            model = %config.llm.model,
            store = store.backend_name(),
            "Services initialized"
        );

        Ok(Self::new(config, speech, Arc::new(llm), store, knowledge))
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        self.orchestrator.speech().cache()
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        self.orchestrator.state().store()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
