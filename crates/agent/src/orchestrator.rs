//! Turn Orchestrator
//!
//! Handles one inbound webhook turn end to end and returns the TwiML to send
//! back. The call stage is derived from the stored history on every turn, so
//! nothing about a call lives in this process between requests.
//!
//! Every path ends in either a gather or a hangup. Generation and synthesis
//! failures are answered with a spoken apology followed by a hangup. The
//! whole turn runs inside a budget shorter than the HTTP request timeout, so
//! the phone leg never sees a bare timeout response.

use std::sync::Arc;
use std::time::{Duration, Instant};

use phone_agent_config::Settings;
use phone_agent_core::{
    classify_turn, CallRecord, CallStage, Error, LanguageModel, Result, Turn, TurnRole,
};
use phone_agent_pipeline::{
    random_filler, AudioCache, FillerPreloader, PreloadReport, SpeechService,
};

use crate::conversation::ConversationState;
use crate::router::{route_first_utterance, BUMPERS};
use crate::twiml::{GatherOptions, TwimlBuilder};

pub const GREETING: &str = "Thank you for calling Workforce Shield. How can I help you today?";
pub const FOLLOW_UP: &str = "Is there anything else I can help you with?";
pub const APOLOGY: &str = "I apologize, but I encountered an error. Please try again later.";

/// Path of the inbound voice webhook; gathers and redirects post back here
pub const VOICE_WEBHOOK_PATH: &str = "/webhook/voice";

/// Fixed prompts pinned in the cache at startup, besides the fillers
pub fn fixed_prompts() -> Vec<&'static str> {
    let mut prompts = vec![GREETING, FOLLOW_UP, APOLOGY];
    prompts.extend(BUMPERS);
    prompts
}

/// Turn budget for a request timeout: up to one second of headroom, never
/// more than half the timeout
pub fn turn_budget(request_timeout: Duration) -> Duration {
    let headroom = (request_timeout / 2).min(Duration::from_secs(1));
    request_timeout.saturating_sub(headroom)
}

/// Strip markup characters from transcribed speech
pub fn sanitize_speech(speech: &str) -> String {
    speech.trim().replace(['<', '>'], "")
}

/// One inbound webhook request
#[derive(Debug, Clone, Default)]
pub struct InboundTurn {
    pub call_sid: String,
    pub from: String,
    pub to: String,
    /// Transcribed caller speech, absent on the first request of a call
    pub speech: Option<String>,
    /// Public origin used to build audio URLs
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Synthesis voice for every spoken prompt
    pub voice: String,
    pub gather_timeout_secs: u32,
    pub language: String,
    /// Provider voice for the last-resort `<Say>`
    pub fallback_voice: String,
    /// Wall-clock limit for one turn, apology included
    pub turn_budget: Duration,
}

impl From<&Settings> for OrchestratorConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            voice: settings.tts.voice.clone(),
            gather_timeout_secs: settings.telephony.gather_timeout_secs,
            language: settings.telephony.language.clone(),
            fallback_voice: settings.telephony.fallback_voice.clone(),
            turn_budget: turn_budget(Duration::from_secs(settings.server.timeout_seconds.max(1))),
        }
    }
}

pub struct TurnOrchestrator {
    speech: Arc<SpeechService>,
    llm: Arc<dyn LanguageModel>,
    state: ConversationState,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    pub fn new(
        speech: Arc<SpeechService>,
        llm: Arc<dyn LanguageModel>,
        state: ConversationState,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            speech,
            llm,
            state,
            config,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn speech(&self) -> &Arc<SpeechService> {
        &self.speech
    }

    /// Pin fillers and fixed prompts for the configured voice
    pub async fn preload(&self) -> PreloadReport {
        let preloader = FillerPreloader::new(self.speech.clone());
        let mut report = preloader.preload(&self.config.voice).await;
        let prompts = preloader
            .preload_phrases(&fixed_prompts(), &self.config.voice)
            .await;
        report.loaded += prompts.loaded;
        report.failed.extend(prompts.failed);
        report
    }

    /// Produce the TwiML for one turn. Never fails.
    pub async fn handle_turn(&self, turn: InboundTurn) -> String {
        let start = Instant::now();
        let text = sanitize_speech(turn.speech.as_deref().unwrap_or_default());

        let history = if text.is_empty() {
            Vec::new()
        } else {
            self.state.history(&turn.call_sid).await
        };
        let stage = classify_turn(Some(&text), &history);
        metrics::counter!("phone_agent_turns_total", "stage" => stage.as_str()).increment(1);

        tracing::info!(
            call_sid = %turn.call_sid,
            stage = %stage,
            history_len = history.len(),
            "Handling turn"
        );

        let dispatch = async {
            match stage {
                // Speech that sanitized to nothing is a silent turn on a live call
                CallStage::Greeting if turn.speech.is_some() => self.reprompt(&turn).await,
                CallStage::Greeting => self.greet(&turn).await,
                CallStage::Routing => self.route(&turn, &text, &history).await,
                CallStage::Conversing => self.converse(&turn, &text, &history).await,
            }
        };

        let budget = self.config.turn_budget;
        let twiml = match tokio::time::timeout(budget, dispatch).await {
            Ok(Ok(response)) => response.build(),
            Ok(Err(e)) => {
                if e.is_backend_failure() {
                    tracing::warn!(call_sid = %turn.call_sid, stage = %stage, error = %e, "Backend failed during turn");
                } else {
                    tracing::error!(call_sid = %turn.call_sid, stage = %stage, error = %e, "Turn failed");
                }
                let remaining = budget.saturating_sub(start.elapsed());
                match tokio::time::timeout(remaining, self.apologize(&turn)).await {
                    Ok(response) => response.build(),
                    Err(_) => self.fallback_response(&turn.base_url),
                }
            }
            Err(_) => {
                tracing::error!(
                    call_sid = %turn.call_sid,
                    stage = %stage,
                    budget_ms = budget.as_millis() as u64,
                    "Turn budget exhausted"
                );
                metrics::counter!("phone_agent_turn_budget_exceeded_total").increment(1);
                self.fallback_response(&turn.base_url)
            }
        };

        metrics::histogram!("phone_agent_turn_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        twiml
    }

    async fn greet(&self, turn: &InboundTurn) -> Result<TwimlBuilder> {
        self.state
            .start_call(CallRecord::started(&turn.call_sid, &turn.from, &turn.to))
            .await;

        let greeting = self.audio_url(turn, GREETING, true).await?;
        Ok(TwimlBuilder::new().play(greeting).gather(self.gather_options()))
    }

    async fn reprompt(&self, turn: &InboundTurn) -> Result<TwimlBuilder> {
        tracing::debug!(call_sid = %turn.call_sid, "Empty speech after sanitizing, reprompting");
        self.continue_call(turn, TwimlBuilder::new()).await
    }

    async fn route(&self, turn: &InboundTurn, text: &str, history: &[Turn]) -> Result<TwimlBuilder> {
        let Some(topic) = route_first_utterance(text) else {
            return self.converse(turn, text, history).await;
        };

        tracing::info!(call_sid = %turn.call_sid, topic = topic.as_str(), "Routing to bumper");
        let bumper = topic.bumper();
        self.state.append(&turn.call_sid, TurnRole::User, text).await;
        self.state
            .append(&turn.call_sid, TurnRole::Assistant, bumper)
            .await;

        let url = self.audio_url(turn, bumper, true).await?;
        self.continue_call(turn, TwimlBuilder::new().play(url)).await
    }

    async fn converse(&self, turn: &InboundTurn, text: &str, history: &[Turn]) -> Result<TwimlBuilder> {
        let mut response = TwimlBuilder::new();
        if let Some(url) = self.filler_url(turn).await {
            response = response.play(url);
        }

        self.state.append(&turn.call_sid, TurnRole::User, text).await;

        let reply = self.llm.generate(text, history).await?;
        tracing::info!(
            call_sid = %turn.call_sid,
            model = self.llm.model_name(),
            chars = reply.len(),
            "Reply generated"
        );
        self.state
            .append(&turn.call_sid, TurnRole::Assistant, &reply)
            .await;

        let url = self.audio_url(turn, &reply, false).await?;
        self.continue_call(turn, response.play(url)).await
    }

    /// Gather the next utterance, then prompt and loop back if the caller is silent
    async fn continue_call(&self, turn: &InboundTurn, response: TwimlBuilder) -> Result<TwimlBuilder> {
        let follow_up = self.audio_url(turn, FOLLOW_UP, true).await?;
        Ok(response
            .gather(self.gather_options())
            .play(follow_up)
            .redirect(VOICE_WEBHOOK_PATH))
    }

    async fn filler_url(&self, turn: &InboundTurn) -> Option<String> {
        let (phrase, _) = random_filler(&self.config.voice);
        match self.audio_url(turn, phrase, true).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(call_sid = %turn.call_sid, phrase, error = %e, "Filler unavailable, skipping");
                None
            }
        }
    }

    async fn apologize(&self, turn: &InboundTurn) -> TwimlBuilder {
        match self.audio_url(turn, APOLOGY, true).await {
            Ok(url) => TwimlBuilder::new().play(url).hangup(),
            Err(e) => {
                tracing::error!(call_sid = %turn.call_sid, error = %e, "Apology synthesis failed");
                TwimlBuilder::new()
                    .say(&self.config.fallback_voice, &self.config.language, APOLOGY)
                    .hangup()
            }
        }
    }

    /// Apology and hangup without any synthesis: the pinned recording when
    /// cached, the provider's `<Say>` otherwise
    pub fn fallback_response(&self, base_url: &str) -> String {
        let key = AudioCache::key_for(APOLOGY, &self.config.voice);
        let response = if self.speech.cache().contains(&key) {
            TwimlBuilder::new().play(format!("{}/audio/{}", base_url.trim_end_matches('/'), key))
        } else {
            TwimlBuilder::new().say(&self.config.fallback_voice, &self.config.language, APOLOGY)
        };
        response.hangup().build()
    }

    async fn audio_url(&self, turn: &InboundTurn, text: &str, pinned: bool) -> Result<String> {
        let voice = &self.config.voice;
        let key = if pinned {
            self.speech.resolve_pinned(text, voice).await
        } else {
            self.speech.resolve(text, voice).await
        }
        .map_err(Error::from)?;

        Ok(format!("{}/audio/{}", turn.base_url.trim_end_matches('/'), key))
    }

    fn gather_options(&self) -> GatherOptions {
        GatherOptions {
            action: VOICE_WEBHOOK_PATH.to_string(),
            timeout_secs: self.config.gather_timeout_secs,
            language: self.config.language.clone(),
        }
    }
}
