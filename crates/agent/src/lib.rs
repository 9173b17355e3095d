//! Call handling for the phone agent
//!
//! Features:
//! - Turn orchestration: greeting, topic bumpers, generated replies
//! - First-utterance keyword routing
//! - Failure-tolerant access to the conversation store
//! - TwiML response building

pub mod conversation;
pub mod orchestrator;
pub mod router;
pub mod twiml;

pub use conversation::ConversationState;
pub use orchestrator::{
    fixed_prompts, sanitize_speech, InboundTurn, OrchestratorConfig, TurnOrchestrator, APOLOGY,
    FOLLOW_UP, GREETING, VOICE_WEBHOOK_PATH,
};
pub use router::{route_first_utterance, Topic, BUMPERS, LEGAL_BUMPER, MEDICAL_BUMPER};
pub use twiml::{GatherOptions, TwimlBuilder};
