//! Conversation types including turns and call stages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Caller utterance
    User,
    /// Agent reply
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }

    /// Parse a stored role string
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(TurnRole::User),
            "assistant" => Some(TurnRole::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single stored message within a call's history.
///
/// Turns are immutable once stored; position is append order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the speaker
    pub role: TurnRole,
    /// Content of the turn
    pub content: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

/// Stage of a call, inferred per inbound turn from the request and the
/// stored history. Nothing about the stage is held in process memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStage {
    /// No speech yet: greet and start gathering
    Greeting,
    /// First user utterance: eligible for topic routing
    Routing,
    /// Every later utterance
    Conversing,
}

impl CallStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStage::Greeting => "greeting",
            CallStage::Routing => "routing",
            CallStage::Conversing => "conversing",
        }
    }
}

impl std::fmt::Display for CallStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify an inbound turn.
///
/// `speech` is the transcribed caller text (absent or blank means no speech was
/// captured) and `history` is the call's stored turns read before this turn's
/// user message is recorded.
pub fn classify_turn(speech: Option<&str>, history: &[Turn]) -> CallStage {
    match speech.map(str::trim) {
        None | Some("") => CallStage::Greeting,
        Some(_) if history.is_empty() => CallStage::Routing,
        Some(_) => CallStage::Conversing,
    }
}
