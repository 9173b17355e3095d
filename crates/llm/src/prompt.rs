//! Prompt Building
//!
//! Constructs chat prompts for the call-center agent: system rules with the
//! knowledge base inlined, the stored call history, then the caller's turn.

use serde::{Deserialize, Serialize};
use std::fmt;

use phone_agent_core::{Turn, TurnRole};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Self::new(turn.role.into(), turn.content.clone())
    }
}

/// Spoken when the knowledge base has no answer
pub const UNKNOWN_ANSWER: &str =
    "I don't have that information, but I can connect you with someone who does";

const EXAMPLE_ANSWERS: [&str; 3] = [
    "We're available 24/7. You can call us anytime at 888-744-3537.",
    "Yes, our telemedicine service connects you with certified doctors by phone, no appointment needed.",
    "Members get discounted legal rates. Would you like to speak with an attorney?",
];

/// Prompt builder
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    company: String,
    messages: Vec<Message>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("Workforce Shield")
    }
}

impl PromptBuilder {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            messages: Vec::new(),
        }
    }

    /// Add the system prompt with `knowledge` inlined
    pub fn system_prompt(mut self, knowledge: &str) -> Self {
        let prompt = self.render_system_prompt(knowledge);
        self.messages.push(Message::system(prompt));
        self
    }

    /// Add prior turns in stored order
    pub fn with_history(mut self, history: &[Turn]) -> Self {
        self.messages.extend(history.iter().map(Message::from));
        self
    }

    pub fn user_message(mut self, content: impl Into<String>) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }

    fn render_system_prompt(&self, knowledge: &str) -> String {
        let examples = EXAMPLE_ANSWERS
            .iter()
            .map(|answer| format!("- \"{}\"", answer))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "You are a helpful customer service AI assistant for {company} call center.\n\
             \n\
             CRITICAL RULES:\n\
             - Your responses MUST be spoken in 10 seconds or less (maximum 2-3 sentences)\n\
             - Answer ONLY what was asked - be direct and concise\n\
             - Use ONLY the knowledge base below to answer\n\
             - If you don't know, say \"{unknown}\"\n\
             - NO lengthy explanations - get straight to the point\n\
             \n\
             Knowledge Base:\n\
             {knowledge}\n\
             \n\
             Example good responses:\n\
             {examples}",
            company = self.company,
            unknown = UNKNOWN_ANSWER,
            knowledge = knowledge.trim(),
            examples = examples,
        )
    }
}
