//! Core traits and types for the phone agent
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation turns and the per-call stage inference
//! - Call log records
//! - Core traits for pluggable backends (generation, conversation storage)
//! - Error types

pub mod call;
pub mod conversation;
pub mod error;
pub mod traits;

pub use call::{CallRecord, CallStatus};
pub use conversation::{classify_turn, CallStage, Turn, TurnRole};
pub use error::{Error, Result};
pub use traits::{ConversationStore, LanguageModel};
