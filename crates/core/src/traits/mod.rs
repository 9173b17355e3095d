//! Core traits for the phone agent
//!
//! Backends sit behind these traits so they can be swapped by configuration
//! and replaced with fakes in tests.
//!
//! ```text
//! Language Models:
//!   - LanguageModel: caller text + history -> reply text
//!
//! Storage:
//!   - ConversationStore: per-call turns and the call log
//! ```

mod llm;
mod store;

pub use llm::LanguageModel;
pub use store::ConversationStore;
