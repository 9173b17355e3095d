//! Language model trait

use crate::{Result, Turn};
use async_trait::async_trait;

/// Text generation backend, treated as a black box: text + history -> text.
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(ChatModel::new(backend, knowledge, timeout));
/// let reply = llm.generate("what are your hours", &history).await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Produce a reply to `user_text` given the call's prior turns
    async fn generate(&self, user_text: &str, history: &[Turn]) -> Result<String>;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}
