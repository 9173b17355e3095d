//! Conversation storage trait

use crate::{CallRecord, CallStatus, Result, Turn, TurnRole};
use async_trait::async_trait;

/// External store for per-call turns and the call log.
///
/// The agent only reads and appends; nothing is ever deleted through this
/// interface.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Append one turn to the call's history
    async fn append_turn(&self, call_sid: &str, role: TurnRole, content: &str) -> Result<()>;

    /// All turns for the call in append order (empty for an unknown call)
    async fn history(&self, call_sid: &str) -> Result<Vec<Turn>>;

    /// Record the start of a call
    async fn log_call(&self, record: CallRecord) -> Result<()>;

    /// Update a call's status; `duration_secs` is only stored for completed calls
    async fn update_call_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        duration_secs: Option<u32>,
    ) -> Result<()>;

    /// Most recent calls first, optionally filtered by status
    async fn recent_calls(&self, status: Option<CallStatus>, limit: usize)
        -> Result<Vec<CallRecord>>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}
