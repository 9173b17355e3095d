//! Conversation state accessor
//!
//! Thin wrapper over the external store used by the turn path. Store
//! failures never reach the caller: reads degrade to an empty history and
//! writes are logged and dropped, so a store outage costs context but never
//! a call.

use std::sync::Arc;

use phone_agent_core::{CallRecord, CallStatus, ConversationStore, Turn, TurnRole};

#[derive(Clone)]
pub struct ConversationState {
    store: Arc<dyn ConversationStore>,
}

impl ConversationState {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Turns for the call in insertion order
    pub async fn history(&self, call_sid: &str) -> Vec<Turn> {
        match self.store.history(call_sid).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(
                    call_sid = %call_sid,
                    backend = self.store.backend_name(),
                    error = %e,
                    "History unavailable, continuing without context"
                );
                Vec::new()
            }
        }
    }

    pub async fn append(&self, call_sid: &str, role: TurnRole, content: &str) {
        if let Err(e) = self.store.append_turn(call_sid, role, content).await {
            tracing::warn!(
                call_sid = %call_sid,
                role = role.as_str(),
                error = %e,
                "Failed to store turn"
            );
        }
    }

    pub async fn start_call(&self, record: CallRecord) {
        let call_sid = record.call_sid.clone();
        if let Err(e) = self.store.log_call(record).await {
            tracing::warn!(call_sid = %call_sid, error = %e, "Failed to log call start");
        }
    }

    pub async fn update_status(&self, call_sid: &str, status: CallStatus, duration_secs: Option<u32>) {
        if let Err(e) = self
            .store
            .update_call_status(call_sid, status, duration_secs)
            .await
        {
            tracing::warn!(
                call_sid = %call_sid,
                status = status.as_str(),
                error = %e,
                "Failed to update call status"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use phone_agent_core::{Error, Result};
    use phone_agent_persistence::InMemoryStore;

    /// Store that fails every operation
    struct DownStore;

    #[async_trait]
    impl ConversationStore for DownStore {
        async fn append_turn(&self, _: &str, _: TurnRole, _: &str) -> Result<()> {
            Err(Error::PersistenceUnavailable("down".into()))
        }

        async fn history(&self, _: &str) -> Result<Vec<Turn>> {
            Err(Error::PersistenceUnavailable("down".into()))
        }

        async fn log_call(&self, _: CallRecord) -> Result<()> {
            Err(Error::PersistenceUnavailable("down".into()))
        }

        async fn update_call_status(&self, _: &str, _: CallStatus, _: Option<u32>) -> Result<()> {
            Err(Error::PersistenceUnavailable("down".into()))
        }

        async fn recent_calls(&self, _: Option<CallStatus>, _: usize) -> Result<Vec<CallRecord>> {
            Err(Error::PersistenceUnavailable("down".into()))
        }

        fn backend_name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test]
    async fn test_history_preserves_insertion_order() {
        let state = ConversationState::new(Arc::new(InMemoryStore::new()));

        state.append("CA1", TurnRole::User, "first").await;
        state.append("CA1", TurnRole::Assistant, "second").await;
        state.append("CA1", TurnRole::User, "third").await;

        let contents: Vec<_> = state
            .history("CA1")
            .await
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(state.history("CA-unknown").await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let state = ConversationState::new(Arc::new(DownStore));

        assert!(state.history("CA1").await.is_empty());
        state.append("CA1", TurnRole::User, "hello").await;
        state.start_call(CallRecord::started("CA1", "+15550001111", "+15550002222")).await;
        state.update_status("CA1", CallStatus::Completed, Some(12)).await;
    }

    #[tokio::test]
    async fn test_call_log_roundtrip() {
        let store = Arc::new(InMemoryStore::new());
        let state = ConversationState::new(store.clone());

        state.start_call(CallRecord::started("CA1", "+15550001111", "+15550002222")).await;
        state.update_status("CA1", CallStatus::Completed, Some(42)).await;

        let calls = store.recent_calls(None, 10).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, CallStatus::Completed);
        assert_eq!(calls[0].duration_secs, Some(42));
    }
}
