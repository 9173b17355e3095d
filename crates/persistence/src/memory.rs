//! In-process conversation store
//!
//! Used when persistence is disabled and as the degraded fallback when the
//! cluster is unreachable at startup. Data lives for the process lifetime.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use phone_agent_core::{CallRecord, CallStatus, ConversationStore, Result, Turn, TurnRole};

#[derive(Default)]
pub struct InMemoryStore {
    turns: RwLock<HashMap<String, Vec<Turn>>>,
    calls: RwLock<HashMap<String, CallRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls with at least one stored turn
    pub fn conversation_count(&self) -> usize {
        self.turns.read().len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn append_turn(&self, call_sid: &str, role: TurnRole, content: &str) -> Result<()> {
        self.turns
            .write()
            .entry(call_sid.to_string())
            .or_default()
            .push(Turn::new(role, content));
        Ok(())
    }

    async fn history(&self, call_sid: &str) -> Result<Vec<Turn>> {
        Ok(self.turns.read().get(call_sid).cloned().unwrap_or_default())
    }

    async fn log_call(&self, record: CallRecord) -> Result<()> {
        self.calls.write().insert(record.call_sid.clone(), record);
        Ok(())
    }

    async fn update_call_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        duration_secs: Option<u32>,
    ) -> Result<()> {
        let mut calls = self.calls.write();
        let record = calls
            .entry(call_sid.to_string())
            .or_insert_with(|| CallRecord::started(call_sid, "", ""));
        record.status = status;
        if status == CallStatus::Completed {
            if let Some(duration) = duration_secs {
                record.duration_secs = Some(duration);
            }
        }
        Ok(())
    }

    async fn recent_calls(
        &self,
        status: Option<CallStatus>,
        limit: usize,
    ) -> Result<Vec<CallRecord>> {
        let mut calls: Vec<CallRecord> = self
            .calls
            .read()
            .values()
            .filter(|record| status.map_or(true, |s| record.status == s))
            .cloned()
            .collect();
        calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        calls.truncate(limit);
        Ok(calls)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_history_preserves_append_order() {
        let store = InMemoryStore::new();
        store.append_turn("CA1", TurnRole::User, "hi").await.unwrap();
        store
            .append_turn("CA1", TurnRole::Assistant, "hello")
            .await
            .unwrap();
        store.append_turn("CA2", TurnRole::User, "other").await.unwrap();

        let history = store.history("CA1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].content, "hello");
        assert_eq!(store.conversation_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_call_has_empty_history() {
        let store = InMemoryStore::new();
        assert!(store.history("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duration_only_recorded_on_completion() {
        let store = InMemoryStore::new();
        store
            .log_call(CallRecord::started("CA1", "+15550001111", "+15550002222"))
            .await
            .unwrap();

        store
            .update_call_status("CA1", CallStatus::Ringing, Some(12))
            .await
            .unwrap();
        let calls = store.recent_calls(None, 10).await.unwrap();
        assert_eq!(calls[0].duration_secs, None);

        store
            .update_call_status("CA1", CallStatus::Completed, Some(42))
            .await
            .unwrap();
        let calls = store.recent_calls(None, 10).await.unwrap();
        assert_eq!(calls[0].status, CallStatus::Completed);
        assert_eq!(calls[0].duration_secs, Some(42));
        assert_eq!(calls[0].from_number, "+15550001111");
    }

    #[tokio::test]
    async fn test_recent_calls_filter_and_order() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for (i, sid) in ["CA1", "CA2", "CA3"].iter().enumerate() {
            let mut record = CallRecord::started(*sid, "+1", "+2");
            record.created_at = now + Duration::seconds(i as i64);
            store.log_call(record).await.unwrap();
        }
        store
            .update_call_status("CA2", CallStatus::Completed, Some(5))
            .await
            .unwrap();

        let all = store.recent_calls(None, 2).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].call_sid, "CA3");
        assert_eq!(all[1].call_sid, "CA2");

        let completed = store
            .recent_calls(Some(CallStatus::Completed), 10)
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].call_sid, "CA2");
    }
}
