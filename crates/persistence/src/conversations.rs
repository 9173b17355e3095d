//! Conversation and call-log persistence using ScyllaDB

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

use phone_agent_core::{CallRecord, CallStatus, ConversationStore, Turn, TurnRole};

use crate::{PersistenceError, ScyllaClient};

/// Row shape of `call_logs`
type CallLogRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i32>,
    Option<i64>,
);

/// ScyllaDB implementation of [`ConversationStore`]
pub struct ScyllaConversationStore {
    client: ScyllaClient,
    last_seq: AtomicI64,
}

impl ScyllaConversationStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self {
            client,
            last_seq: AtomicI64::new(0),
        }
    }

    /// Clustering value for the next turn: wall-clock micros, bumped so two
    /// appends in the same microsecond still sort in append order.
    fn next_seq(&self) -> i64 {
        next_monotonic(&self.last_seq, Utc::now().timestamp_micros())
    }

    async fn insert_turn(
        &self,
        call_sid: &str,
        role: TurnRole,
        content: &str,
    ) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.conversation_messages (call_sid, seq, role, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    call_sid,
                    self.next_seq(),
                    role.as_str(),
                    content,
                    Utc::now().timestamp_millis(),
                ),
            )
            .await?;

        Ok(())
    }

    async fn select_history(&self, call_sid: &str) -> Result<Vec<Turn>, PersistenceError> {
        let query = format!(
            "SELECT role, content, created_at FROM {}.conversation_messages WHERE call_sid = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (call_sid,))
            .await?;

        let mut turns = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (role, content, created_at): (String, String, i64) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                let role = TurnRole::parse(&role).ok_or_else(|| {
                    PersistenceError::InvalidData(format!("unknown role '{}'", role))
                })?;
                turns.push(Turn {
                    role,
                    content,
                    timestamp: millis_to_datetime(created_at),
                });
            }
        }

        Ok(turns)
    }

    async fn insert_call(&self, record: &CallRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.call_logs (call_sid, from_number, to_number, status, duration, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &record.call_sid,
                    &record.from_number,
                    &record.to_number,
                    record.status.as_str(),
                    record.duration_secs.map(|d| d as i32),
                    record.created_at.timestamp_millis(),
                ),
            )
            .await?;

        tracing::info!(call_sid = %record.call_sid, status = %record.status, "Call logged");
        Ok(())
    }

    async fn update_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        duration_secs: Option<u32>,
    ) -> Result<(), PersistenceError> {
        let session = self.client.session();
        match (status, duration_secs) {
            (CallStatus::Completed, Some(duration)) => {
                let query = format!(
                    "UPDATE {}.call_logs SET status = ?, duration = ? WHERE call_sid = ?",
                    self.client.keyspace()
                );
                session
                    .query_unpaged(query, (status.as_str(), duration as i32, call_sid))
                    .await?;
            }
            _ => {
                let query = format!(
                    "UPDATE {}.call_logs SET status = ? WHERE call_sid = ?",
                    self.client.keyspace()
                );
                session
                    .query_unpaged(query, (status.as_str(), call_sid))
                    .await?;
            }
        }

        tracing::debug!(call_sid = %call_sid, status = %status, "Call status updated");
        Ok(())
    }

    async fn select_calls(
        &self,
        status: Option<CallStatus>,
        limit: usize,
    ) -> Result<Vec<CallRecord>, PersistenceError> {
        let columns = "call_sid, from_number, to_number, status, duration, created_at";
        let session = self.client.session();

        // call_logs is keyed by call_sid, so ordering by time happens client side
        let result = match status {
            Some(status) => {
                let query = format!(
                    "SELECT {} FROM {}.call_logs WHERE status = ? ALLOW FILTERING",
                    columns,
                    self.client.keyspace()
                );
                session.query_unpaged(query, (status.as_str(),)).await?
            }
            None => {
                let query = format!("SELECT {} FROM {}.call_logs", columns, self.client.keyspace());
                session.query_unpaged(query, &[]).await?
            }
        };

        let mut calls = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let typed: CallLogRow = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                calls.push(row_to_record(typed));
            }
        }

        calls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        calls.truncate(limit);
        Ok(calls)
    }
}

#[async_trait]
impl ConversationStore for ScyllaConversationStore {
    async fn append_turn(
        &self,
        call_sid: &str,
        role: TurnRole,
        content: &str,
    ) -> phone_agent_core::Result<()> {
        Ok(self.insert_turn(call_sid, role, content).await?)
    }

    async fn history(&self, call_sid: &str) -> phone_agent_core::Result<Vec<Turn>> {
        Ok(self.select_history(call_sid).await?)
    }

    async fn log_call(&self, record: CallRecord) -> phone_agent_core::Result<()> {
        Ok(self.insert_call(&record).await?)
    }

    async fn update_call_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        duration_secs: Option<u32>,
    ) -> phone_agent_core::Result<()> {
        Ok(self.update_status(call_sid, status, duration_secs).await?)
    }

    async fn recent_calls(
        &self,
        status: Option<CallStatus>,
        limit: usize,
    ) -> phone_agent_core::Result<Vec<CallRecord>> {
        Ok(self.select_calls(status, limit).await?)
    }

    fn backend_name(&self) -> &str {
        "scylla"
    }
}

fn next_monotonic(last: &AtomicI64, now: i64) -> i64 {
    let mut current = last.load(Ordering::Relaxed);
    loop {
        let next = now.max(current + 1);
        match last.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => current = observed,
        }
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

fn row_to_record(row: CallLogRow) -> CallRecord {
    let (call_sid, from_number, to_number, status, duration, created_at) = row;
    CallRecord {
        call_sid,
        from_number: from_number.unwrap_or_default(),
        to_number: to_number.unwrap_or_default(),
        status: status
            .as_deref()
            .and_then(CallStatus::parse)
            .unwrap_or(CallStatus::InProgress),
        duration_secs: duration.and_then(|d| u32::try_from(d).ok()),
        created_at: created_at.map(millis_to_datetime).unwrap_or_else(Utc::now),
    }
}
