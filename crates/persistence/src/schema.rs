//! ScyllaDB schema creation
//!
//! Timestamps are stored as BIGINT epoch milliseconds.

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    // One row per call
    let call_logs_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.call_logs (
            call_sid TEXT,
            from_number TEXT,
            to_number TEXT,
            status TEXT,
            duration INT,
            created_at BIGINT,
            PRIMARY KEY (call_sid)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(call_logs_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!("Failed to create call_logs table: {}", e))
        })?;

    // Turns clustered by a per-process monotonic sequence
    let messages_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.conversation_messages (
            call_sid TEXT,
            seq BIGINT,
            role TEXT,
            content TEXT,
            created_at BIGINT,
            PRIMARY KEY ((call_sid), seq)
        ) WITH CLUSTERING ORDER BY (seq ASC)
    "#,
        keyspace
    );

    session
        .query_unpaged(messages_table, &[])
        .await
        .map_err(|e| {
            PersistenceError::SchemaError(format!(
                "Failed to create conversation_messages table: {}",
                e
            ))
        })?;

    Ok(())
}
