//! Persistence layer for the phone agent
//!
//! Provides storage for:
//! - Per-call conversation turns
//! - The call log (start, status updates, duration)
//!
//! Two backends implement [`phone_agent_core::ConversationStore`]: ScyllaDB
//! for deployments and an in-memory map for development and degraded mode.

pub mod client;
pub mod conversations;
pub mod error;
pub mod memory;
pub mod schema;

pub use client::{ScyllaClient, ScyllaConfig};
pub use conversations::ScyllaConversationStore;
pub use error::PersistenceError;
pub use memory::InMemoryStore;

/// Connect to ScyllaDB, create the schema, and return the store
pub async fn init(config: ScyllaConfig) -> Result<ScyllaConversationStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaConversationStore::new(client))
}
