//! Admin endpoints
//!
//! Knowledge base editing and call log listing. These sit outside the call
//! path and may return plain HTTP errors.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use phone_agent_core::CallStatus;

use crate::state::AppState;
use crate::ServerError;

pub const DEFAULT_CALL_LIMIT: usize = 50;
const MAX_CALL_LIMIT: usize = 1000;

/// GET /admin/knowledge-base
pub async fn get_knowledge_base(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let content = state.knowledge.read().await.map_err(|e| {
        ServerError::Internal(format!("Failed to read knowledge base: {}", e))
    })?;

    Ok(Json(json!({
        "success": true,
        "contentLength": content.chars().count(),
        "content": content,
    })))
}

/// POST /admin/knowledge-base with `{"content": "..."}`
pub async fn update_knowledge_base(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let content = body
        .ok()
        .and_then(|Json(body)| body.get("content").and_then(Value::as_str).map(str::to_string))
        .ok_or_else(|| {
            ServerError::InvalidRequest("Content is required and must be a string".to_string())
        })?;

    state.knowledge.save(&content).await.map_err(|e| {
        ServerError::Internal(format!("Failed to update knowledge base: {}", e))
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Knowledge base updated successfully",
        "contentLength": content.chars().count(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct CallsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// GET /admin/calls?status=&limit=
pub async fn list_calls(
    State(state): State<AppState>,
    Query(query): Query<CallsQuery>,
) -> Result<Json<Value>, ServerError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            CallStatus::parse(raw)
                .ok_or_else(|| ServerError::InvalidRequest(format!("Unknown call status: {}", raw)))?,
        ),
    };
    let limit = query.limit.unwrap_or(DEFAULT_CALL_LIMIT).min(MAX_CALL_LIMIT);

    let calls = state.store().recent_calls(status, limit).await?;

    Ok(Json(json!({
        "success": true,
        "count": calls.len(),
        "calls": calls,
    })))
}
