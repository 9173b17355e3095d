//! Phone Agent Server
//!
//! Webhook, audio and admin endpoints for the phone agent.

pub mod admin;
pub mod http;
pub mod metrics;
pub mod signature;
pub mod state;
pub mod webhooks;

pub use http::create_router;
pub use metrics::{get_metrics_handle, init_metrics};
pub use signature::SignatureValidator;
pub use state::AppState;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Forbidden => StatusCode::FORBIDDEN,
            ServerError::Config(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        match self {
            ServerError::Forbidden => (status, "Forbidden").into_response(),
            ServerError::NotFound(what) => {
                (status, Json(serde_json::json!({ "error": what }))).into_response()
            }
            ServerError::InvalidRequest(message) => (
                status,
                Json(serde_json::json!({ "success": false, "error": message })),
            )
                .into_response(),
            ServerError::Config(message) | ServerError::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                (
                    status,
                    Json(serde_json::json!({
                        "error": "Internal server error",
                        "message": message,
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl From<phone_agent_core::Error> for ServerError {
    fn from(err: phone_agent_core::Error) -> Self {
        match err {
            phone_agent_core::Error::InvalidInput(msg) => ServerError::InvalidRequest(msg),
            phone_agent_core::Error::Config(msg) => ServerError::Config(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<phone_agent_config::ConfigError> for ServerError {
    fn from(err: phone_agent_config::ConfigError) -> Self {
        ServerError::Config(err.to_string())
    }
}
