//! HTTP Endpoints
//!
//! Router for the telephony webhooks, cached audio, health, metrics and
//! admin endpoints.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::webhooks;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_origins);
    let timeout = Duration::from_secs(state.config.server.timeout_seconds.max(1));

    Router::new()
        // Telephony webhooks
        .route("/webhook/voice", post(webhooks::voice_webhook))
        .route("/webhook/status", post(webhooks::status_webhook))
        // Cached audio
        .route("/audio/:key", get(get_audio))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // Admin
        .route(
            "/admin/knowledge-base",
            get(admin::get_knowledge_base).post(admin::update_knowledge_base),
        )
        .route("/admin/calls", get(admin::list_calls))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors_layer)
        .with_state(state)
}

/// Empty origin list allows any origin
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    tracing::info!("CORS configured with {} origins", parsed.len());
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// GET /audio/:key
async fn get_audio(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.cache().get(&key) {
        Some(audio) => {
            tracing::debug!(key = %key, bytes = audio.len(), "Serving cached audio");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "audio/mpeg".to_string()),
                    (header::CONTENT_LENGTH, audio.len().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                audio,
            )
                .into_response()
        }
        None => {
            tracing::warn!(key = %key, "Audio not found in cache");
            ServerError::NotFound("Audio not found".to_string()).into_response()
        }
    }
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.cache();
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_secs(),
        "tts_provider": state.config.tts.provider.as_str(),
        "store": state.store().backend_name(),
        "signature_validation": state.signatures.is_enabled(),
        "cache": {
            "entries": cache.len(),
            "pinned": cache.pinned_count(),
            "hit_rate": cache.stats.hit_rate(),
        },
    }))
}

async fn not_found() -> ServerError {
    ServerError::NotFound("Not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_origin_lists() {
        // Construction must not panic for empty, valid, or invalid lists
        let _ = build_cors_layer(&[]);
        let _ = build_cors_layer(&["https://admin.example.com".to_string()]);
        let _ = build_cors_layer(&["bad\norigin".to_string()]);
    }
}
