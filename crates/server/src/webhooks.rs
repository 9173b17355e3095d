//! Telephony webhooks
//!
//! Form fields arrive in the provider's PascalCase (`CallSid`, `SpeechResult`).
//! The raw field list is kept for signature verification.

use axum::{
    extract::{rejection::FormRejection, Form, OriginalUri, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;

use phone_agent_agent::InboundTurn;
use phone_agent_config::Settings;
use phone_agent_core::CallStatus;

use crate::metrics::record_rejected_webhook;
use crate::signature::SIGNATURE_HEADER;
use crate::state::AppState;
use crate::ServerError;

type FormFields = Vec<(String, String)>;

static E164: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern"));

fn field<'a>(fields: &'a FormFields, name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Whether `number` is an E.164 phone number
pub fn is_e164(number: &str) -> bool {
    E164.is_match(number)
}

/// Origin the caller reached us on: the configured public URL, else the
/// forwarded scheme and Host header.
pub fn request_base_url(config: &Settings, headers: &HeaderMap) -> String {
    if let Some(base) = &config.server.public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

fn signature_ok(state: &AppState, headers: &HeaderMap, uri: &OriginalUri, fields: &FormFields) -> bool {
    let path = uri
        .0
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.0.path());
    let url = format!("{}{}", request_base_url(&state.config, headers), path);
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    state.signatures.validate(signature, &url, fields)
}

/// POST /webhook/voice
pub async fn voice_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: OriginalUri,
    form: Result<Form<FormFields>, FormRejection>,
) -> Response {
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed voice webhook");
            record_rejected_webhook("voice");
            let twiml = state
                .orchestrator
                .fallback_response(&request_base_url(&state.config, &headers));
            return ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response();
        }
    };

    if !signature_ok(&state, &headers, &uri, &fields) {
        tracing::warn!(path = %uri.0.path(), "Invalid webhook signature");
        record_rejected_webhook("voice");
        return ServerError::Forbidden.into_response();
    }

    let call_sid = field(&fields, "CallSid").unwrap_or_default().to_string();
    let from = field(&fields, "From").unwrap_or_default().to_string();
    let to = field(&fields, "To").unwrap_or_default().to_string();
    let speech = field(&fields, "SpeechResult")
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string);

    for (label, number) in [("from", &from), ("to", &to)] {
        if !number.is_empty() && !is_e164(number) {
            tracing::debug!(call_sid = %call_sid, field = label, number = %number, "Non-E.164 number");
        }
    }

    tracing::info!(call_sid = %call_sid, from = %from, to = %to, has_speech = speech.is_some(), "Incoming call turn");

    let turn = InboundTurn {
        call_sid,
        from,
        to,
        speech,
        base_url: request_base_url(&state.config, &headers),
    };
    let twiml = state.orchestrator.handle_turn(turn).await;

    ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response()
}

/// POST /webhook/status
///
/// Always answers 200 so the provider never retries.
pub async fn status_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: OriginalUri,
    form: Result<Form<FormFields>, FormRejection>,
) -> (StatusCode, &'static str) {
    let fields = match form {
        Ok(Form(fields)) => fields,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed status callback");
            return (StatusCode::OK, "OK");
        }
    };

    if !signature_ok(&state, &headers, &uri, &fields) {
        tracing::warn!("Invalid signature on status webhook, ignoring update");
        record_rejected_webhook("status");
        return (StatusCode::OK, "OK");
    }

    let call_sid = field(&fields, "CallSid").unwrap_or_default();
    let raw_status = field(&fields, "CallStatus").unwrap_or_default();
    let duration = field(&fields, "CallDuration").and_then(|d| d.trim().parse::<u32>().ok());

    tracing::info!(call_sid = %call_sid, status = %raw_status, duration = ?duration, "Call status update");

    match (call_sid.is_empty(), CallStatus::parse(raw_status)) {
        (false, Some(status)) => {
            state
                .orchestrator
                .state()
                .update_status(call_sid, status, duration)
                .await;
        }
        _ => tracing::warn!(call_sid = %call_sid, status = %raw_status, "Unusable status callback"),
    }

    (StatusCode::OK, "OK")
}
