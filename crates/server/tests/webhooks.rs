//! Router-level tests for the webhook, audio and admin endpoints

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use phone_agent_agent::{APOLOGY, GREETING, LEGAL_BUMPER};
use phone_agent_config::Settings;
use phone_agent_core::{
    CallRecord, CallStatus, ConversationStore, LanguageModel, Result, Turn, TurnRole,
};
use phone_agent_llm::KnowledgeBase;
use phone_agent_persistence::InMemoryStore;
use phone_agent_pipeline::{
    AudioCache, SpeechService, SynthesisGateway, TtsBackend, TtsError, TtsProvider, FILLER_PHRASES,
};
use phone_agent_server::signature::compute_signature;
use phone_agent_server::{create_router, AppState};

const BASE: &str = "https://agent.example.com";
const ANSWER: &str = "We're available 24/7. You can call us anytime.";

struct EchoTts;

#[async_trait]
impl TtsBackend for EchoTts {
    async fn synthesize(&self, text: &str, _voice: &str) -> std::result::Result<Bytes, TtsError> {
        Ok(Bytes::from(format!("mp3:{}", text)))
    }

    fn provider(&self) -> TtsProvider {
        TtsProvider::OpenAi
    }
}

/// Answers only after `delay`
struct SlowTts {
    delay: Duration,
}

#[async_trait]
impl TtsBackend for SlowTts {
    async fn synthesize(&self, text: &str, _voice: &str) -> std::result::Result<Bytes, TtsError> {
        tokio::time::sleep(self.delay).await;
        Ok(Bytes::from(format!("mp3:{}", text)))
    }

    fn provider(&self) -> TtsProvider {
        TtsProvider::OpenAi
    }
}

struct FixedLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for FixedLlm {
    async fn generate(&self, _user_text: &str, _history: &[Turn]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ANSWER.to_string())
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    llm: Arc<FixedLlm>,
    _dir: tempfile::TempDir,
}

fn app_with_token(auth_token: &str) -> TestApp {
    build_app(auth_token, Arc::new(EchoTts), Settings::default())
}

fn build_app(auth_token: &str, tts: Arc<dyn TtsBackend>, mut config: Settings) -> TestApp {
    config.server.public_base_url = Some(BASE.to_string());
    config.telephony.auth_token = auth_token.to_string();
    config.tts.voice = "sage".to_string();

    let dir = tempfile::tempdir().unwrap();
    let knowledge = KnowledgeBase::new(dir.path().join("knowledge-base.txt"));

    let cache = Arc::new(AudioCache::new(Duration::from_secs(3600)));
    let gateway = Arc::new(SynthesisGateway::new(tts, Duration::from_secs(5)));
    let speech = Arc::new(SpeechService::new(cache, gateway));
    let store = Arc::new(InMemoryStore::new());
    let llm = Arc::new(FixedLlm {
        calls: AtomicUsize::new(0),
    });

    let state = AppState::new(config, speech, llm.clone(), store.clone(), knowledge);
    TestApp {
        router: create_router(state),
        store,
        llm,
        _dir: dir,
    }
}

fn app() -> TestApp {
    app_with_token("")
}

fn form_encode(fields: &[(&str, &str)]) -> String {
    fn encode(s: &str) -> String {
        s.bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                    (b as char).to_string()
                }
                b' ' => "+".to_string(),
                other => format!("%{:02X}", other),
            })
            .collect()
    }
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn voice_fields(speech: Option<&str>) -> Vec<(&str, &str)> {
    let mut fields = vec![
        ("CallSid", "CA100"),
        ("From", "+15550001111"),
        ("To", "+15550002222"),
    ];
    if let Some(speech) = speech {
        fields.push(("SpeechResult", speech));
    }
    fields
}

fn post_form(uri: &str, fields: &[(&str, &str)], signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(signature) = signature {
        builder = builder.header("X-Twilio-Signature", signature);
    }
    builder.body(Body::from(form_encode(fields))).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8_lossy(&body).to_string())
}

fn audio_url(text: &str) -> String {
    format!("{}/audio/{}", BASE, AudioCache::key_for(text, "sage"))
}

#[tokio::test]
async fn test_greeting_turn() {
    let app = app();

    let (status, headers, body) = send(&app.router, post_form("/webhook/voice", &voice_fields(None), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/xml");
    assert!(body.contains("<Gather input=\"speech\""));
    assert!(body.contains(&audio_url(GREETING)));
    assert!(app.store.history("CA100").await.unwrap().is_empty());

    let calls = app.store.recent_calls(None, 10).await.unwrap();
    assert_eq!(calls[0].call_sid, "CA100");
    assert_eq!(calls[0].status, CallStatus::InProgress);
}

#[tokio::test]
async fn test_first_utterance_legal_bumper() {
    let app = app();

    let fields = voice_fields(Some("I was in a car accident, do you have lawyers?"));
    let (status, _, body) = send(&app.router, post_form("/webhook/voice", &fields, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&audio_url(LEGAL_BUMPER)));
    assert!(!body.contains(&audio_url(ANSWER)));
    assert_eq!(app.llm.calls.load(Ordering::SeqCst), 0);

    let history = app.store.history("CA100").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, TurnRole::User);
    assert_eq!(history[0].content, "I was in a car accident, do you have lawyers?");
    assert_eq!(history[1].role, TurnRole::Assistant);
    assert_eq!(history[1].content, LEGAL_BUMPER);
}

#[tokio::test]
async fn test_conversing_turn_then_audio_fetch() {
    let app = app();
    app.store.append_turn("CA100", TurnRole::User, "hello").await.unwrap();
    app.store
        .append_turn("CA100", TurnRole::Assistant, "Hi, how can I help?")
        .await
        .unwrap();

    let fields = voice_fields(Some("what are your hours"));
    let (status, _, body) = send(&app.router, post_form("/webhook/voice", &fields, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(FILLER_PHRASES.iter().any(|p| body.contains(&audio_url(p))));
    assert!(body.contains(&audio_url(ANSWER)));
    assert!(body.contains("<Redirect"));

    let history = app.store.history("CA100").await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].content, "what are your hours");
    assert_eq!(history[3].content, ANSWER);

    // Unknown key
    let (status, _, body) = send(&app.router, get("/audio/0123456789abcdef0123456789abcdef")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&body).unwrap(),
        serde_json::json!({"error": "Audio not found"})
    );

    // Key produced by the turn above
    let key = AudioCache::key_for(ANSWER, "sage");
    let expected = format!("mp3:{}", ANSWER);
    let (status, headers, body) = send(&app.router, get(&format!("/audio/{}", key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");
    assert_eq!(headers[header::CONTENT_LENGTH], expected.len().to_string().as_str());
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_signature_enforced_when_token_configured() {
    let app = app_with_token("secret");
    let fields = voice_fields(None);

    let (status, _, body) = send(&app.router, post_form("/webhook/voice", &fields, Some("bm90LXZhbGlk"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Forbidden");
    assert!(app.store.recent_calls(None, 10).await.unwrap().is_empty());

    let (status, _, _) = send(&app.router, post_form("/webhook/voice", &fields, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let params: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let signature = compute_signature("secret", &format!("{}/webhook/voice", BASE), &params);
    let (status, _, body) = send(&app.router, post_form("/webhook/voice", &fields, Some(&signature))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<Gather"));
}

#[tokio::test]
async fn test_status_callback_updates_call() {
    let app = app();
    app.store
        .log_call(CallRecord::started("CA100", "+15550001111", "+15550002222"))
        .await
        .unwrap();

    let fields = [
        ("CallSid", "CA100"),
        ("CallStatus", "completed"),
        ("CallDuration", "42"),
    ];
    let (status, _, body) = send(&app.router, post_form("/webhook/status", &fields, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    let calls = app.store.recent_calls(Some(CallStatus::Completed), 10).await.unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].duration_secs, Some(42));
}

#[tokio::test]
async fn test_status_callback_always_ok() {
    let app = app_with_token("secret");

    // Bad signature
    let fields = [("CallSid", "CA100"), ("CallStatus", "completed")];
    let (status, _, body) = send(&app.router, post_form("/webhook/status", &fields, Some("junk"))).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));

    // Not a form at all
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/status")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"CallSid\": 1}"))
        .unwrap();
    let (status, _, body) = send(&app.router, request).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));

    // Unknown status and unparseable duration
    let app = app_with_token("");
    let fields = [("CallSid", "CA100"), ("CallStatus", "exploded"), ("CallDuration", "abc")];
    let (status, _, _) = send(&app.router, post_form("/webhook/status", &fields, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_knowledge_base_admin() {
    let app = app();

    let post_json = |body: &str| {
        Request::builder()
            .method("POST")
            .uri("/admin/knowledge-base")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, _, body) = send(&app.router, post_json("{\"content\": 5}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], false);

    let (status, _, _) = send(&app.router, post_json("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app.router, post_json("{\"content\": \"Hours: 24/7\"}")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Knowledge base updated successfully");
    assert_eq!(json["contentLength"], 11);

    let (status, _, body) = send(&app.router, get("/admin/knowledge-base")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["content"], "Hours: 24/7");
}

#[tokio::test]
async fn test_call_log_admin() {
    let app = app();
    for sid in ["CA1", "CA2", "CA3"] {
        app.store
            .log_call(CallRecord::started(sid, "+15550001111", "+15550002222"))
            .await
            .unwrap();
    }
    app.store
        .update_call_status("CA2", CallStatus::Completed, Some(30))
        .await
        .unwrap();

    let (status, _, body) = send(&app.router, get("/admin/calls")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 3);

    let (_, _, body) = send(&app.router, get("/admin/calls?status=completed&limit=10")).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["calls"][0]["call_sid"], "CA2");

    let (_, _, body) = send(&app.router, get("/admin/calls?limit=2")).await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["count"], 2);

    let (status, _, _) = send(&app.router, get("/admin/calls?status=exploded")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_fallback() {
    let app = app();

    let (status, _, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["signature_validation"], false);
    assert!(json["cache"]["entries"].is_number());

    let (status, _, body) = send(&app.router, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&body).unwrap(),
        serde_json::json!({"error": "Not found"})
    );
}

#[tokio::test]
async fn test_slow_backends_still_answer_with_twiml() {
    let mut config = Settings::default();
    config.server.timeout_seconds = 1;
    let tts = Arc::new(SlowTts {
        delay: Duration::from_millis(600),
    });
    let app = build_app("", tts, config);
    app.store
        .append_turn("CA100", TurnRole::User, "hello")
        .await
        .unwrap();

    let (status, headers, body) = send(
        &app.router,
        post_form("/webhook/voice", &voice_fields(Some("what are your hours")), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/xml");
    assert!(body.contains("<Response>"));
    assert!(body.contains(APOLOGY));
    assert!(body.ends_with("<Hangup/></Response>"));
}

#[tokio::test]
async fn test_unreadable_voice_body_gets_twiml() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook/voice")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"CallSid\":\"CA100\"}"))
        .unwrap();

    let (status, headers, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/xml");
    assert!(body.ends_with("<Hangup/></Response>"));
    assert!(app.store.recent_calls(None, 10).await.unwrap().is_empty());
}
