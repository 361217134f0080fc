use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use parlance_core::fallback::translation_fallback;
use parlance_core::{
    HandoffConfig, LanguageService, MemoryHandoffStore, ProviderHandle, ScriptedModel,
    ServiceConfig,
};
use parlance_server::{build_router, AppState, ServerSettings};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(config: ServiceConfig, model: Option<&Arc<ScriptedModel>>) -> Router {
    let provider = model.map(|m| ProviderHandle(m.clone()));
    let service = LanguageService::new(
        config,
        provider,
        MemoryHandoffStore::shared(HandoffConfig::default()),
    );
    build_router(AppState::new(
        service,
        ServerSettings::default().runtime_settings(),
    ))
}

fn offline() -> Router {
    app(ServiceConfig::default(), None)
}

fn post(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, headers, body)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn health_reports_configuration() {
    let app = app(
        ServiceConfig {
            mock_mode: true,
            fallback_on_error: true,
        },
        None,
    );
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request");

    let (status, headers, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["serviceReady"], true);
    assert_eq!(body["providerLive"], false);
    assert_eq!(body["mockMode"], true);
    assert_eq!(body["fallbackOnError"], true);
    assert_eq!(body["handoffEntries"], 0);
    assert_eq!(body["diagnostics"]["requests"], 0);
    assert!(header_str(&headers, "x-request-id").is_some());
}

#[tokio::test]
async fn practice_without_input_is_rejected_at_prompt() {
    let model = Arc::new(ScriptedModel::new());
    let app = app(ServiceConfig::default(), Some(&model));
    let body = json!({
        "language": "English",
        "nativeLanguage": "Chinese",
        "proficiency": "beginner",
        "focus": "accuracy",
        "prompt": "   "
    });

    let (status, _, body) = send(&app, post("/api/language/practice", body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["fieldErrors"]["prompt"].is_array());
    assert_eq!(body["error"]["formErrors"], json!([]));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn invalid_enum_and_bad_json_are_client_errors() {
    let app = offline();
    let body = json!({
        "language": "English",
        "nativeLanguage": "Chinese",
        "proficiency": "expert",
        "focus": "fluency",
        "prompt": "hello"
    });
    let (status, _, body) = send(&app, post("/api/language/practice", body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"]["fieldErrors"]["proficiency"][0]
        .as_str()
        .expect("message");
    assert!(message.contains("received 'expert'"));

    let (status, _, body) = send(&app, post("/api/language/translation", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["formErrors"], json!(["Invalid JSON body"]));
}

#[tokio::test]
async fn translation_without_provider_returns_fallback() {
    let app = offline();
    let body = json!({"text": "谢谢你的帮助，我们什么时候见面？"});

    let (status, headers, body) =
        send(&app, post("/api/language/translation", body.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header_str(&headers, "x-parlance-source"), Some("mock"));
    assert_eq!(
        body,
        serde_json::to_value(translation_fallback()).expect("serialize")
    );
}

#[tokio::test]
async fn vocabulary_without_provider_names_the_word() {
    let app = offline();
    let body = json!({"language": "en", "word": "resilient"});

    let (status, _, body) = send(&app, post("/api/language/vocabulary", body.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entry"]["word"], "resilient");
    assert!(!body["entry"]["definition"].as_str().unwrap_or("").is_empty());
    assert!(!body["entry"]["example"].as_str().unwrap_or("").is_empty());
    assert_eq!(body["relatedWords"], json!([]));
}

#[tokio::test]
async fn mock_responses_are_byte_identical() {
    let app = offline();
    let body = json!({"text": "早上好", "tone": "formal"}).to_string();

    let first = app
        .clone()
        .oneshot(post("/api/language/translation", body.clone()))
        .await
        .expect("infallible");
    let second = app
        .clone()
        .oneshot(post("/api/language/translation", body))
        .await
        .expect("infallible");
    let first = first.into_body().collect().await.expect("body").to_bytes();
    let second = second.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(first, second);
}

#[tokio::test]
async fn provider_failure_without_fallback_hides_detail() {
    let model = Arc::new(ScriptedModel::new().with_failure("secret upstream detail"));
    let app = app(ServiceConfig::default(), Some(&model));
    let body = json!({"language": "en", "word": "resilient"});

    let (status, _, body) = send(&app, post("/api/language/vocabulary", body.to_string())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({"error": "Language service temporarily unavailable."})
    );
    assert!(!body.to_string().contains("secret"));
}

#[tokio::test]
async fn provider_failure_with_fallback_is_ok() {
    let model = Arc::new(ScriptedModel::new().with_failure("timeout"));
    let app = app(
        ServiceConfig {
            mock_mode: false,
            fallback_on_error: true,
        },
        Some(&model),
    );
    let body = json!({"text": "谢谢你的帮助"});

    let (status, headers, _) = send(&app, post("/api/language/translation", body.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header_str(&headers, "x-parlance-source"), Some("fallback"));
    assert_eq!(model.chat_calls().len(), 1);
}

#[tokio::test]
async fn uploaded_audio_feeds_one_practice_request() {
    let reply = json!({
        "summary": "Good.",
        "followUpQuestion": "And then?",
        "scores": {
            "grammar": {"score": 80, "explanation": "ok"},
            "pronunciation": {"score": 70, "explanation": "ok"},
            "fluency": {"score": 75, "explanation": "ok"}
        },
        "practice": {"pronunciationDrill": "Repeat it.", "speakingPrompt": "Go on.", "encouragement": "Nice."},
        "correctedResponse": "I went to the park."
    });
    let model = Arc::new(
        ScriptedModel::new()
            .with_transcript("I go to park yesterday")
            .with_reply(reply.to_string()),
    );
    let app = app(ServiceConfig::default(), Some(&model));

    let upload = json!({"audioBase64": "aGVsbG8gd29ybGQsIHNwZWFrIQ=="});
    let (status, _, body) = send(&app, post("/api/language/audio", upload.to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
    let audio_id = body["audioId"].as_str().expect("audio id").to_string();

    let practice = json!({
        "language": "English",
        "nativeLanguage": "Chinese",
        "proficiency": "beginner",
        "focus": "fluency",
        "audioId": audio_id
    });
    let (status, headers, body) =
        send(&app, post("/api/language/practice", practice.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header_str(&headers, "x-parlance-source"), Some("live"));
    assert_eq!(body["transcript"], "I go to park yesterday");
    assert_eq!(model.transcription_calls(), vec![19]);

    let health = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let (_, _, body) = send(&app, health).await;
    assert_eq!(body["serviceReady"], true);
    assert_eq!(body["providerLive"], true);
    assert_eq!(body["handoffEntries"], 0);
    assert_eq!(body["diagnostics"]["handoffConsumed"], 1);
}

#[tokio::test]
async fn short_audio_upload_is_rejected() {
    let app = offline();
    let (status, _, body) = send(
        &app,
        post("/api/language/audio", json!({"audioBase64": "abc"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["fieldErrors"]["audioBase64"].is_array());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let app = offline();
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .expect("request");

    let (_, headers, _) = send(&app, request).await;
    assert_eq!(
        header_str(&headers, "access-control-allow-origin"),
        Some("*")
    );
}
