//! HTTP surface: `/api/language/*` and `/health`.
//!
//! Handlers take the raw body and run it through `parlance_core::schema`
//! validation themselves so that malformed JSON and shape errors share one
//! 400 format: `{"error":{"formErrors":[..],"fieldErrors":{..}}}`.

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parlance_core::{
    schema::{
        validate_audio_upload, validate_practice, validate_translation, validate_vocabulary,
        AudioUploadResponse,
    },
    ParlanceError, Served, ValidationErrors,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const SOURCE_HEADER: &str = "x-parlance-source";

/// Inline audio makes bodies large; axum's 2 MB default is too small.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

const UNAVAILABLE_MESSAGE: &str = "Language service temporarily unavailable.";

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let language = Router::new()
        .route("/practice", post(practice))
        .route("/vocabulary", post(vocabulary))
        .route("/translation", post(translation))
        .route("/audio", post(upload_audio));

    Router::new()
        .route("/health", get(health))
        .nest("/api/language", language)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(request_context))
        .layer(cors)
        .with_state(state)
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationErrors),
    Unavailable,
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<ParlanceError> for ApiError {
    fn from(err: ParlanceError) -> Self {
        if !matches!(err, ParlanceError::ServiceUnavailable) {
            error!(error = %err, "language operation failed");
        }
        Self::Unavailable
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": errors }))).into_response()
            }
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": UNAVAILABLE_MESSAGE })),
            )
                .into_response(),
        }
    }
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::Validation(ValidationErrors::form("Invalid JSON body"))
    })
}

fn served<T: Serialize>(served: Served<T>) -> Response {
    (
        [(SOURCE_HEADER, served.source.as_str())],
        Json(served.value),
    )
        .into_response()
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn practice(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = validate_practice(&parse_body(&body)?)?;
    Ok(served(state.service.practice(&request).await?))
}

async fn vocabulary(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = validate_vocabulary(&parse_body(&body)?)?;
    Ok(served(state.service.vocabulary(&request).await?))
}

async fn translation(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = validate_translation(&parse_body(&body)?)?;
    Ok(served(state.service.translate(&request).await?))
}

async fn upload_audio(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let payload = validate_audio_upload(&parse_body(&body)?)?;
    let audio_id = state.service.store_audio(&payload);
    Ok((StatusCode::CREATED, Json(AudioUploadResponse { audio_id })).into_response())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health())
}

// ── Middleware ───────────────────────────────────────────────────────────

/// Tag every response with a request id and log it once.
async fn request_context(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "handled request"
    );
    response
}
