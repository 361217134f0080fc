//! Provider-call pipeline shared by every operation.
//!
//! ## Stages (per request)
//!
//! ```text
//! 1. Mode decision      → Mock when mock_mode is set or no provider exists
//! 2. Payload assembly   → inline audioBase64, else consume audioId
//! 3. Transcription      → practice only; failures degrade to text input
//! 4. Prompt             → deterministic instruction + JSON schema
//! 5. Invoke             → one JSON-mode completion, no retry
//! 6. Parse              → strip fences, ParseOutcome
//! 7. Normalize          → clamp scores, trim/dedupe/cap lists
//! 8. Failure            → Fallback if fallback_on_error, else ServiceUnavailable
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
    engine::{
        normalize::{
            normalize_practice, normalize_translation, normalize_vocabulary, PracticeReply,
            TranslationReply, VocabularyReply,
        },
        parse::parse_reply,
        prompts, LanguageService,
    },
    error::{ParlanceError, Result},
    provider::ProviderHandle,
    schema::types::{
        PracticeFeedback, PracticeRequest, TranslationRequest, TranslationResponse,
        VocabularyRequest, VocabularyResponse,
    },
};

/// File name reported to the transcription endpoint.
const SPEECH_FILE_NAME: &str = "speech.webm";

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// Provider reply, parsed and normalized.
    Live,
    /// Provider skipped (mock mode or no credential).
    Mock,
    /// Provider call failed and the static payload was substituted.
    Fallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Mock => "mock",
            Self::Fallback => "fallback",
        }
    }
}

/// A result together with how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    pub value: T,
    pub source: ResponseSource,
}

pub struct ServiceDiagnostics {
    pub requests: AtomicUsize,
    pub mock_served: AtomicUsize,
    pub provider_calls: AtomicUsize,
    pub provider_errors: AtomicUsize,
    pub fallback_served: AtomicUsize,
    pub transcription_failures: AtomicUsize,
    pub handoff_stored: AtomicUsize,
    pub handoff_consumed: AtomicUsize,
}

impl Default for ServiceDiagnostics {
    fn default() -> Self {
        Self {
            requests: AtomicUsize::new(0),
            mock_served: AtomicUsize::new(0),
            provider_calls: AtomicUsize::new(0),
            provider_errors: AtomicUsize::new(0),
            fallback_served: AtomicUsize::new(0),
            transcription_failures: AtomicUsize::new(0),
            handoff_stored: AtomicUsize::new(0),
            handoff_consumed: AtomicUsize::new(0),
        }
    }
}

impl ServiceDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            mock_served: self.mock_served.load(Ordering::Relaxed),
            provider_calls: self.provider_calls.load(Ordering::Relaxed),
            provider_errors: self.provider_errors.load(Ordering::Relaxed),
            fallback_served: self.fallback_served.load(Ordering::Relaxed),
            transcription_failures: self.transcription_failures.load(Ordering::Relaxed),
            handoff_stored: self.handoff_stored.load(Ordering::Relaxed),
            handoff_consumed: self.handoff_consumed.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_handoff_stored(&self) {
        self.handoff_stored.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub requests: usize,
    pub mock_served: usize,
    pub provider_calls: usize,
    pub provider_errors: usize,
    pub fallback_served: usize,
    pub transcription_failures: usize,
    pub handoff_stored: usize,
    pub handoff_consumed: usize,
}

/// Strip an optional `data:<mime>;base64,` prefix and interior whitespace.
pub fn normalize_base64(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed.rsplit(',').next().unwrap_or(trimmed);
    body.chars().filter(|c| !c.is_whitespace()).collect()
}

impl LanguageService {
    /// Mode decision + failure policy around one live operation.
    pub(crate) async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        fallback: impl FnOnce() -> T,
        live: F,
    ) -> Result<Served<T>>
    where
        F: FnOnce(ProviderHandle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.diagnostics.requests.fetch_add(1, Ordering::Relaxed);

        let provider = match (&self.provider, self.config.mock_mode) {
            (Some(provider), false) => provider.clone(),
            (provider, mock_mode) => {
                warn!(
                    operation,
                    mock_mode,
                    has_provider = provider.is_some(),
                    "returning mock response"
                );
                self.diagnostics.mock_served.fetch_add(1, Ordering::Relaxed);
                return Ok(Served {
                    value: fallback(),
                    source: ResponseSource::Mock,
                });
            }
        };

        info!(operation, provider = provider.name(), "language service start");
        match live(provider).await {
            Ok(value) => {
                info!(operation, "language service success");
                Ok(Served {
                    value,
                    source: ResponseSource::Live,
                })
            }
            Err(e) => {
                self.diagnostics
                    .provider_errors
                    .fetch_add(1, Ordering::Relaxed);
                error!(operation, error = %e, "language service error");
                if self.config.fallback_on_error {
                    warn!(operation, "serving fallback due to failure");
                    self.diagnostics
                        .fallback_served
                        .fetch_add(1, Ordering::Relaxed);
                    Ok(Served {
                        value: fallback(),
                        source: ResponseSource::Fallback,
                    })
                } else {
                    Err(ParlanceError::ServiceUnavailable)
                }
            }
        }
    }

    pub(crate) async fn practice_live(
        &self,
        provider: ProviderHandle,
        request: &PracticeRequest,
    ) -> Result<PracticeFeedback> {
        let spoken_text = match self.resolve_audio(request) {
            Some(audio) => self.transcribe(&provider, &audio).await,
            None => None,
        };

        let chat = prompts::practice(request, spoken_text.as_deref());
        self.diagnostics
            .provider_calls
            .fetch_add(1, Ordering::Relaxed);
        let raw = provider.0.complete_json(&chat).await?;
        let reply: PracticeReply = parse_reply(&raw).into_result(chat.operation)?;

        let heard = request
            .transcript
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(spoken_text.as_deref());
        Ok(normalize_practice(reply, heard))
    }

    pub(crate) async fn vocabulary_live(
        &self,
        provider: ProviderHandle,
        request: &VocabularyRequest,
    ) -> Result<VocabularyResponse> {
        let chat = prompts::vocabulary(&request.word, &request.language);
        self.diagnostics
            .provider_calls
            .fetch_add(1, Ordering::Relaxed);
        let raw = provider.0.complete_json(&chat).await?;
        debug!(
            word = %request.word,
            raw_len = raw.len(),
            "vocabulary reply received"
        );
        let reply: VocabularyReply = parse_reply(&raw).into_result(chat.operation)?;
        Ok(normalize_vocabulary(reply, request))
    }

    pub(crate) async fn translation_live(
        &self,
        provider: ProviderHandle,
        request: &TranslationRequest,
    ) -> Result<TranslationResponse> {
        let chat = prompts::translation(&request.text, request.scene.as_deref(), request.tone);
        self.diagnostics
            .provider_calls
            .fetch_add(1, Ordering::Relaxed);
        let raw = provider.0.complete_json(&chat).await?;
        let reply: TranslationReply = parse_reply(&raw).into_result(chat.operation)?;
        Ok(normalize_translation(reply))
    }

    /// Inline audio wins; otherwise the referenced hand-off entry is
    /// consumed. Missing audio is not an error.
    fn resolve_audio(&self, request: &PracticeRequest) -> Option<String> {
        if let Some(inline) = request
            .audio_base64
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
        {
            return Some(inline.to_string());
        }
        let id = request.audio_id.as_deref()?;
        match self.handoff.consume(id) {
            Some(payload) => {
                self.diagnostics
                    .handoff_consumed
                    .fetch_add(1, Ordering::Relaxed);
                (!payload.is_empty()).then_some(payload)
            }
            None => {
                warn!(audio_id = id, "referenced audio not found, continuing with text only");
                None
            }
        }
    }

    /// Speech-to-text. Every failure is logged and reported as `None`.
    async fn transcribe(&self, provider: &ProviderHandle, audio_base64: &str) -> Option<String> {
        let bytes = match STANDARD.decode(normalize_base64(audio_base64)) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => return None,
            Err(e) => {
                self.record_transcription_failure(&ParlanceError::AudioDecode(e));
                return None;
            }
        };

        match provider.0.transcribe(bytes, SPEECH_FILE_NAME).await {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(e) => {
                self.record_transcription_failure(&e);
                None
            }
        }
    }

    fn record_transcription_failure(&self, error: &ParlanceError) {
        self.diagnostics
            .transcription_failures
            .fetch_add(1, Ordering::Relaxed);
        warn!(error = %error, "transcription failed, continuing with text input");
    }
}
