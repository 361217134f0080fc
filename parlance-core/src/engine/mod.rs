//! `LanguageService` — entry point for the three language operations.
//!
//! ## Request flow
//!
//! ```text
//! validated request
//!     └─► mode decision ── mock_mode / no provider ──► static fallback (Mock)
//!         └─► payload assembly (inline audio or hand-off consume)
//!             └─► transcription (practice only, failure is non-fatal)
//!                 └─► prompt ─► provider ─► parse ─► normalize ─► Live
//!                                   └── any error ──► fallback_on_error ? Fallback : ServiceUnavailable
//! ```
//!
//! `LanguageService` is `Send + Sync`; wrap it in `Arc` and share it across
//! request handlers. The hand-off store is the only shared mutable state.

pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod prompts;

use std::sync::Arc;

use tracing::info;

use crate::{
    error::Result,
    handoff::SharedHandoffStore,
    provider::ProviderHandle,
    schema::types::{
        PracticeFeedback, PracticeRequest, TranslationRequest, TranslationResponse,
        VocabularyRequest, VocabularyResponse,
    },
};

pub use pipeline::{DiagnosticsSnapshot, ResponseSource, Served, ServiceDiagnostics};

/// Behaviour switches for `LanguageService`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Never call the provider; always serve the static fallback.
    pub mock_mode: bool,
    /// Serve the static fallback (instead of failing) when a live call fails.
    pub fallback_on_error: bool,
}

/// The top-level service handle.
pub struct LanguageService {
    config: ServiceConfig,
    provider: Option<ProviderHandle>,
    handoff: SharedHandoffStore,
    diagnostics: Arc<ServiceDiagnostics>,
}

impl LanguageService {
    /// `provider = None` means no credential is configured; every operation
    /// is then served from fallback data.
    pub fn new(
        config: ServiceConfig,
        provider: Option<ProviderHandle>,
        handoff: SharedHandoffStore,
    ) -> Self {
        info!(
            mock_mode = config.mock_mode,
            fallback_on_error = config.fallback_on_error,
            provider = provider.as_ref().map(|p| p.name()).unwrap_or("none"),
            "language service init"
        );
        Self {
            config,
            provider,
            handoff,
            diagnostics: Arc::new(ServiceDiagnostics::default()),
        }
    }

    pub fn config(&self) -> ServiceConfig {
        self.config
    }

    /// Name of the configured provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_ref().map(|p| p.name())
    }

    /// `true` when requests will actually reach the provider.
    pub fn is_live(&self) -> bool {
        self.provider.is_some() && !self.config.mock_mode
    }

    /// Evaluate one speaking-practice turn.
    pub async fn practice(&self, request: &PracticeRequest) -> Result<Served<PracticeFeedback>> {
        self.run(
            "practice",
            || crate::fallback::practice_fallback().clone(),
            |provider| self.practice_live(provider, request),
        )
        .await
    }

    /// Look up a dictionary entry.
    pub async fn vocabulary(
        &self,
        request: &VocabularyRequest,
    ) -> Result<Served<VocabularyResponse>> {
        self.run(
            "vocabulary",
            || crate::fallback::vocabulary_fallback(&request.word, &request.language),
            |provider| self.vocabulary_live(provider, request),
        )
        .await
    }

    /// Produce a scene-aware translation.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<Served<TranslationResponse>> {
        self.run(
            "translation",
            || crate::fallback::translation_fallback().clone(),
            |provider| self.translation_live(provider, request),
        )
        .await
    }

    /// Store an uploaded audio payload for a later practice request.
    pub fn store_audio(&self, payload: &str) -> String {
        let id = self.handoff.store(payload);
        self.diagnostics.record_handoff_stored();
        id
    }

    /// Number of hand-off entries awaiting consumption.
    pub fn pending_audio(&self) -> usize {
        self.handoff.len()
    }

    /// Drop expired hand-off entries. Returns how many were removed.
    pub fn purge_expired_audio(&self) -> usize {
        self.handoff.purge_expired()
    }

    /// Snapshot of service counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}
