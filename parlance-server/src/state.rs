//! Shared HTTP state.
//!
//! `AppState` is cloned into every handler by axum's `State` extractor; the
//! service itself sits behind an `Arc`.

use std::sync::Arc;
use std::time::Instant;

use parlance_core::{
    DiagnosticsSnapshot, LanguageService, MemoryHandoffStore, OpenAiModel, ProviderHandle,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::settings::{RuntimeSettings, ServerSettings};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LanguageService>,
    pub settings: Arc<RuntimeSettings>,
    pub started_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub service_ready: bool,
    /// Requests reach the provider (key configured, mock mode off).
    pub provider_live: bool,
    pub mock_mode: bool,
    pub fallback_on_error: bool,
    pub handoff_entries: usize,
    pub uptime_secs: u64,
    pub diagnostics: DiagnosticsSnapshot,
    pub runtime: RuntimeSettings,
}

impl AppState {
    pub fn new(service: LanguageService, settings: RuntimeSettings) -> Self {
        Self {
            service: Arc::new(service),
            settings: Arc::new(settings),
            started_at: Instant::now(),
        }
    }

    /// Wire the service from settings: OpenAI provider when a key is
    /// present, in-memory hand-off store.
    pub fn from_settings(settings: &ServerSettings) -> anyhow::Result<Self> {
        let provider = match settings.openai_config() {
            Some(config) => {
                info!(model = %config.chat_model, "OpenAI provider configured");
                Some(ProviderHandle::new(OpenAiModel::new(config)?))
            }
            None => {
                warn!("OPENAI_API_KEY not set, all responses will use fallback data");
                None
            }
        };
        let service = LanguageService::new(
            settings.service_config(),
            provider,
            MemoryHandoffStore::shared(settings.handoff_config()),
        );
        Ok(Self::new(service, settings.runtime_settings()))
    }

    pub fn health(&self) -> HealthReport {
        let config = self.service.config();
        HealthReport {
            status: "ok",
            service_ready: true,
            provider_live: self.service.is_live(),
            mock_mode: config.mock_mode,
            fallback_on_error: config.fallback_on_error,
            handoff_entries: self.service.pending_audio(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            diagnostics: self.service.diagnostics_snapshot(),
            runtime: (*self.settings).clone(),
        }
    }
}
