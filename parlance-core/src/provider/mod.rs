//! Language-model provider abstraction.
//!
//! The `LanguageModel` trait decouples the pipeline from any specific backend
//! (OpenAI-compatible HTTP API, scripted test double, ...). Implementations
//! must be `Send + Sync`: a single instance is shared by every in-flight
//! request and calls are never serialised.

pub mod openai;
pub mod stub;

pub use openai::{OpenAiConfig, OpenAiModel};
pub use stub::ScriptedModel;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// One JSON-mode chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Operation label used for logging and error context.
    pub operation: &'static str,
    pub system: String,
    pub user: String,
    /// Sampling temperature; kept low so replies are near-deterministic.
    pub temperature: f32,
}

/// Contract for text and speech generation backends.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Short backend label for logs and health output.
    fn name(&self) -> &str;

    /// Run a chat completion that must answer with a single JSON object.
    ///
    /// # Returns
    /// The raw reply text. It may still be wrapped in code fences; parsing
    /// is the caller's job.
    ///
    /// # Errors
    /// Network failures, non-2xx statuses and empty replies.
    async fn complete_json(&self, request: &ChatRequest) -> Result<String>;

    /// Transcribe encoded audio bytes (webm/opus, wav, ...) to text.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String>;
}

/// Thread-safe reference-counted handle to any `LanguageModel` implementor.
#[derive(Clone)]
pub struct ProviderHandle(pub Arc<dyn LanguageModel>);

impl ProviderHandle {
    /// Wrap any `LanguageModel` in a `ProviderHandle`.
    pub fn new<M: LanguageModel>(model: M) -> Self {
        Self(Arc::new(model))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("name", &self.0.name())
            .finish_non_exhaustive()
    }
}
