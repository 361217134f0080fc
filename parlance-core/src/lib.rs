//! # parlance-core
//!
//! Language-coaching engine: speaking practice feedback, vocabulary lookup
//! and scene-aware translation backed by a hosted language model.
//!
//! ## Architecture
//!
//! ```text
//! JSON body → schema::validate → LanguageService
//!                                     │
//!                               mode decision ──► fallback (Mock)
//!                                     │
//!                          HandoffStore (audioId) + LanguageModel::transcribe
//!                                     │
//!                          prompts → LanguageModel::complete_json
//!                                     │
//!                          parse → normalize → Served<T>
//! ```
//!
//! Nothing here knows about HTTP; the server crate maps `Served` and
//! `ParlanceError` onto responses.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod fallback;
pub mod handoff;
pub mod provider;
pub mod schema;

// Convenience re-exports for downstream crates
pub use engine::{
    DiagnosticsSnapshot, LanguageService, ResponseSource, Served, ServiceConfig,
    ServiceDiagnostics,
};
pub use error::ParlanceError;
pub use handoff::{HandoffConfig, HandoffStore, MemoryHandoffStore, SharedHandoffStore};
pub use provider::{
    ChatRequest, LanguageModel, OpenAiConfig, OpenAiModel, ProviderHandle, ScriptedModel,
};
pub use schema::ValidationErrors;
