//! JSON contract types and boundary validation.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` with camelCase
//! field names so the HTTP layer can pass them through unchanged.

pub mod types;
pub mod validate;

pub use types::*;
pub use validate::{
    validate_audio_upload, validate_practice, validate_translation, validate_vocabulary,
    ValidationErrors,
};
