//! Boundary validation for incoming JSON bodies.
//!
//! Each `validate_*` function takes the untyped body and either returns the
//! typed request or a [`ValidationErrors`] with per-field messages. Nothing
//! that fails here ever reaches the provider pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::types::{
    PracticeRequest, Proficiency, SpeakingFocus, TranslationRequest, TranslationTone,
    VocabularyRequest,
};

/// Minimum length for an inline base64 audio payload.
pub const MIN_AUDIO_BASE64_LEN: usize = 20;
/// Minimum translation source length, in characters.
pub const MIN_TRANSLATION_TEXT_LEN: usize = 2;
/// Maximum scene description length, in characters.
pub const MAX_SCENE_LEN: usize = 120;

/// Field path used when a practice request carries no learner input at all.
pub const PRACTICE_INPUT_PATH: &str = "prompt";

/// Flattened validation failure: errors on the body as a whole plus errors
/// keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationErrors {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form_errors: vec![message.into()],
            field_errors: BTreeMap::new(),
        }
    }

    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    fn into_result<T>(self, value: Option<T>) -> Result<T, ValidationErrors> {
        match value {
            Some(v) if self.is_empty() => Ok(v),
            _ => Err(self),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (field, messages) in &self.field_errors {
            parts.push(format!("{field}: {}", messages.join("; ")));
        }
        f.write_str(&parts.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a practice-evaluation body.
pub fn validate_practice(body: &Value) -> Result<PracticeRequest, ValidationErrors> {
    let obj = as_object(body)?;
    let mut errors = ValidationErrors::default();
    let mut fields = FieldReader::new(obj, &mut errors);

    let language = fields.required_str("language");
    let native_language = fields.required_str("nativeLanguage");
    let proficiency = fields.required_choice("proficiency", &Proficiency::ALL, Proficiency::as_str);
    let focus = fields.required_choice("focus", &SpeakingFocus::ALL, SpeakingFocus::as_str);
    let prompt = fields.optional_str("prompt");
    let transcript = fields.optional_str("transcript");
    let audio_base64 = fields.optional_str("audioBase64");
    let audio_id = fields.optional_str("audioId");

    if let Some(audio) = audio_base64.as_deref() {
        if audio.chars().count() < MIN_AUDIO_BASE64_LEN {
            errors.add_field("audioBase64", too_short(MIN_AUDIO_BASE64_LEN));
        }
    }
    if let Some(id) = audio_id.as_deref() {
        if uuid::Uuid::parse_str(id.trim()).is_err() {
            errors.add_field("audioId", "Invalid uuid");
        }
    }

    let has_text = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    if !has_text(&prompt) && !has_text(&transcript) && audio_base64.is_none() && audio_id.is_none()
    {
        errors.add_field(
            PRACTICE_INPUT_PATH,
            "Provide text or speech input: one of prompt, transcript or audioBase64 is required",
        );
    }

    let request = match (language, native_language, proficiency, focus) {
        (Some(language), Some(native_language), Some(proficiency), Some(focus)) => {
            Some(PracticeRequest {
                language,
                native_language,
                proficiency,
                focus,
                prompt,
                audio_base64,
                audio_id: audio_id.map(|id| id.trim().to_string()),
                transcript,
            })
        }
        _ => None,
    };
    errors.into_result(request)
}

/// Validate a vocabulary-lookup body.
pub fn validate_vocabulary(body: &Value) -> Result<VocabularyRequest, ValidationErrors> {
    let obj = as_object(body)?;
    let mut errors = ValidationErrors::default();
    let mut fields = FieldReader::new(obj, &mut errors);

    let language = fields.required_str("language");
    let word = fields.required_str("word");

    if let Some(w) = word.as_deref() {
        if w.is_empty() {
            errors.add_field("word", too_short(1));
        }
    }

    let request = match (language, word) {
        (Some(language), Some(word)) => Some(VocabularyRequest { language, word }),
        _ => None,
    };
    errors.into_result(request)
}

/// Validate a translation body.
pub fn validate_translation(body: &Value) -> Result<TranslationRequest, ValidationErrors> {
    let obj = as_object(body)?;
    let mut errors = ValidationErrors::default();
    let mut fields = FieldReader::new(obj, &mut errors);

    let text = fields.required_str("text");
    let scene = fields.optional_str("scene");
    let tone = fields.optional_choice("tone", &TranslationTone::ALL, TranslationTone::as_str);

    if let Some(t) = text.as_deref() {
        if t.chars().count() < MIN_TRANSLATION_TEXT_LEN {
            errors.add_field("text", too_short(MIN_TRANSLATION_TEXT_LEN));
        }
    }
    if let Some(s) = scene.as_deref() {
        if s.chars().count() > MAX_SCENE_LEN {
            errors.add_field("scene", too_long(MAX_SCENE_LEN));
        }
    }

    let request = text.map(|text| TranslationRequest { text, scene, tone });
    errors.into_result(request)
}

/// Validate an audio upload body (`{"audioBase64": "..."}`) and return the payload.
pub fn validate_audio_upload(body: &Value) -> Result<String, ValidationErrors> {
    let obj = as_object(body)?;
    let mut errors = ValidationErrors::default();
    let mut fields = FieldReader::new(obj, &mut errors);

    let audio = fields.required_str("audioBase64");
    if let Some(a) = audio.as_deref() {
        if a.trim().chars().count() < MIN_AUDIO_BASE64_LEN {
            errors.add_field("audioBase64", too_short(MIN_AUDIO_BASE64_LEN));
        }
    }
    errors.into_result(audio)
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    body.as_object().ok_or_else(|| {
        ValidationErrors::form(format!(
            "Expected object, received {}",
            json_type_name(body)
        ))
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn too_short(min: usize) -> String {
    format!("String must contain at least {min} character(s)")
}

fn too_long(max: usize) -> String {
    format!("String must contain at most {max} character(s)")
}

struct FieldReader<'a> {
    obj: &'a Map<String, Value>,
    errors: &'a mut ValidationErrors,
}

impl<'a> FieldReader<'a> {
    fn new(obj: &'a Map<String, Value>, errors: &'a mut ValidationErrors) -> Self {
        Self { obj, errors }
    }

    fn required_str(&mut self, key: &str) -> Option<String> {
        match self.obj.get(key) {
            None | Some(Value::Null) => {
                self.errors.add_field(key, "Required");
                None
            }
            Some(v) => self.string_value(key, v),
        }
    }

    /// `null` is treated the same as an absent field.
    fn optional_str(&mut self, key: &str) -> Option<String> {
        match self.obj.get(key) {
            None | Some(Value::Null) => None,
            Some(v) => self.string_value(key, v),
        }
    }

    fn string_value(&mut self, key: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.errors.add_field(
                    key,
                    format!("Expected string, received {}", json_type_name(other)),
                );
                None
            }
        }
    }

    fn required_choice<T: Copy>(
        &mut self,
        key: &str,
        options: &[T],
        name: fn(T) -> &'static str,
    ) -> Option<T> {
        let raw = self.required_str(key)?;
        self.match_choice(key, &raw, options, name)
    }

    fn optional_choice<T: Copy>(
        &mut self,
        key: &str,
        options: &[T],
        name: fn(T) -> &'static str,
    ) -> Option<T> {
        let raw = self.optional_str(key)?;
        self.match_choice(key, &raw, options, name)
    }

    fn match_choice<T: Copy>(
        &mut self,
        key: &str,
        raw: &str,
        options: &[T],
        name: fn(T) -> &'static str,
    ) -> Option<T> {
        if let Some(found) = options.iter().copied().find(|o| name(*o) == raw) {
            return Some(found);
        }
        let expected = options
            .iter()
            .map(|o| format!("'{}'", name(*o)))
            .collect::<Vec<_>>()
            .join(" | ");
        self.errors.add_field(
            key,
            format!("Invalid enum value. Expected {expected}, received '{raw}'"),
        );
        None
    }
}
