//! Structured-reply parsing.
//!
//! Provider replies are expected to be one JSON object, sometimes wrapped in
//! Markdown code fences. Parsing is split in two so failures can be told
//! apart in logs: text that is not JSON at all (`ParseError`) versus JSON that
//! does not match the operation's shape (`ValidationError`).

use serde::de::DeserializeOwned;

use crate::error::ParlanceError;

/// Outcome of parsing one provider reply.
#[derive(Debug)]
pub enum ParseOutcome<T> {
    Parsed(T),
    ParseError(String),
    ValidationError(String),
}

impl<T> ParseOutcome<T> {
    /// Collapse into a `Result`, labelling failures with `operation`.
    pub fn into_result(self, operation: &'static str) -> Result<T, ParlanceError> {
        match self {
            Self::Parsed(value) => Ok(value),
            Self::ParseError(reason) => Err(ParlanceError::MalformedReply {
                operation,
                reason: format!("invalid JSON: {reason}"),
            }),
            Self::ValidationError(reason) => Err(ParlanceError::MalformedReply {
                operation,
                reason: format!("unexpected shape: {reason}"),
            }),
        }
    }
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) up to the first newline or brace.
    let body_start = rest
        .find(|c: char| c == '\n' || c == '{' || c == '[')
        .unwrap_or(rest.len());
    let info = rest[..body_start].trim();
    let rest = if info.is_empty() || info.chars().all(|c| c.is_ascii_alphanumeric()) {
        &rest[body_start..]
    } else {
        rest
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Parse `raw` into `T`.
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> ParseOutcome<T> {
    let body = strip_code_fence(raw);
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return ParseOutcome::ParseError(e.to_string()),
    };
    if !value.is_object() {
        return ParseOutcome::ValidationError("expected a JSON object".into());
    }
    match serde_json::from_value(value) {
        Ok(parsed) => ParseOutcome::Parsed(parsed),
        Err(e) => ParseOutcome::ValidationError(e.to_string()),
    }
}
