use thiserror::Error;

/// All errors produced by parlance-core.
///
/// None of these are shown to API callers verbatim; the HTTP layer maps any
/// pipeline failure to a generic "temporarily unavailable" response.
#[derive(Debug, Error)]
pub enum ParlanceError {
    #[error("provider request failed: {0}")]
    ProviderHttp(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    ProviderStatus { status: u16, body: String },

    #[error("provider returned an empty reply for {operation}")]
    EmptyReply { operation: &'static str },

    #[error("malformed provider reply for {operation}: {reason}")]
    MalformedReply {
        operation: &'static str,
        reason: String,
    },

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("audio payload is not valid base64: {0}")]
    AudioDecode(#[from] base64::DecodeError),

    #[error("language service temporarily unavailable")]
    ServiceUnavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ParlanceError>;
