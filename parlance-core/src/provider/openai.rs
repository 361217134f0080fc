//! OpenAI-compatible HTTP backend via `reqwest`.
//!
//! - `POST {base_url}/chat/completions` with `response_format: json_object`
//! - `POST {base_url}/audio/transcriptions` as multipart (`model`, `file`)
//!
//! No request timeout is configured: callers that need a deadline layer it on
//! at the transport boundary.

use async_trait::async_trait;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{ParlanceError, Result};
use crate::provider::{ChatRequest, LanguageModel};

/// Longest provider error body kept for logging.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Default: `gpt-4o-mini`.
    pub chat_model: String,
    /// Default: `gpt-4o-mini-transcribe`.
    pub transcription_model: String,
}

impl OpenAiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_CHAT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_TRANSCRIPTION_MODEL: &'static str = "gpt-4o-mini-transcribe";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            chat_model: Self::DEFAULT_CHAT_MODEL.into(),
            transcription_model: Self::DEFAULT_TRANSCRIPTION_MODEL.into(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("transcription_model", &self.transcription_model)
            .finish()
    }
}

pub struct OpenAiModel {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiModel {
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > ERROR_BODY_LIMIT {
            let cut = (0..=ERROR_BODY_LIMIT)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        warn!(status = %status, "provider request returned non-success status");
        Err(ParlanceError::ProviderStatus {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionReply {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_json(&self, request: &ChatRequest) -> Result<String> {
        let body = json!({
            "model": self.config.chat_model,
            "temperature": request.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.user },
            ],
        });

        debug!(
            operation = request.operation,
            model = %self.config.chat_model,
            "sending chat completion"
        );
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletion = Self::check_status(response).await?.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(ParlanceError::EmptyReply {
                operation: request.operation,
            })
    }

    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String> {
        let file_part = multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/webm")?;
        let form = multipart::Form::new()
            .text("model", self.config.transcription_model.clone())
            .text("response_format", "json")
            .text("temperature", "0")
            .part("file", file_part);

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;
        let reply: TranscriptionReply = Self::check_status(response).await?.json().await?;
        Ok(reply.text.trim().to_string())
    }
}
