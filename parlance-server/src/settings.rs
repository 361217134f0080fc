//! Process settings, read once from the environment at start-up.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use parlance_core::{HandoffConfig, OpenAiConfig, ServiceConfig};
use serde::Serialize;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: IpAddr,
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub allow_mock_data: bool,
    pub fallback_on_error: bool,
    pub log_level: String,
    pub handoff_ttl_secs: u64,
    pub handoff_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            openai_api_key: None,
            openai_base_url: OpenAiConfig::DEFAULT_BASE_URL.into(),
            chat_model: OpenAiConfig::DEFAULT_CHAT_MODEL.into(),
            transcription_model: OpenAiConfig::DEFAULT_TRANSCRIPTION_MODEL.into(),
            allow_mock_data: false,
            fallback_on_error: false,
            log_level: DEFAULT_LOG_LEVEL.into(),
            handoff_ttl_secs: 600,
            handoff_capacity: 256,
        }
    }
}

/// Redacted view of the settings, safe to log or return over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub bind: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub has_openai_api_key: bool,
    pub allow_mock_data: bool,
    pub fallback_on_error: bool,
    pub handoff_ttl_secs: u64,
    pub handoff_capacity: usize,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unparseable values fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let allow_mock_data = lookup("ALLOW_MOCK_DATA")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.allow_mock_data);

        let mut settings = Self {
            host: lookup("HOST")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            openai_api_key: lookup("OPENAI_API_KEY"),
            openai_base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            chat_model: lookup("PARLANCE_CHAT_MODEL").unwrap_or(defaults.chat_model),
            transcription_model: lookup("PARLANCE_TRANSCRIBE_MODEL")
                .unwrap_or(defaults.transcription_model),
            allow_mock_data,
            fallback_on_error: lookup("FALLBACK_ON_ERROR")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(allow_mock_data),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            handoff_ttl_secs: lookup("PARLANCE_HANDOFF_TTL_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.handoff_ttl_secs),
            handoff_capacity: lookup("PARLANCE_HANDOFF_CAPACITY")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.handoff_capacity),
        };
        settings.normalize();
        settings
    }

    pub fn normalize(&mut self) {
        self.openai_api_key = self
            .openai_api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.openai_base_url = normalize_or(&self.openai_base_url, OpenAiConfig::DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        self.chat_model = normalize_or(&self.chat_model, OpenAiConfig::DEFAULT_CHAT_MODEL);
        self.transcription_model = normalize_or(
            &self.transcription_model,
            OpenAiConfig::DEFAULT_TRANSCRIPTION_MODEL,
        );
        self.log_level = normalize_log_level(&self.log_level);
        self.handoff_ttl_secs = self.handoff_ttl_secs.clamp(10, 86_400);
        self.handoff_capacity = self.handoff_capacity.clamp(1, 10_000);
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            mock_mode: self.allow_mock_data,
            fallback_on_error: self.fallback_on_error,
        }
    }

    pub fn handoff_config(&self) -> HandoffConfig {
        HandoffConfig {
            ttl: Duration::from_secs(self.handoff_ttl_secs),
            capacity: self.handoff_capacity,
        }
    }

    /// Provider configuration, or `None` when no credential is set.
    pub fn openai_config(&self) -> Option<OpenAiConfig> {
        self.openai_api_key.as_ref().map(|key| OpenAiConfig {
            api_key: key.clone(),
            base_url: self.openai_base_url.clone(),
            chat_model: self.chat_model.clone(),
            transcription_model: self.transcription_model.clone(),
        })
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            bind: self.bind_addr().to_string(),
            chat_model: self.chat_model.clone(),
            transcription_model: self.transcription_model.clone(),
            has_openai_api_key: self.openai_api_key.is_some(),
            allow_mock_data: self.allow_mock_data,
            fallback_on_error: self.fallback_on_error,
            handoff_ttl_secs: self.handoff_ttl_secs,
            handoff_capacity: self.handoff_capacity,
        }
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn normalize_log_level(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace".into(),
        "debug" => "debug".into(),
        "warn" | "warning" => "warn".into(),
        "error" | "fatal" => "error".into(),
        _ => DEFAULT_LOG_LEVEL.into(),
    }
}

fn normalize_or(raw: &str, default: &str) -> String {
    let normalized = raw.trim();
    if normalized.is_empty() {
        default.into()
    } else {
        normalized.into()
    }
}
