//! `ScriptedModel` — in-process backend that replays queued replies.
//!
//! Used by tests and local demos to drive the full pipeline without network
//! access. Every call is recorded so callers can assert exactly which
//! requests reached the "provider".

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{ParlanceError, Result};
use crate::provider::{ChatRequest, LanguageModel};

#[derive(Default)]
struct Script {
    chat_replies: VecDeque<std::result::Result<String, String>>,
    transcripts: VecDeque<std::result::Result<String, String>>,
    chat_calls: Vec<ChatRequest>,
    transcription_calls: Vec<usize>,
}

/// Scripted provider.
///
/// When the chat queue is empty a call fails with `EmptyReply`; when the
/// transcription queue is empty a call fails with `Transcription`.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<Script>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful chat reply.
    pub fn with_reply(self, raw: impl Into<String>) -> Self {
        self.script.lock().chat_replies.push_back(Ok(raw.into()));
        self
    }

    /// Queue a failed chat call.
    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        self.script.lock().chat_replies.push_back(Err(reason.into()));
        self
    }

    /// Queue a transcription result.
    pub fn with_transcript(self, text: impl Into<String>) -> Self {
        self.script.lock().transcripts.push_back(Ok(text.into()));
        self
    }

    /// Queue a failed transcription.
    pub fn with_transcription_failure(self, reason: impl Into<String>) -> Self {
        self.script.lock().transcripts.push_back(Err(reason.into()));
        self
    }

    /// Chat requests received so far, in order.
    pub fn chat_calls(&self) -> Vec<ChatRequest> {
        self.script.lock().chat_calls.clone()
    }

    /// Byte length of each transcription request received so far.
    pub fn transcription_calls(&self) -> Vec<usize> {
        self.script.lock().transcription_calls.clone()
    }

    /// Total calls of either kind.
    pub fn call_count(&self) -> usize {
        let script = self.script.lock();
        script.chat_calls.len() + script.transcription_calls.len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete_json(&self, request: &ChatRequest) -> Result<String> {
        let mut script = self.script.lock();
        script.chat_calls.push(request.clone());
        debug!(operation = request.operation, "ScriptedModel::complete_json");
        match script.chat_replies.pop_front() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(reason)) => Err(ParlanceError::Other(anyhow::anyhow!(reason))),
            None => Err(ParlanceError::EmptyReply {
                operation: request.operation,
            }),
        }
    }

    async fn transcribe(&self, audio: Vec<u8>, _file_name: &str) -> Result<String> {
        let mut script = self.script.lock();
        script.transcription_calls.push(audio.len());
        match script.transcripts.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ParlanceError::Transcription(reason)),
            None => Err(ParlanceError::Transcription("no scripted transcript".into())),
        }
    }
}
