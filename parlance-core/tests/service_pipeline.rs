use std::sync::Arc;

use parlance_core::engine::normalize::{
    PRACTICE_ISSUES_CAP, PRONUNCIATION_DRILL_MAX_CHARS, TRANSLATION_ALTERNATIVES_CAP,
    TRANSLATION_GLOSSARY_CAP, VOCABULARY_LIST_CAP,
};
use parlance_core::fallback::{practice_fallback, translation_fallback, vocabulary_fallback};
use parlance_core::schema::{
    PracticeRequest, Proficiency, SpeakingFocus, TranslationRequest, TranslationTone,
    VocabularyRequest,
};
use parlance_core::{
    HandoffConfig, LanguageService, MemoryHandoffStore, ParlanceError, ProviderHandle,
    ResponseSource, ScriptedModel, ServiceConfig,
};

const LIVE: ServiceConfig = ServiceConfig {
    mock_mode: false,
    fallback_on_error: false,
};

const LIVE_WITH_FALLBACK: ServiceConfig = ServiceConfig {
    mock_mode: false,
    fallback_on_error: true,
};

// "hello world, speak!" as base64
const SAMPLE_AUDIO: &str = "aGVsbG8gd29ybGQsIHNwZWFrIQ==";

fn service(config: ServiceConfig, model: &Arc<ScriptedModel>) -> LanguageService {
    LanguageService::new(
        config,
        Some(ProviderHandle(model.clone())),
        MemoryHandoffStore::shared(HandoffConfig::default()),
    )
}

fn practice_request() -> PracticeRequest {
    PracticeRequest {
        language: "English".into(),
        native_language: "Chinese".into(),
        proficiency: Proficiency::Intermediate,
        focus: SpeakingFocus::Fluency,
        prompt: Some("Describe your weekend".into()),
        audio_base64: None,
        audio_id: None,
        transcript: None,
    }
}

fn practice_reply() -> String {
    serde_json::json!({
        "summary": "Solid attempt.",
        "followUpQuestion": "What did you eat?",
        "scores": {
            "grammar": {"score": 72.6, "explanation": "Tense slips."},
            "pronunciation": {"score": 140, "explanation": "Clear."},
            "fluency": {"score": -5, "explanation": "Choppy."}
        },
        "notes": [{"title": "Grammar", "items": ["Use 'am going to'."]}],
        "practice": {
            "pronunciationDrill": "x".repeat(300),
            "speakingPrompt": "Tell me more.",
            "encouragement": "Nice!"
        },
        "pronunciationIssues": ["a", "b", "c", "d", "e", "f", "g", "h"],
        "grammarIssues": ["I will going", "I will going"],
        "correctedResponse": "I am going to the gallery."
    })
    .to_string()
}

#[tokio::test]
async fn mock_mode_serves_fallback_without_calling_provider() {
    let model = Arc::new(ScriptedModel::new().with_reply(practice_reply()));
    let svc = service(
        ServiceConfig {
            mock_mode: true,
            fallback_on_error: false,
        },
        &model,
    );

    let first = svc.practice(&practice_request()).await.expect("mock");
    let second = svc.practice(&practice_request()).await.expect("mock");

    assert_eq!(first.source, ResponseSource::Mock);
    assert_eq!(&first.value, practice_fallback());
    assert_eq!(
        serde_json::to_string(&first.value).expect("serialize"),
        serde_json::to_string(&second.value).expect("serialize")
    );
    assert_eq!(model.call_count(), 0);
    assert_eq!(svc.diagnostics_snapshot().mock_served, 2);
}

#[tokio::test]
async fn missing_provider_serves_fallback() {
    let svc = LanguageService::new(
        ServiceConfig::default(),
        None,
        MemoryHandoffStore::shared(HandoffConfig::default()),
    );
    let request = TranslationRequest {
        text: "谢谢".into(),
        scene: None,
        tone: None,
    };

    let served = svc.translate(&request).await.expect("mock");
    assert_eq!(served.source, ResponseSource::Mock);
    assert_eq!(&served.value, translation_fallback());
    assert!(!svc.is_live());
}

#[tokio::test]
async fn translation_is_prompted_with_scene_and_tone() {
    let reply = serde_json::json!({
        "translation": "Thank you so much for your help. When works for you?",
        "explanation": "Casual register.",
        "alternatives": ["Thanks a ton!", "Thanks a ton!", "Appreciate it.", "Cheers.", "Ta."],
        "glossary": [
            {"term": "帮助", "meaning": "help"},
            {"term": "帮助", "meaning": "duplicate"},
            {"term": "", "meaning": "no term"},
            {"term": "见面", "meaning": "meet", "note": "  "}
        ]
    });
    let model = Arc::new(ScriptedModel::new().with_reply(reply.to_string()));
    let svc = service(LIVE, &model);
    let request = TranslationRequest {
        text: "谢谢你的帮助，我们什么时候见面？".into(),
        scene: Some("Chatting with a colleague".into()),
        tone: Some(TranslationTone::Friendly),
    };

    let served = svc.translate(&request).await.expect("live");
    assert_eq!(served.source, ResponseSource::Live);

    let calls = model.chat_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].user.contains("谢谢你的帮助，我们什么时候见面？"));
    assert!(calls[0].user.contains("Scene: Chatting with a colleague"));
    assert!(calls[0].user.contains("Desired tone: friendly"));

    let value = served.value;
    assert!(!value.translation.is_empty());
    assert_eq!(
        value.alternatives,
        vec!["Thanks a ton!", "Appreciate it.", "Cheers."]
    );
    assert!(value.alternatives.len() <= TRANSLATION_ALTERNATIVES_CAP);
    assert!(value.glossary.len() <= TRANSLATION_GLOSSARY_CAP);
    let terms: Vec<&str> = value.glossary.iter().map(|g| g.term.as_str()).collect();
    assert_eq!(terms, vec!["帮助", "见面"]);
    assert_eq!(value.glossary[1].note, None);
}

#[tokio::test]
async fn vocabulary_fills_missing_fields_and_caps_lists() {
    let reply = serde_json::json!({
        "entry": {
            "word": "resilient",
            "ipa": "/rɪˈzɪliənt/",
            "definition": "Able to recover quickly.",
            "synonyms": ["tough", "hardy", "tough", "strong", "buoyant", "durable", "flexible", "sturdy"]
        },
        "relatedWords": ["resilience", "resiliently"]
    });
    let model = Arc::new(ScriptedModel::new().with_reply(format!("```json\n{reply}\n```")));
    let svc = service(LIVE, &model);
    let request = VocabularyRequest {
        language: "en".into(),
        word: "resilient".into(),
    };

    let served = svc.vocabulary(&request).await.expect("live");
    let entry = served.value.entry;
    assert_eq!(entry.word, "resilient");
    assert_eq!(entry.ipa.as_deref(), Some("/rɪˈzɪliənt/"));
    assert_eq!(entry.definition, "Able to recover quickly.");
    assert!(entry.example.contains("\"resilient\""));
    let synonyms = entry.synonyms.expect("synonyms present");
    assert_eq!(synonyms.len(), VOCABULARY_LIST_CAP);
    assert_eq!(synonyms[0], "tough");
    assert_eq!(synonyms[1], "hardy");
    assert_eq!(served.value.related_words, vec!["resilience", "resiliently"]);
}

#[tokio::test]
async fn practice_reply_is_bounded() {
    let model = Arc::new(ScriptedModel::new().with_reply(practice_reply()));
    let svc = service(LIVE, &model);

    let served = svc.practice(&practice_request()).await.expect("live");
    let value = served.value;
    assert_eq!(served.source, ResponseSource::Live);
    assert_eq!(value.scores.grammar.score, 73);
    assert_eq!(value.scores.pronunciation.score, 100);
    assert_eq!(value.scores.fluency.score, 0);
    assert_eq!(
        value.practice.pronunciation_drill.chars().count(),
        PRONUNCIATION_DRILL_MAX_CHARS
    );
    assert_eq!(value.pronunciation_issues.len(), PRACTICE_ISSUES_CAP);
    assert_eq!(value.grammar_issues, vec!["I will going"]);
    assert_eq!(value.transcript, None);
    // No audio supplied, so nothing is transcribed.
    assert!(model.transcription_calls().is_empty());
}

#[tokio::test]
async fn transcription_failure_is_not_fatal() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_transcription_failure("upstream 500")
            .with_reply(practice_reply()),
    );
    let svc = service(LIVE, &model);
    let mut request = practice_request();
    request.audio_base64 = Some(format!("data:audio/webm;base64,{SAMPLE_AUDIO}"));

    let served = svc.practice(&request).await.expect("live");
    assert_eq!(served.source, ResponseSource::Live);
    assert_eq!(model.transcription_calls(), vec![19]);
    assert_eq!(model.chat_calls().len(), 1);
    assert!(!model.chat_calls()[0].user.contains("Transcribed speech:"));
    assert_eq!(svc.diagnostics_snapshot().transcription_failures, 1);
}

#[tokio::test]
async fn transcript_reaches_prompt_and_response() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_transcript("I will going to gallery")
            .with_reply(practice_reply()),
    );
    let svc = service(LIVE, &model);
    let mut request = practice_request();
    request.prompt = None;
    request.audio_base64 = Some(SAMPLE_AUDIO.into());

    let served = svc.practice(&request).await.expect("live");
    assert!(model.chat_calls()[0]
        .user
        .contains("Transcribed speech:\nI will going to gallery"));
    assert_eq!(
        served.value.transcript.as_deref(),
        Some("I will going to gallery")
    );
}

#[tokio::test]
async fn uploaded_audio_is_consumed_once() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_transcript("first take")
            .with_reply(practice_reply())
            .with_reply(practice_reply()),
    );
    let svc = service(LIVE, &model);
    let id = svc.store_audio(SAMPLE_AUDIO);
    assert_eq!(svc.pending_audio(), 1);

    let mut request = practice_request();
    request.audio_id = Some(id);

    svc.practice(&request).await.expect("first");
    assert_eq!(svc.pending_audio(), 0);
    assert_eq!(model.transcription_calls().len(), 1);

    // Same id again: nothing left to transcribe, text-only evaluation.
    svc.practice(&request).await.expect("second");
    assert_eq!(model.transcription_calls().len(), 1);
    assert_eq!(model.chat_calls().len(), 2);

    let stats = svc.diagnostics_snapshot();
    assert_eq!(stats.handoff_stored, 1);
    assert_eq!(stats.handoff_consumed, 1);
}

#[tokio::test]
async fn provider_failure_without_fallback_is_unavailable() {
    let model = Arc::new(ScriptedModel::new().with_failure("connection reset"));
    let svc = service(LIVE, &model);
    let request = VocabularyRequest {
        language: "en".into(),
        word: "resilient".into(),
    };

    let err = svc.vocabulary(&request).await.expect_err("should fail");
    assert!(matches!(err, ParlanceError::ServiceUnavailable));
    assert_eq!(svc.diagnostics_snapshot().provider_errors, 1);
}

#[tokio::test]
async fn provider_failure_with_fallback_serves_fallback() {
    let model = Arc::new(ScriptedModel::new().with_failure("timeout"));
    let svc = service(LIVE_WITH_FALLBACK, &model);
    let request = VocabularyRequest {
        language: "en".into(),
        word: "resilient".into(),
    };

    let served = svc.vocabulary(&request).await.expect("fallback");
    assert_eq!(served.source, ResponseSource::Fallback);
    assert_eq!(served.value, vocabulary_fallback("resilient", "en"));
    assert_eq!(svc.diagnostics_snapshot().fallback_served, 1);
}

#[tokio::test]
async fn unparseable_reply_is_a_failure() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_reply("Sure! Here is your translation: Thanks.")
            .with_reply(r#"{"translation": 42}"#),
    );
    let request = TranslationRequest {
        text: "谢谢".into(),
        scene: None,
        tone: None,
    };

    let strict = service(LIVE, &model);
    assert!(matches!(
        strict.translate(&request).await,
        Err(ParlanceError::ServiceUnavailable)
    ));

    let lenient = service(LIVE_WITH_FALLBACK, &model);
    let served = lenient.translate(&request).await.expect("fallback");
    assert_eq!(served.source, ResponseSource::Fallback);
    assert_eq!(&served.value, translation_fallback());
}

#[tokio::test]
async fn mock_mode_skips_provider_for_every_operation() {
    let model = Arc::new(
        ScriptedModel::new()
            .with_reply(practice_reply())
            .with_transcript("unused"),
    );
    let svc = service(
        ServiceConfig {
            mock_mode: true,
            fallback_on_error: false,
        },
        &model,
    );
    let mut practice = practice_request();
    practice.audio_base64 = Some(SAMPLE_AUDIO.into());
    let vocabulary = VocabularyRequest {
        language: "en".into(),
        word: "resilient".into(),
    };
    let translation = TranslationRequest {
        text: "谢谢你的帮助，我们什么时候见面？".into(),
        scene: None,
        tone: None,
    };

    let served = svc.practice(&practice).await.expect("practice");
    assert_eq!(served.source, ResponseSource::Mock);
    assert_eq!(&served.value, practice_fallback());

    let served = svc.vocabulary(&vocabulary).await.expect("vocabulary");
    assert_eq!(served.source, ResponseSource::Mock);
    assert_eq!(served.value, vocabulary_fallback("resilient", "en"));

    let served = svc.translate(&translation).await.expect("translation");
    assert_eq!(served.source, ResponseSource::Mock);
    assert_eq!(&served.value, translation_fallback());

    assert_eq!(model.call_count(), 0);
    assert_eq!(svc.diagnostics_snapshot().mock_served, 3);
    assert_eq!(svc.diagnostics_snapshot().provider_calls, 0);
}

#[tokio::test]
async fn vocabulary_with_null_lists_stays_live() {
    let reply = serde_json::json!({
        "word": "resilient",
        "definition": "able to recover",
        "example": "Kids are resilient.",
        "synonyms": null,
        "relatedWords": null
    });
    let model = Arc::new(ScriptedModel::new().with_reply(reply.to_string()));
    let svc = service(LIVE_WITH_FALLBACK, &model);
    let request = VocabularyRequest {
        language: "en".into(),
        word: "resilient".into(),
    };

    let served = svc.vocabulary(&request).await.expect("live");
    assert_eq!(served.source, ResponseSource::Live);
    assert_eq!(served.value.entry.definition, "able to recover");
    assert_eq!(served.value.entry.example, "Kids are resilient.");
    assert_eq!(served.value.entry.synonyms, Some(Vec::new()));
    assert!(served.value.related_words.is_empty());
    assert_eq!(svc.diagnostics_snapshot().fallback_served, 0);
}
