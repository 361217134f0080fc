//! Static fallback payloads.
//!
//! Served when the provider is skipped (mock mode, no credential) or when a
//! live call fails and fallback is enabled. The practice and translation
//! payloads are built once and shared for the process lifetime; the
//! vocabulary payload names the queried word so the reply stays
//! self-describing.

use std::sync::OnceLock;

use crate::schema::types::{
    FeedbackNote, GlossaryEntry, PracticeFeedback, PracticePlan, PracticeScores, ScoreDetail,
    TranslationResponse, VocabularyEntry, VocabularyResponse,
};

static PRACTICE_FALLBACK: OnceLock<PracticeFeedback> = OnceLock::new();
static TRANSLATION_FALLBACK: OnceLock<TranslationResponse> = OnceLock::new();

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Canned speaking-practice feedback.
pub fn practice_fallback() -> &'static PracticeFeedback {
    PRACTICE_FALLBACK.get_or_init(|| PracticeFeedback {
        summary: "Great job on your greeting! Your enthusiasm really shines through.".into(),
        follow_up_question:
            "If you met a new teammate today, what would you ask to keep the chat flowing?".into(),
        transcript: Some(
            "Hi there, I will going to the new gallery with my friend this weekend.".into(),
        ),
        scores: PracticeScores {
            grammar: ScoreDetail {
                score: 95,
                explanation: "Grammar is strong overall; only minor tense slips appear when you describe future plans.".into(),
            },
            pronunciation: ScoreDetail {
                score: 85,
                explanation: "Clear articulation, though the ending consonants in words like \"meet\" could be sharper.".into(),
            },
            fluency: ScoreDetail {
                score: 90,
                explanation: "Smooth pacing with natural pauses, but you can add more detail to extend turns.".into(),
            },
        },
        notes: vec![
            FeedbackNote {
                title: "Pronunciation".into(),
                items: strings(&[
                    "Work on sharper \"t\" sounds in \"meet\" and \"night\".",
                    "Emphasize the \"h\" sound in \"hello\" so it does not disappear.",
                ]),
            },
            FeedbackNote {
                title: "Fluency".into(),
                items: strings(&[
                    "Try adding a follow-up question after your greeting to keep the dialogue active.",
                    "Mix short and longer sentences to create a more dynamic rhythm.",
                ]),
            },
        ],
        practice: PracticePlan {
            pronunciation_drill:
                "Repeat \"Hello, nice to meet you\" three times, focusing on crisp consonants."
                    .into(),
            speaking_prompt: "Tell me about a recent conversation that made you smile.".into(),
            encouragement: "Keep up the great work! I cannot wait to hear your next recording."
                .into(),
        },
        pronunciation_issues: strings(&[
            "“gallery” 中的 /ˈɡæl/ 重音需要更明显，结尾 /ri/ 轻读。",
            "句末 “friend” 的 /d/ 没有落地，建议着重收音。",
        ]),
        grammar_issues: strings(&[
            "将 “I will going” 改成 “I am going to” 描述计划更自然。",
            "使用 “a few different dishes” 而不是 “a different foods”。",
        ]),
        corrected_response: "I am going to the new gallery with my friend this weekend and we plan to try a few different dishes afterward.".into(),
    })
}

/// Canned scene-aware translation.
pub fn translation_fallback() -> &'static TranslationResponse {
    TRANSLATION_FALLBACK.get_or_init(|| TranslationResponse {
        translation: "I really appreciate your help. Which day works best for you to meet?".into(),
        explanation:
            "Provides a polite, natural English tone suitable for most daily conversations.".into(),
        alternatives: strings(&[
            "Thanks so much for your help. When would be a good time for us to meet?",
        ]),
        glossary: vec![GlossaryEntry {
            term: "appreciate your help".into(),
            meaning: "表达感谢的地道说法".into(),
            note: Some("比直接说 \"thank you\" 更真诚、更正式。".into()),
        }],
    })
}

/// Placeholder dictionary entry for `word`.
pub fn vocabulary_fallback(word: &str, language: &str) -> VocabularyResponse {
    VocabularyResponse {
        entry: VocabularyEntry {
            word: word.to_string(),
            ipa: None,
            phonetic_spelling: None,
            part_of_speech: None,
            definition: format!(
                "The language service is unavailable, so this is a placeholder {language} definition for \"{word}\". Please try again later."
            ),
            example: format!(
                "Fallback response for \"{word}\" when the AI provider is unavailable."
            ),
            synonyms: Some(Vec::new()),
        },
        related_words: Vec::new(),
    }
}
