//! Provider reply shapes and their normalization into response types.
//!
//! Reply shapes are deliberately lenient (list fields default to empty,
//! scores accept any number); normalization then enforces the response
//! invariants: scores in `0..=100`, lists trimmed + deduplicated + capped,
//! required text non-empty.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::fallback::{practice_fallback, translation_fallback};
use crate::schema::types::{
    FeedbackNote, GlossaryEntry, PracticeFeedback, PracticePlan, PracticeScores, ScoreDetail,
    TranslationResponse, VocabularyEntry, VocabularyRequest, VocabularyResponse,
};

pub const MAX_SCORE: u8 = 100;
pub const VOCABULARY_LIST_CAP: usize = 6;
pub const TRANSLATION_ALTERNATIVES_CAP: usize = 3;
pub const TRANSLATION_GLOSSARY_CAP: usize = 4;
pub const PRACTICE_NOTES_CAP: usize = 6;
pub const PRACTICE_NOTE_ITEMS_CAP: usize = 4;
pub const PRACTICE_ISSUES_CAP: usize = 6;
pub const PRONUNCIATION_DRILL_MAX_CHARS: usize = 110;

// ---------------------------------------------------------------------------
// Reply shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeReply {
    pub summary: String,
    pub follow_up_question: String,
    #[serde(default)]
    pub transcript: Option<String>,
    pub scores: ScoresReply,
    #[serde(default)]
    pub notes: Vec<NoteReply>,
    pub practice: PlanReply,
    #[serde(default)]
    pub pronunciation_issues: Vec<String>,
    #[serde(default)]
    pub grammar_issues: Vec<String>,
    pub corrected_response: String,
}

#[derive(Debug, Deserialize)]
pub struct ScoresReply {
    pub grammar: ScoreReply,
    pub pronunciation: ScoreReply,
    pub fluency: ScoreReply,
}

#[derive(Debug, Deserialize)]
pub struct ScoreReply {
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteReply {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReply {
    #[serde(default)]
    pub pronunciation_drill: String,
    #[serde(default)]
    pub speaking_prompt: String,
    #[serde(default)]
    pub encouragement: String,
}

/// Dictionary reply. Accepts both `{"entry":{...},"relatedWords":[...]}` and
/// the flat `{"word":...,"definition":...,"relatedWords":[...]}` form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyReply {
    #[serde(default)]
    pub entry: Option<EntryReply>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub related_words: Vec<String>,
    #[serde(flatten)]
    pub flat: EntryReply,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReply {
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub ipa: Option<String>,
    #[serde(default)]
    pub phonetic_spelling: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_list")]
    pub synonyms: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct TranslationReply {
    pub translation: String,
    pub explanation: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub glossary: Vec<GlossaryReply>,
}

#[derive(Debug, Deserialize)]
pub struct GlossaryReply {
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// List field that tolerates `null` or a non-array value (read as empty).
/// Non-string elements are skipped.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Like [`lenient_list`], but a missing key stays `None`.
fn lenient_optional_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_list(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// Trim, drop empties, deduplicate (first occurrence wins), cap at `cap`.
pub fn clamp_list<I, S>(items: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if out.len() >= cap {
            break;
        }
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

/// Round and clamp a model-provided score into `0..=100`. Non-finite → 0.
pub fn clamp_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

/// Truncate to at most `max` characters, never splitting a char.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn or_default(text: &str, default: &str) -> String {
    non_empty(Some(text)).unwrap_or_else(|| default.to_string())
}

// ---------------------------------------------------------------------------
// Per-operation normalization
// ---------------------------------------------------------------------------

/// Normalize a practice reply. `learner_text` is what the learner said
/// (explicit transcript, else transcribed speech), used when the model
/// omits `transcript`.
pub fn normalize_practice(reply: PracticeReply, learner_text: Option<&str>) -> PracticeFeedback {
    let fb = practice_fallback();
    let score = |r: ScoreReply, fallback: &ScoreDetail| ScoreDetail {
        score: clamp_score(r.score),
        explanation: or_default(&r.explanation, &fallback.explanation),
    };

    let notes = reply
        .notes
        .into_iter()
        .filter_map(|note| {
            let title = non_empty(Some(&note.title))?;
            let items = clamp_list(note.items, PRACTICE_NOTE_ITEMS_CAP);
            (!items.is_empty()).then_some(FeedbackNote { title, items })
        })
        .take(PRACTICE_NOTES_CAP)
        .collect();

    let drill = or_default(
        &reply.practice.pronunciation_drill,
        &fb.practice.pronunciation_drill,
    );

    PracticeFeedback {
        summary: or_default(&reply.summary, &fb.summary),
        follow_up_question: or_default(&reply.follow_up_question, &fb.follow_up_question),
        transcript: non_empty(reply.transcript.as_deref()).or_else(|| non_empty(learner_text)),
        scores: PracticeScores {
            grammar: score(reply.scores.grammar, &fb.scores.grammar),
            pronunciation: score(reply.scores.pronunciation, &fb.scores.pronunciation),
            fluency: score(reply.scores.fluency, &fb.scores.fluency),
        },
        notes,
        practice: PracticePlan {
            pronunciation_drill: truncate_chars(&drill, PRONUNCIATION_DRILL_MAX_CHARS),
            speaking_prompt: or_default(
                &reply.practice.speaking_prompt,
                &fb.practice.speaking_prompt,
            ),
            encouragement: or_default(&reply.practice.encouragement, &fb.practice.encouragement),
        },
        pronunciation_issues: clamp_list(reply.pronunciation_issues, PRACTICE_ISSUES_CAP),
        grammar_issues: clamp_list(reply.grammar_issues, PRACTICE_ISSUES_CAP),
        corrected_response: or_default(&reply.corrected_response, &fb.corrected_response),
    }
}

/// Normalize a dictionary reply. Missing text fields get placeholders that
/// still name the queried word.
pub fn normalize_vocabulary(
    reply: VocabularyReply,
    request: &VocabularyRequest,
) -> VocabularyResponse {
    let VocabularyReply {
        entry,
        related_words,
        flat,
    } = reply;
    let entry = entry.unwrap_or(flat);
    let query = request.word.trim();

    let word = non_empty(entry.word.as_deref()).unwrap_or_else(|| query.to_string());
    let definition = non_empty(entry.definition.as_deref()).unwrap_or_else(|| {
        format!("No definition provided for \"{query}\" due to provider response.")
    });
    let example = non_empty(entry.example.as_deref()).unwrap_or_else(|| {
        format!(
            "Example unavailable for \"{query}\" because the provider returned incomplete data."
        )
    });

    VocabularyResponse {
        entry: VocabularyEntry {
            word,
            ipa: non_empty(entry.ipa.as_deref()),
            phonetic_spelling: non_empty(entry.phonetic_spelling.as_deref()),
            part_of_speech: non_empty(entry.part_of_speech.as_deref()),
            definition,
            example,
            synonyms: entry
                .synonyms
                .map(|s| clamp_list(s, VOCABULARY_LIST_CAP)),
        },
        related_words: clamp_list(related_words, VOCABULARY_LIST_CAP),
    }
}

/// Normalize a translation reply. Empty text fields fall back to the static
/// translation payload; glossary entries need both term and meaning.
pub fn normalize_translation(reply: TranslationReply) -> TranslationResponse {
    let fb = translation_fallback();

    let mut seen_terms = HashSet::new();
    let glossary = reply
        .glossary
        .into_iter()
        .filter_map(|item| {
            let term = non_empty(Some(&item.term))?;
            let meaning = non_empty(Some(&item.meaning))?;
            seen_terms.insert(term.clone()).then_some(GlossaryEntry {
                term,
                meaning,
                note: non_empty(item.note.as_deref()),
            })
        })
        .take(TRANSLATION_GLOSSARY_CAP)
        .collect();

    TranslationResponse {
        translation: or_default(&reply.translation, &fb.translation),
        explanation: or_default(&reply.explanation, &fb.explanation),
        alternatives: clamp_list(reply.alternatives, TRANSLATION_ALTERNATIVES_CAP),
        glossary,
    }
}
