//! Instruction text sent to the provider.
//!
//! Rendering is deterministic: the same validated request always produces
//! byte-identical prompts.

use crate::provider::ChatRequest;
use crate::schema::types::{PracticeRequest, TranslationTone};

pub const PRACTICE_TEMPERATURE: f32 = 0.2;
pub const VOCABULARY_TEMPERATURE: f32 = 0.2;
pub const TRANSLATION_TEMPERATURE: f32 = 0.3;

/// Scene used when the caller gives none.
pub const DEFAULT_SCENE: &str = "General conversation";

const PRACTICE_SCHEMA: &str = r#"{"summary":string,"followUpQuestion":string,"transcript":string,"scores":{"grammar":{"score":number,"explanation":string},"pronunciation":{"score":number,"explanation":string},"fluency":{"score":number,"explanation":string}},"notes":[{"title":string,"items":string[]}],"practice":{"pronunciationDrill":string,"speakingPrompt":string,"encouragement":string},"pronunciationIssues":string[],"grammarIssues":string[],"correctedResponse":string}"#;

const VOCABULARY_SCHEMA: &str = r#"{"entry":{"word":string,"ipa":string,"phoneticSpelling":string,"partOfSpeech":string,"definition":string,"example":string,"synonyms":string[]},"relatedWords":string[]}"#;

const TRANSLATION_SCHEMA: &str = r#"{"translation":string,"explanation":string,"alternatives":string[],"glossary":[{"term":string,"meaning":string,"note":string}]}"#;

/// Build the practice-evaluation request from the validated input plus any
/// text recovered from audio.
pub fn practice(request: &PracticeRequest, spoken_text: Option<&str>) -> ChatRequest {
    let submission = learner_submission(request, spoken_text)
        .unwrap_or_else(|| "Learner provided no content.".to_string());

    let user = format!(
        "Target language: {language}\n\
         Native language: {native}\n\
         Proficiency: {proficiency}\n\
         Primary focus: {focus}\n\
         Learner submission (text + speech transcription):\n\
         {submission}\n\
         \n\
         Tasks:\n\
         1. Point out the main pronunciation issues in the learner's speech or text; explain each in {native} and give the spelling/IPA.\n\
         2. Point out grammar issues; explain each in {native} and give a better sentence fragment.\n\
         3. Write a correctedResponse: a natural sentence in {language}.\n\
         4. Ask one follow-up question to continue the conversation.\n\
         \n\
         Constraints:\n\
         - scores must be integers between 0 and 100\n\
         - every notes entry needs 1 to 4 actionable items\n\
         - pronunciationDrill is an imperative exercise of at most 110 characters\n\
         - speakingPrompt is an open-ended question that nudges the next turn\n\
         \n\
         Respond ONLY with minified JSON exactly matching this schema:\n\
         {PRACTICE_SCHEMA}",
        language = request.language,
        native = request.native_language,
        proficiency = request.proficiency,
        focus = request.focus,
    );

    ChatRequest {
        operation: "practice",
        system: "You are an encouraging bilingual language coach. Provide concise actionable feedback and obey the response schema.".into(),
        user,
        temperature: PRACTICE_TEMPERATURE,
    }
}

/// Join typed and transcribed learner input. `None` when both are blank.
pub fn learner_submission(request: &PracticeRequest, spoken_text: Option<&str>) -> Option<String> {
    let typed = request
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let transcript = request
        .transcript
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| spoken_text.map(str::trim).filter(|t| !t.is_empty()));

    let blocks: Vec<String> = [
        typed.map(|t| format!("Typed/context input:\n{t}")),
        transcript.map(|t| format!("Transcribed speech:\n{t}")),
    ]
    .into_iter()
    .flatten()
    .collect();

    (!blocks.is_empty()).then(|| blocks.join("\n---\n"))
}

pub fn vocabulary(word: &str, language: &str) -> ChatRequest {
    let target = if language.trim().is_empty() {
        "Chinese"
    } else {
        language.trim()
    };
    ChatRequest {
        operation: "vocabulary",
        system: format!(
            "You are a precise bilingual dictionary. Respond ONLY with minified JSON: {VOCABULARY_SCHEMA}. \
             Definitions must be concise and aligned with the requested target language. \
             Provide at least one synonym when possible and ensure example sentences are natural."
        ),
        user: format!(
            "word: {word}\ntargetLanguage: {target}\nInclude IPA, concise definition and example sentence."
        ),
        temperature: VOCABULARY_TEMPERATURE,
    }
}

pub fn translation(text: &str, scene: Option<&str>, tone: Option<TranslationTone>) -> ChatRequest {
    let scene = scene
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SCENE);
    let tone = tone.unwrap_or_default();
    ChatRequest {
        operation: "translation",
        system: format!(
            "You are a bilingual localization specialist. Given Chinese input, provide an idiomatic English rendering \
             tailored to the described scene and tone. Keep explanations concise yet actionable and mention cultural \
             nuances when relevant. Return ONLY JSON matching {TRANSLATION_SCHEMA}."
        ),
        user: format!("Chinese input: {text}\nScene: {scene}\nDesired tone: {tone}"),
        temperature: TRANSLATION_TEMPERATURE,
    }
}
