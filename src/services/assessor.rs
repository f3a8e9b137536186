//! Assessment client: question generation and answer evaluation.
//!
//! DESIGN
//! ======
//! The [`Assessor`] trait is the seam between the step controller and the
//! generative-AI backend. [`LlmAssessor`] implements it on top of any
//! [`LlmChat`]: questions come back through the forced `submit_questions`
//! tool (a JSON array in plain text is accepted as fallback), evaluations as
//! plain markdown-like text. No caching, no retry.

use std::fmt::Write;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ErrorCode;

use crate::flow::session::NO_QUESTIONS;
use crate::flow::{Answer, Question, UserData};
use crate::llm::LlmChat;
use crate::llm::tools::{SUBMIT_QUESTIONS, questions_tool};
use crate::llm::types::{Completion, Finish, LlmError, Prompt};

pub const QUESTIONS_FAILED: &str = "Fehler beim Laden der Fragen.";
pub const EVALUATION_FAILED: &str = "Fehler bei der Auswertung.";
pub const RATE_LIMITED: &str = "Zu viele Anfragen. Bitte versuchen Sie es in einer Minute erneut.";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AssessError {
    #[error("LLM not configured")]
    NotConfigured,
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("malformed question payload: {0}")]
    MalformedQuestions(String),
    #[error("no usable questions returned")]
    NoQuestions,
    #[error("empty evaluation returned")]
    EmptyEvaluation,
    #[error("rate limited: {0}")]
    RateLimited(String),
}

impl AssessError {
    /// Message shown to the user. Details stay in the logs; only the empty
    /// and rate-limited cases get their own wording.
    #[must_use]
    pub fn user_message(&self, fallback: &'static str) -> &'static str {
        match self {
            Self::NoQuestions => NO_QUESTIONS,
            Self::RateLimited(_) => RATE_LIMITED,
            _ => fallback,
        }
    }
}

impl ErrorCode for AssessError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::Llm(_) => "E_LLM_ERROR",
            Self::MalformedQuestions(_) => "E_MALFORMED_QUESTIONS",
            Self::NoQuestions => "E_NO_QUESTIONS",
            Self::EmptyEvaluation => "E_EMPTY_EVALUATION",
            Self::RateLimited(_) => "E_RATE_LIMITED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Llm(e) if e.retryable()) || matches!(self, Self::RateLimited(_))
    }
}

impl From<crate::rate_limit::RateLimitError> for AssessError {
    fn from(e: crate::rate_limit::RateLimitError) -> Self {
        Self::RateLimited(e.to_string())
    }
}

/// Remote question generation and answer evaluation.
#[async_trait::async_trait]
pub trait Assessor: Send + Sync {
    /// Generate the questionnaire for the given user.
    ///
    /// # Errors
    ///
    /// Fails when the backend call fails or no usable question comes back.
    async fn generate_questions(&self, user: &UserData) -> Result<Vec<Question>, AssessError>;

    /// Evaluate the completed questionnaire.
    ///
    /// # Errors
    ///
    /// Fails when the backend call fails or returns blank text.
    async fn evaluate_answers(&self, user: &UserData, answers: &[Answer]) -> Result<String, AssessError>;
}

// =============================================================================
// LLM IMPLEMENTATION
// =============================================================================

pub struct LlmAssessor {
    llm: Option<Arc<dyn LlmChat>>,
    question_count: usize,
    max_tokens: u32,
}

impl LlmAssessor {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmChat>>, question_count: usize, max_tokens: u32) -> Self {
        Self { llm, question_count, max_tokens }
    }

    fn llm(&self) -> Result<&Arc<dyn LlmChat>, AssessError> {
        self.llm.as_ref().ok_or(AssessError::NotConfigured)
    }
}

#[async_trait::async_trait]
impl Assessor for LlmAssessor {
    async fn generate_questions(&self, user: &UserData) -> Result<Vec<Question>, AssessError> {
        let llm = self.llm()?;
        let system = questions_system_prompt(self.question_count);
        let profile = format!("Alter: {}\nGeschlecht: {}", user.age(), user.gender());
        let tool = questions_tool();

        let done = llm
            .complete(&Prompt::text(&system, &profile, self.max_tokens).with_tool(&tool))
            .await?;
        log_completion("questions", &done);

        let raw = match done.tool_input {
            Some(input) => parse_question_value(input)?,
            None => parse_question_text(&done.text)?,
        };
        let total = raw.len();
        let questions = sanitize_questions(raw, self.question_count);
        if questions.len() < total {
            warn!(total, kept = questions.len(), "assessor: dropped malformed or surplus questions");
        }
        if questions.is_empty() {
            return Err(AssessError::NoQuestions);
        }
        Ok(questions)
    }

    async fn evaluate_answers(&self, user: &UserData, answers: &[Answer]) -> Result<String, AssessError> {
        let llm = self.llm()?;
        let report = evaluation_user_prompt(user, answers);

        let done = llm
            .complete(&Prompt::text(EVALUATION_SYSTEM_PROMPT, &report, self.max_tokens))
            .await?;
        log_completion("evaluation", &done);

        let text = done.text.trim();
        if text.is_empty() {
            return Err(AssessError::EmptyEvaluation);
        }
        Ok(text.to_owned())
    }
}

fn log_completion(kind: &'static str, done: &Completion) {
    info!(
        kind,
        model = %done.model,
        finish = %done.finish,
        input_tokens = done.input_tokens,
        output_tokens = done.output_tokens,
        "assessor: completion"
    );
    if done.finish == Finish::Truncated {
        warn!(kind, "assessor: completion hit the token limit");
    }
}

// =============================================================================
// PROMPTS
// =============================================================================

const EVALUATION_SYSTEM_PROMPT: &str = "\
Du bist ein erfahrener Allergologe und erstellst eine kurze, verständliche \
Voreinschätzung auf Basis eines Anamnese-Fragebogens. Antworte auf Deutsch.

Formatierung (ausschließlich):
- Überschriften als eigene Zeile in der Form **Überschrift**
- Aufzählungen mit \"* \" am Zeilenanfang
- Absätze als normale Zeilen, Leerzeilen zwischen Abschnitten
Keine anderen Markdown-Elemente, keine Tabellen, keine Links.

Gliederung: **Zusammenfassung**, **Mögliche Auslöser**, **Empfehlungen**. \
Schließe mit dem Hinweis, dass diese Auswertung keine ärztliche Diagnose ersetzt.";

fn questions_system_prompt(count: usize) -> String {
    format!(
        "Du bist ein erfahrener Allergologe. Erstelle genau {count} Multiple-Choice-Fragen \
         für eine Allergie-Anamnese, zugeschnitten auf Alter und Geschlecht der Person. \
         Jede Frage hat 3 bis 5 kurze, eindeutige Antwortmöglichkeiten. Formuliere auf Deutsch \
         und in der Sie-Form. Rufe das Werkzeug {SUBMIT_QUESTIONS} genau einmal mit allen Fragen auf."
    )
}

fn evaluation_user_prompt(user: &UserData, answers: &[Answer]) -> String {
    let mut prompt = format!("Alter: {}\nGeschlecht: {}\n\nAntworten:\n", user.age(), user.gender());
    for (i, answer) in answers.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}\n   Antwort: {}", i + 1, answer.question, answer.answer);
    }
    prompt
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum QuestionPayload {
    Wrapped { questions: Vec<Question> },
    Bare(Vec<Question>),
}

fn parse_question_value(value: serde_json::Value) -> Result<Vec<Question>, AssessError> {
    match serde_json::from_value::<QuestionPayload>(value) {
        Ok(QuestionPayload::Wrapped { questions } | QuestionPayload::Bare(questions)) => Ok(questions),
        Err(e) => Err(AssessError::MalformedQuestions(e.to_string())),
    }
}

/// Parse questions from free text: a JSON array or `{"questions": [...]}`,
/// optionally wrapped in a code fence or surrounded by prose.
fn parse_question_text(text: &str) -> Result<Vec<Question>, AssessError> {
    let start = text.find(['[', '{']);
    let end = text.rfind([']', '}']);
    let (Some(start), Some(end)) = (start, end) else {
        return Err(AssessError::MalformedQuestions("no JSON found in response text".into()));
    };
    if end < start {
        return Err(AssessError::MalformedQuestions("no JSON found in response text".into()));
    }
    let value: serde_json::Value =
        serde_json::from_str(&text[start..=end]).map_err(|e| AssessError::MalformedQuestions(e.to_string()))?;
    parse_question_value(value)
}

/// Trim text, drop malformed questions, cap the batch at `limit`.
fn sanitize_questions(raw: Vec<Question>, limit: usize) -> Vec<Question> {
    raw.into_iter()
        .map(|q| Question {
            question_text: q.question_text.trim().to_owned(),
            options: q.options.iter().map(|o| o.trim().to_owned()).collect(),
        })
        .filter(Question::is_well_formed)
        .take(limit)
        .collect()
}

#[cfg(test)]
#[path = "assessor_test.rs"]
mod tests;
