//! Session record and its transition function.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::model::{Answer, FlowVariant, Question, UserData};

pub const NO_QUESTIONS: &str = "Keine Fragen vom Server erhalten. Versuchen Sie es bitte erneut.";
pub const MISSING_USER_DATA: &str = "Benutzerdaten fehlen für die Auswertung.";
pub const MISSING_EVALUATION_DATA: &str = "Benutzerdaten oder Antworten fehlen für die Auswertung.";
pub const EMPTY_EVALUATION: &str = "Fehler bei der Auswertung.";
pub const UNKNOWN_ERROR: &str = "Ein unbekannter Fehler ist aufgetreten.";

// =============================================================================
// STEP
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Welcome,
    Questionnaire,
    Email,
    Evaluating,
    Results,
    Error,
}

impl Step {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Questionnaire => "questionnaire",
            Self::Email => "email",
            Self::Evaluating => "evaluating",
            Self::Results => "results",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote work a session in [`Step::Evaluating`] is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pending {
    Questions,
    Evaluation,
}

// =============================================================================
// EVENTS & ERRORS
// =============================================================================

/// Inputs to the state machine. Completion events carry the epoch they were
/// started in so results that arrive after a restart are dropped.
#[derive(Debug, Clone)]
pub enum Event {
    Start(UserData),
    QuestionsLoaded { epoch: u64, questions: Vec<Question> },
    QuestionsFailed { epoch: u64, message: String },
    Answer(String),
    CompleteQuestionnaire(Vec<Answer>),
    SubmitEmail(String),
    EvaluationReady { epoch: u64, evaluation: String },
    EvaluationFailed { epoch: u64, message: String },
    Restart,
}

impl Event {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::QuestionsLoaded { .. } => "questions_loaded",
            Self::QuestionsFailed { .. } => "questions_failed",
            Self::Answer(_) => "answer",
            Self::CompleteQuestionnaire(_) => "complete_questionnaire",
            Self::SubmitEmail(_) => "submit_email",
            Self::EvaluationReady { .. } => "evaluation_ready",
            Self::EvaluationFailed { .. } => "evaluation_failed",
            Self::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("{event} is not allowed in step {step}")]
    InvalidTransition { event: &'static str, step: Step },
    #[error("option {0:?} is not offered for the current question")]
    UnknownOption(String),
    #[error("answers do not match the presented questions")]
    AnswerMismatch,
    #[error("result from epoch {got} arrived after restart (now {current})")]
    Stale { got: u64, current: u64 },
}

impl crate::error::ErrorCode for FlowError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "E_INVALID_TRANSITION",
            Self::UnknownOption(_) => "E_UNKNOWN_OPTION",
            Self::AnswerMismatch => "E_ANSWER_MISMATCH",
            Self::Stale { .. } => "E_STALE_RESULT",
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// All state for one user's pass through the questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: Uuid,
    variant: FlowVariant,
    step: Step,
    user_data: Option<UserData>,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    email: Option<String>,
    evaluation: Option<String>,
    error: Option<String>,
    epoch: u64,
}

impl Session {
    #[must_use]
    pub fn new(id: Uuid, variant: FlowVariant) -> Self {
        Self {
            id,
            variant,
            step: Step::Welcome,
            user_data: None,
            questions: Vec::new(),
            answers: Vec::new(),
            email: None,
            evaluation: None,
            error: None,
            epoch: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn variant(&self) -> FlowVariant {
        self.variant
    }

    #[must_use]
    pub fn step(&self) -> Step {
        self.step
    }

    #[must_use]
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn evaluation(&self) -> Option<&str> {
        self.evaluation.as_deref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Question currently presented, if the session is in the questionnaire.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.step == Step::Questionnaire {
            self.questions.get(self.answers.len())
        } else {
            None
        }
    }

    /// What an evaluating session is waiting for. Question generation is the
    /// only remote call made before any questions exist.
    #[must_use]
    pub fn pending(&self) -> Option<Pending> {
        match self.step {
            Step::Evaluating if self.questions.is_empty() => Some(Pending::Questions),
            Step::Evaluating => Some(Pending::Evaluation),
            _ => None,
        }
    }

    /// Apply one event and return the resulting session.
    ///
    /// # Errors
    ///
    /// Returns a [`FlowError`] when the event is not valid for the current
    /// step or carries data inconsistent with the session. `self` is never
    /// modified.
    pub fn apply(&self, event: Event) -> Result<Self, FlowError> {
        let name = event.name();
        match event {
            Event::Restart => Ok(self.restarted()),

            Event::Start(user_data) => {
                self.expect_step(Step::Welcome, name)?;
                let mut next = self.clone();
                next.user_data = Some(user_data);
                next.error = None;
                next.step = Step::Evaluating;
                Ok(next)
            }

            Event::QuestionsLoaded { epoch, questions } => {
                self.expect_pending(Pending::Questions, epoch, name)?;
                if questions.is_empty() {
                    return Ok(self.failed(NO_QUESTIONS));
                }
                let mut next = self.clone();
                next.questions = questions;
                next.step = Step::Questionnaire;
                Ok(next)
            }

            Event::QuestionsFailed { epoch, message } => {
                self.expect_pending(Pending::Questions, epoch, name)?;
                Ok(self.failed(&message))
            }

            Event::Answer(option) => {
                self.expect_step(Step::Questionnaire, name)?;
                let Some(question) = self.current_question() else {
                    return Err(FlowError::InvalidTransition { event: name, step: self.step });
                };
                if !question.offers(&option) {
                    return Err(FlowError::UnknownOption(option));
                }
                let mut next = self.clone();
                next.answers.push(Answer { question: question.question_text.clone(), answer: option });
                if next.answers.len() == next.questions.len() {
                    return Ok(next.questionnaire_completed());
                }
                Ok(next)
            }

            Event::CompleteQuestionnaire(answers) => {
                self.expect_step(Step::Questionnaire, name)?;
                // Answers already given one by one are fixed; the list may only extend them.
                let matches = answers.len() == self.questions.len()
                    && answers.starts_with(&self.answers)
                    && answers
                        .iter()
                        .zip(&self.questions)
                        .all(|(a, q)| a.question == q.question_text && q.offers(&a.answer));
                if !matches {
                    return Err(FlowError::AnswerMismatch);
                }
                let mut next = self.clone();
                next.answers = answers;
                Ok(next.questionnaire_completed())
            }

            Event::SubmitEmail(email) => {
                self.expect_step(Step::Email, name)?;
                if self.user_data.is_none() || self.answers.is_empty() {
                    return Ok(self.failed(MISSING_EVALUATION_DATA));
                }
                let mut next = self.clone();
                next.email = Some(email);
                next.step = Step::Evaluating;
                Ok(next)
            }

            Event::EvaluationReady { epoch, evaluation } => {
                self.expect_pending(Pending::Evaluation, epoch, name)?;
                if evaluation.trim().is_empty() {
                    return Ok(self.failed(EMPTY_EVALUATION));
                }
                let mut next = self.clone();
                next.evaluation = Some(evaluation);
                next.step = Step::Results;
                Ok(next)
            }

            Event::EvaluationFailed { epoch, message } => {
                self.expect_pending(Pending::Evaluation, epoch, name)?;
                Ok(self.failed(&message))
            }
        }
    }

    fn expect_step(&self, step: Step, event: &'static str) -> Result<(), FlowError> {
        if self.step == step {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition { event, step: self.step })
        }
    }

    fn expect_pending(&self, pending: Pending, epoch: u64, event: &'static str) -> Result<(), FlowError> {
        if epoch != self.epoch {
            return Err(FlowError::Stale { got: epoch, current: self.epoch });
        }
        if self.pending() == Some(pending) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition { event, step: self.step })
        }
    }

    fn questionnaire_completed(mut self) -> Self {
        if self.user_data.is_none() {
            return self.failed(MISSING_USER_DATA);
        }
        self.step = match self.variant {
            FlowVariant::ThreeStep => Step::Evaluating,
            FlowVariant::WithEmail => Step::Email,
        };
        self
    }

    fn failed(&self, message: &str) -> Self {
        let mut next = self.clone();
        next.error = Some(if message.trim().is_empty() { UNKNOWN_ERROR.to_owned() } else { message.to_owned() });
        next.step = Step::Error;
        next
    }

    fn restarted(&self) -> Self {
        let mut next = Self::new(self.id, self.variant);
        next.epoch = self.epoch + 1;
        next
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
