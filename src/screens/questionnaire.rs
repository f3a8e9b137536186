//! Questionnaire screen: one question at a time with progress.

use serde::Serialize;

use crate::flow::Session;

/// Pause the frontend shows on the selected option before submitting it.
pub const SELECTION_DELAY_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireScreen {
    /// 1-based position of the current question.
    pub index: usize,
    pub total: usize,
    /// Share of questions already answered, in percent.
    pub progress: f64,
    /// "Frage i von N".
    pub label: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub selection_delay_ms: u64,
}

impl QuestionnaireScreen {
    /// `None` unless the session is presenting a question.
    #[must_use]
    pub fn from_session(session: &Session) -> Option<Self> {
        let question = session.current_question()?;
        let total = session.questions().len();
        let answered = session.answers().len();
        Some(Self {
            index: answered + 1,
            total,
            progress: progress_percent(answered, total),
            label: format!("Frage {} von {total}", answered + 1),
            question_text: question.question_text.clone(),
            options: question.options.clone(),
            selection_delay_ms: SELECTION_DELAY_MS,
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn progress_percent(answered: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { answered as f64 / total as f64 * 100.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Event, FlowVariant, Gender, Question, UserData};
    use uuid::Uuid;

    fn questions(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| Question {
                question_text: format!("Frage Nummer {i}?"),
                options: vec!["Ja".into(), "Nein".into(), "Weiß nicht".into()],
            })
            .collect()
    }

    fn in_questionnaire(n: usize) -> Session {
        let user = UserData::new(40, Gender::Divers).unwrap();
        Session::new(Uuid::new_v4(), FlowVariant::ThreeStep)
            .apply(Event::Start(user))
            .unwrap()
            .apply(Event::QuestionsLoaded { epoch: 0, questions: questions(n) })
            .unwrap()
    }

    #[test]
    fn first_question_has_zero_progress() {
        let screen = QuestionnaireScreen::from_session(&in_questionnaire(4)).unwrap();
        assert_eq!(screen.index, 1);
        assert_eq!(screen.label, "Frage 1 von 4");
        assert!(screen.progress.abs() < f64::EPSILON);
        assert_eq!(screen.question_text, "Frage Nummer 1?");
        assert_eq!(screen.options.len(), 3);
    }

    #[test]
    fn progress_counts_answered_questions() {
        let session = in_questionnaire(4).apply(Event::Answer("Ja".into())).unwrap();
        let screen = QuestionnaireScreen::from_session(&session).unwrap();
        assert_eq!(screen.label, "Frage 2 von 4");
        assert!((screen.progress - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_screen_outside_questionnaire() {
        let session = Session::new(Uuid::new_v4(), FlowVariant::WithEmail);
        assert!(QuestionnaireScreen::from_session(&session).is_none());
    }
}
