//! Session → screen mapping.

use serde::Serialize;
use uuid::Uuid;

use super::questionnaire::QuestionnaireScreen;
use super::results::{Block, parse_blocks, to_html};
use crate::flow::{FlowVariant, Gender, Pending, Session, Step};
use crate::flow::session::UNKNOWN_ERROR;

pub const WELCOME_TITLE: &str = "Willkommen beim Allergie-Check";
pub const WELCOME_INTRO: &str = "Beantworten Sie einige Fragen, um eine KI-basierte Voreinschätzung zu erhalten.";
pub const WELCOME_CONSENT: &str = "Ich willige ausdrücklich ein, dass meine angegebenen Daten (einschließlich \
Gesundheitsdaten) zur Durchführung des Allergie-Checks verarbeitet werden. Die Auswertung erfolgt automatisiert \
durch eine künstliche Intelligenz und dient ausschließlich zu Informationszwecken. Es erfolgt keine ärztliche \
Prüfung oder Diagnose.";
pub const WELCOME_SUBMIT: &str = "Anamnese starten";
pub const DISCLAIMER: &str = "Dieser Check ersetzt keine ärztliche Beratung.";

pub const GENERATING_TITLE: &str = "Generiere Fragen...";
pub const GENERATING_TEXT: &str = "Die KI ist aktiviert. Ihre Fragen werden individuell erstellt. Einen Moment bitte.";
/// The generating screen animates a simulated counter up to this value.
pub const GENERATING_SIMULATED_TOTAL: u32 = 20;
pub const GENERATING_SIMULATED_MS: u64 = 8000;

pub const EMAIL_TITLE: &str = "Fast geschafft!";
pub const EMAIL_TEXT: &str =
    "Geben Sie Ihre E-Mail-Adresse ein, um Ihre persönliche, KI-basierte Auswertung zu erhalten.";
pub const EMAIL_CONSENT: &str = "Ich stimme der Verarbeitung meiner E-Mail-Adresse und meiner Antworten zur \
Erstellung und Zusendung der Auswertung zu.";
pub const EMAIL_SUBMIT: &str = "Auswertung anfordern";

pub const EVALUATING_TEXT: &str = "Erstelle Auswertung...";

pub const RESULTS_TITLE: &str = "Ihre persönliche Auswertung";
pub const RESULTS_RESTART: &str = "Erneut starten";

pub const ERROR_TITLE: &str = "Ein Fehler ist aufgetreten";
pub const ERROR_ACTION: &str = "Erneut versuchen";

// =============================================================================
// SCREEN
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    #[serde(rename_all = "camelCase")]
    Welcome {
        title: &'static str,
        intro: &'static str,
        consent_text: &'static str,
        genders: [&'static str; 3],
        submit_label: &'static str,
        disclaimer: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    GeneratingQuestions {
        title: &'static str,
        text: &'static str,
        simulated_total: u32,
        simulated_duration_ms: u64,
    },
    Questionnaire(QuestionnaireScreen),
    #[serde(rename_all = "camelCase")]
    EmailForm {
        title: &'static str,
        text: &'static str,
        consent_text: &'static str,
        submit_label: &'static str,
    },
    LoadingSpinner { text: &'static str },
    #[serde(rename_all = "camelCase")]
    Results {
        title: &'static str,
        blocks: Vec<Block>,
        html: String,
        restart_label: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        title: &'static str,
        message: String,
        action_label: &'static str,
    },
}

impl Screen {
    /// Screen for the session's current step.
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        match session.step() {
            Step::Welcome => Self::welcome(),
            Step::Questionnaire => match QuestionnaireScreen::from_session(session) {
                Some(q) => Self::Questionnaire(q),
                None => Self::error(UNKNOWN_ERROR),
            },
            Step::Email => Self::EmailForm {
                title: EMAIL_TITLE,
                text: EMAIL_TEXT,
                consent_text: EMAIL_CONSENT,
                submit_label: EMAIL_SUBMIT,
            },
            Step::Evaluating => match session.pending() {
                Some(Pending::Questions) => Self::GeneratingQuestions {
                    title: GENERATING_TITLE,
                    text: GENERATING_TEXT,
                    simulated_total: GENERATING_SIMULATED_TOTAL,
                    simulated_duration_ms: GENERATING_SIMULATED_MS,
                },
                _ => Self::LoadingSpinner { text: EVALUATING_TEXT },
            },
            Step::Results => Self::results(session.evaluation().unwrap_or_default()),
            Step::Error => Self::error(session.error().unwrap_or(UNKNOWN_ERROR)),
        }
    }

    fn welcome() -> Self {
        Self::Welcome {
            title: WELCOME_TITLE,
            intro: WELCOME_INTRO,
            consent_text: WELCOME_CONSENT,
            genders: Gender::ALL.map(Gender::label),
            submit_label: WELCOME_SUBMIT,
            disclaimer: DISCLAIMER,
        }
    }

    fn results(evaluation: &str) -> Self {
        let blocks = parse_blocks(evaluation);
        let html = to_html(&blocks);
        Self::Results { title: RESULTS_TITLE, blocks, html, restart_label: RESULTS_RESTART }
    }

    fn error(message: &str) -> Self {
        Self::Error { title: ERROR_TITLE, message: message.to_owned(), action_label: ERROR_ACTION }
    }
}

// =============================================================================
// SESSION VIEW
// =============================================================================

/// Response body of every session endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub step: Step,
    pub variant: FlowVariant,
    pub screen: Screen,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id(),
            step: session.step(),
            variant: session.variant(),
            screen: Screen::for_session(session),
        }
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
