//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the in-memory session map, the assessment client, the lead sink
//! and the rate limiter. Sessions are never persisted; a process restart
//! forgets them, and idle ones are swept (see
//! [`crate::services::controller::spawn_idle_sweep`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::flow::Session;
use crate::rate_limit::RateLimiter;
use crate::services::assessor::Assessor;
use crate::services::leads::LeadSink;

/// Shared application state. Clone is required by Axum; all inner fields are
/// Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<RwLock<HashMap<Uuid, SessionSlot>>>,
    pub assessor: Arc<dyn Assessor>,
    pub leads: Arc<dyn LeadSink>,
    /// In-memory rate limiter for remote assessment calls.
    pub rate_limiter: RateLimiter,
}

/// A stored session and the last time a request touched it.
#[derive(Debug, Clone)]
pub struct SessionSlot {
    pub session: Session,
    pub last_seen: Instant,
}

impl SessionSlot {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session, last_seen: Instant::now() }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

impl AppState {
    #[must_use]
    pub fn new(
        config: AppConfig,
        assessor: Arc<dyn Assessor>,
        leads: Arc<dyn LeadSink>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            assessor,
            leads,
            rate_limiter,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::flow::{Answer, FlowVariant, Gender, Question, UserData};
    use crate::rate_limit::RateLimitConfig;
    use crate::services::assessor::AssessError;
    use crate::services::leads::{Lead, LeadError};

    /// Scripted assessor. `None` results fail with a remote error.
    pub struct MockAssessor {
        pub questions: Option<Vec<Question>>,
        pub evaluation: Option<String>,
        pub question_calls: Mutex<usize>,
        pub evaluation_calls: Mutex<Vec<Vec<Answer>>>,
    }

    impl MockAssessor {
        #[must_use]
        pub fn new(questions: Option<Vec<Question>>, evaluation: Option<&str>) -> Self {
            Self {
                questions,
                evaluation: evaluation.map(str::to_owned),
                question_calls: Mutex::new(0),
                evaluation_calls: Mutex::new(Vec::new()),
            }
        }

        #[must_use]
        pub fn happy() -> Self {
            Self::new(Some(sample_questions()), Some("**Zusammenfassung**\nKeine Auffälligkeiten."))
        }
    }

    #[async_trait::async_trait]
    impl Assessor for MockAssessor {
        async fn generate_questions(&self, _user: &UserData) -> Result<Vec<Question>, AssessError> {
            *self.question_calls.lock().unwrap() += 1;
            match &self.questions {
                Some(q) if q.is_empty() => Err(AssessError::NoQuestions),
                Some(q) => Ok(q.clone()),
                None => Err(AssessError::NotConfigured),
            }
        }

        async fn evaluate_answers(&self, _user: &UserData, answers: &[Answer]) -> Result<String, AssessError> {
            self.evaluation_calls.lock().unwrap().push(answers.to_vec());
            self.evaluation.clone().ok_or(AssessError::EmptyEvaluation)
        }
    }

    #[derive(Default)]
    pub struct RecordingLeads {
        pub leads: Mutex<Vec<Lead>>,
    }

    #[async_trait::async_trait]
    impl LeadSink for RecordingLeads {
        async fn submit(&self, lead: &Lead) -> Result<(), LeadError> {
            self.leads.lock().unwrap().push(lead.clone());
            Ok(())
        }
    }

    /// Lead endpoint that always answers 502. Counts attempts.
    #[derive(Default)]
    pub struct FailingLeads {
        pub attempts: Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl LeadSink for FailingLeads {
        async fn submit(&self, _lead: &Lead) -> Result<(), LeadError> {
            *self.attempts.lock().unwrap() += 1;
            Err(LeadError::Status { status: 502 })
        }
    }

    #[must_use]
    pub fn sample_questions() -> Vec<Question> {
        vec![
            Question {
                question_text: "Niesen Sie häufig?".into(),
                options: vec!["Ja".into(), "Nein".into(), "Manchmal".into()],
            },
            Question {
                question_text: "Haben Sie Haustiere?".into(),
                options: vec!["Hund".into(), "Katze".into(), "Keine".into(), "Andere".into()],
            },
        ]
    }

    #[must_use]
    pub fn user() -> UserData {
        UserData::new(34, Gender::Weiblich).unwrap()
    }

    #[must_use]
    pub fn generous_limits() -> RateLimiter {
        RateLimiter::with_config(RateLimitConfig {
            per_session_limit: 1000,
            per_session_window: Duration::from_secs(60),
            global_limit: 1000,
            global_window: Duration::from_secs(60),
        })
    }

    /// Build an `AppState` around the given assessor and lead sink.
    #[must_use]
    pub fn test_app_state_with(
        variant: FlowVariant,
        assessor: Arc<dyn Assessor>,
        leads: Arc<dyn LeadSink>,
    ) -> AppState {
        let config = AppConfig { default_variant: variant, ..AppConfig::default() };
        AppState::new(config, assessor, leads, generous_limits())
    }

    /// `AppState` with a happy-path assessor and recording lead sink.
    #[must_use]
    pub fn test_app_state(variant: FlowVariant) -> AppState {
        test_app_state_with(variant, Arc::new(MockAssessor::happy()), Arc::new(RecordingLeads::default()))
    }

    /// Insert a fresh session and return its ID.
    pub async fn seed_session(state: &AppState, variant: FlowVariant) -> Uuid {
        let id = Uuid::new_v4();
        state.sessions.write().await.insert(id, SessionSlot::new(Session::new(id, variant)));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{FlowVariant, Step};

    #[tokio::test]
    async fn new_state_has_no_sessions() {
        let state = test_helpers::test_app_state(FlowVariant::ThreeStep);
        assert!(state.sessions.read().await.is_empty());
        assert_eq!(state.config.default_variant, FlowVariant::ThreeStep);
    }

    #[tokio::test]
    async fn seed_session_starts_at_welcome() {
        let state = test_helpers::test_app_state(FlowVariant::WithEmail);
        let id = test_helpers::seed_session(&state, FlowVariant::WithEmail).await;
        let sessions = state.sessions.read().await;
        assert_eq!(sessions[&id].session.step(), Step::Welcome);
    }

    #[tokio::test]
    async fn clones_share_session_map() {
        let state = test_helpers::test_app_state(FlowVariant::WithEmail);
        let clone = state.clone();
        test_helpers::seed_session(&clone, FlowVariant::WithEmail).await;
        assert_eq!(state.sessions.read().await.len(), 1);
    }
}
