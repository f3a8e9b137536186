//! Step controller: drives sessions through the flow and performs the remote
//! calls each step needs.
//!
//! DESIGN
//! ======
//! Transitions are computed by [`Session::apply`]; this module only stores
//! the results and runs the side effects. A remote call is bracketed by two
//! lock scopes: the "begin" event is applied and the lock released, the call
//! is awaited, then the completion event is applied to whatever the session
//! looks like by then. A restart in between bumps the session epoch, so the
//! late completion is rejected as stale and dropped. A deleted session
//! simply swallows its completion.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::flow::session::MISSING_USER_DATA;
use crate::flow::{Answer, Event, FlowError, FlowVariant, Session, Step, UserData};
use crate::services::assessor::{AssessError, EVALUATION_FAILED, QUESTIONS_FAILED};
use crate::services::leads::{Lead, spawn_lead};
use crate::state::{AppState, SessionSlot};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("session not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl ErrorCode for ControllerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SESSION_NOT_FOUND",
            Self::Flow(e) => e.error_code(),
        }
    }
}

// =============================================================================
// SESSION LIFECYCLE
// =============================================================================

/// Create a session at the welcome step. `variant` falls back to the
/// configured default.
pub async fn create(state: &AppState, variant: Option<FlowVariant>) -> Session {
    let variant = variant.unwrap_or(state.config.default_variant);
    let session = Session::new(Uuid::new_v4(), variant);
    state.sessions.write().await.insert(session.id(), SessionSlot::new(session.clone()));
    info!(session_id = %session.id(), ?variant, "session created");
    session
}

/// # Errors
///
/// Returns [`ControllerError::NotFound`] for an unknown id.
pub async fn get(state: &AppState, id: Uuid) -> Result<Session, ControllerError> {
    let mut sessions = state.sessions.write().await;
    let slot = sessions.get_mut(&id).ok_or(ControllerError::NotFound(id))?;
    slot.touch();
    Ok(slot.session.clone())
}

/// # Errors
///
/// Returns [`ControllerError::NotFound`] for an unknown id.
pub async fn delete(state: &AppState, id: Uuid) -> Result<(), ControllerError> {
    let removed = state.sessions.write().await.remove(&id);
    if removed.is_none() {
        return Err(ControllerError::NotFound(id));
    }
    state.rate_limiter.forget(id);
    info!(session_id = %id, "session deleted");
    Ok(())
}

/// Drop every session not touched within `ttl` of `now`, along with its
/// rate-limit history. Returns how many were evicted.
pub async fn evict_idle(state: &AppState, ttl: Duration, now: Instant) -> usize {
    let idle: Vec<Uuid> = {
        let mut sessions = state.sessions.write().await;
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, slot)| now.saturating_duration_since(slot.last_seen) > ttl)
            .map(|(id, _)| *id)
            .collect();
        for id in &idle {
            sessions.remove(id);
        }
        idle
    };
    for id in &idle {
        state.rate_limiter.forget(*id);
    }
    if !idle.is_empty() {
        info!(evicted = idle.len(), "evicted idle sessions");
    }
    idle.len()
}

/// Spawn the background sweep that evicts idle sessions.
pub fn spawn_idle_sweep(state: AppState) -> JoinHandle<()> {
    let ttl = state.config.session_idle_ttl;
    let every = state.config.session_sweep_interval;
    info!(ttl_secs = ttl.as_secs(), interval_secs = every.as_secs(), "idle session sweep configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            evict_idle(&state, ttl, Instant::now()).await;
        }
    })
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// Store validated user data and generate the questionnaire.
///
/// # Errors
///
/// Returns [`ControllerError`] when the session is unknown or not at the
/// welcome step. Remote failures are not errors here; they move the session
/// to the error step.
pub async fn start(state: &AppState, id: Uuid, user: UserData) -> Result<Session, ControllerError> {
    let session = apply(state, id, Event::Start(user)).await?;
    generate_questions(state, &session, user).await;
    get(state, id).await
}

/// Answer the current question with one of its options.
///
/// # Errors
///
/// Returns [`ControllerError`] when the session is unknown, not in the
/// questionnaire, or the option is not offered.
pub async fn answer(state: &AppState, id: Uuid, option: String) -> Result<Session, ControllerError> {
    let session = apply(state, id, Event::Answer(option)).await?;
    continue_after(state, session).await
}

/// Submit every answer at once.
///
/// # Errors
///
/// Returns [`ControllerError`] when the session is unknown, not in the
/// questionnaire, or the answers do not match the questions.
pub async fn complete(state: &AppState, id: Uuid, answers: Vec<Answer>) -> Result<Session, ControllerError> {
    let session = apply(state, id, Event::CompleteQuestionnaire(answers)).await?;
    continue_after(state, session).await
}

/// Store a validated email address and request the evaluation.
///
/// # Errors
///
/// Returns [`ControllerError`] when the session is unknown or not at the
/// email step.
pub async fn submit_email(state: &AppState, id: Uuid, email: String) -> Result<Session, ControllerError> {
    let session = apply(state, id, Event::SubmitEmail(email)).await?;
    continue_after(state, session).await
}

/// Reset the session to the welcome step. Allowed from every step.
///
/// # Errors
///
/// Returns [`ControllerError::NotFound`] for an unknown id.
pub async fn restart(state: &AppState, id: Uuid) -> Result<Session, ControllerError> {
    apply(state, id, Event::Restart).await
}

// =============================================================================
// INTERNALS
// =============================================================================

async fn apply(state: &AppState, id: Uuid, event: Event) -> Result<Session, ControllerError> {
    let event_name = event.name();
    let mut sessions = state.sessions.write().await;
    let slot = sessions.get_mut(&id).ok_or(ControllerError::NotFound(id))?;
    slot.touch();
    let next = slot.session.apply(event).inspect_err(|e| {
        debug!(session_id = %id, event = event_name, error = %e, "transition rejected");
    })?;
    info!(session_id = %id, event = event_name, step = %next.step(), "transition");
    slot.session = next.clone();
    Ok(next)
}

/// Apply the completion of a remote call. Stale or orphaned results are
/// logged and dropped.
async fn finish(state: &AppState, id: Uuid, event: Event) -> Option<Session> {
    let event_name = event.name();
    let mut sessions = state.sessions.write().await;
    let Some(slot) = sessions.get_mut(&id) else {
        debug!(session_id = %id, event = event_name, "session gone; dropping result");
        return None;
    };
    match slot.session.apply(event) {
        Ok(next) => {
            info!(session_id = %id, event = event_name, step = %next.step(), "transition");
            slot.session = next.clone();
            slot.touch();
            Some(next)
        }
        Err(e @ FlowError::Stale { .. }) => {
            info!(session_id = %id, event = event_name, error = %e, "dropping stale result");
            None
        }
        Err(e) => {
            warn!(session_id = %id, event = event_name, error = %e, "result no longer applicable");
            None
        }
    }
}

/// Run the evaluation if the last transition left the session waiting on it.
async fn continue_after(state: &AppState, session: Session) -> Result<Session, ControllerError> {
    if session.step() == Step::Evaluating {
        evaluate(state, &session).await;
    }
    get(state, session.id()).await
}

async fn generate_questions(state: &AppState, session: &Session, user: UserData) {
    let id = session.id();
    let epoch = session.epoch();

    let result = match state.rate_limiter.check_session(id) {
        Ok(()) => state.assessor.generate_questions(&user).await,
        Err(e) => Err(AssessError::from(e)),
    };
    let event = match result {
        Ok(questions) => {
            info!(session_id = %id, count = questions.len(), "questions generated");
            Event::QuestionsLoaded { epoch, questions }
        }
        Err(e) => {
            warn!(session_id = %id, error = %e, code = e.error_code(), "question generation failed");
            Event::QuestionsFailed { epoch, message: e.user_message(QUESTIONS_FAILED).to_owned() }
        }
    };
    finish(state, id, event).await;
}

async fn evaluate(state: &AppState, session: &Session) {
    let id = session.id();
    let epoch = session.epoch();

    let Some(user) = session.user_data().copied() else {
        finish(state, id, Event::EvaluationFailed { epoch, message: MISSING_USER_DATA.to_owned() }).await;
        return;
    };

    let result = match state.rate_limiter.check_session(id) {
        Ok(()) => state.assessor.evaluate_answers(&user, session.answers()).await,
        Err(e) => Err(AssessError::from(e)),
    };
    let event = match result {
        Ok(evaluation) => Event::EvaluationReady { epoch, evaluation },
        Err(e) => {
            warn!(session_id = %id, error = %e, code = e.error_code(), "evaluation failed");
            Event::EvaluationFailed { epoch, message: e.user_message(EVALUATION_FAILED).to_owned() }
        }
    };

    let Some(next) = finish(state, id, event).await else {
        return;
    };
    if next.step() == Step::Results {
        if let Some(email) = next.email() {
            let lead = Lead { email: email.to_owned(), source: state.config.lead_source.clone() };
            spawn_lead(state.leads.clone(), id, lead);
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
