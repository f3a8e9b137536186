//! Session routes: one endpoint per step-controller operation.
//!
//! Form bodies are validated before the controller sees them, so a
//! validation failure never changes the session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, ApiJson};
use crate::flow::{Answer, FlowVariant};
use crate::screens::{EmailForm, SessionView, WelcomeForm};
use crate::services::controller;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionBody {
    pub variant: Option<FlowVariant>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
    pub option: String,
}

#[derive(Debug, Deserialize)]
pub struct AnswersBody {
    pub answers: Vec<Answer>,
}

/// `POST /api/sessions`: create a session at the welcome step.
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<ApiJson<CreateSessionBody>>,
) -> (StatusCode, Json<SessionView>) {
    let variant = body.and_then(|ApiJson(b)| b.variant);
    let session = controller::create(&state, variant).await;
    (StatusCode::CREATED, Json(SessionView::from(&session)))
}

/// `GET /api/sessions/:id`: current screen.
pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionView>, ApiError> {
    let session = controller::get(&state, id).await?;
    Ok(Json(SessionView::from(&session)))
}

/// `DELETE /api/sessions/:id`.
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    controller::delete(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/sessions/:id/start`: submit the welcome form.
pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(form): ApiJson<WelcomeForm>,
) -> Result<Json<SessionView>, ApiError> {
    let user = form.validate()?;
    let session = controller::start(&state, id, user).await?;
    Ok(Json(SessionView::from(&session)))
}

/// `POST /api/sessions/:id/answer`: answer the current question.
pub async fn answer_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<AnswerBody>,
) -> Result<Json<SessionView>, ApiError> {
    let session = controller::answer(&state, id, body.option).await?;
    Ok(Json(SessionView::from(&session)))
}

/// `POST /api/sessions/:id/answers`: submit the whole questionnaire.
pub async fn complete_questionnaire(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<AnswersBody>,
) -> Result<Json<SessionView>, ApiError> {
    let session = controller::complete(&state, id, body.answers).await?;
    Ok(Json(SessionView::from(&session)))
}

/// `POST /api/sessions/:id/email`: submit the email form.
pub async fn submit_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(form): ApiJson<EmailForm>,
) -> Result<Json<SessionView>, ApiError> {
    let email = form.validate()?;
    let session = controller::submit_email(&state, id, email).await?;
    Ok(Json(SessionView::from(&session)))
}

/// `POST /api/sessions/:id/restart`.
pub async fn restart_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = controller::restart(&state, id).await?;
    Ok(Json(SessionView::from(&session)))
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
