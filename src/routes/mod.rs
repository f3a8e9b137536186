//! Router assembly and the JSON error envelope.
//!
//! SYSTEM CONTEXT
//! ==============
//! `/api/sessions/...` drives the step controller and answers with a
//! [`SessionView`](crate::screens::SessionView). `/api/generate-questions`
//! and `/api/evaluate-answers` expose the assessment client statelessly.
//! Every error body is `{error, code}`, plus `field` for validation errors.
//! Request bodies go through [`ApiJson`] so malformed JSON gets the same
//! envelope.

pub mod backend;
pub mod sessions;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, OptionalFromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ErrorCode;
use crate::screens::ValidationError;
use crate::services::assessor::AssessError;
use crate::services::controller::ControllerError;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/{id}/start", post(sessions::start_session))
        .route("/api/sessions/{id}/answer", post(sessions::answer_question))
        .route("/api/sessions/{id}/answers", post(sessions::complete_questionnaire))
        .route("/api/sessions/{id}/email", post(sessions::submit_email))
        .route("/api/sessions/{id}/restart", post(sessions::restart_session))
        .route("/api/generate-questions", post(backend::generate_questions))
        .route("/api/evaluate-answers", post(backend::evaluate_answers))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// ERROR ENVELOPE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, code: &'static str) -> Self {
        Self { status, body: ErrorBody { error: error.into(), code, field: None } }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let mut api = Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.message, err.error_code());
        api.body.field = Some(err.field);
        api
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        let status = match &err {
            ControllerError::NotFound(_) => StatusCode::NOT_FOUND,
            ControllerError::Flow(_) => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string(), err.error_code())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match &rejection {
            JsonRejection::JsonDataError(_) => "E_INVALID_BODY",
            JsonRejection::JsonSyntaxError(_) => "E_MALFORMED_JSON",
            JsonRejection::MissingJsonContentType(_) => "E_UNSUPPORTED_MEDIA_TYPE",
            _ => "E_BAD_REQUEST",
        };
        let detail = rejection.body_text();
        let mut api = Self::new(rejection.status(), detail.as_str(), code);
        api.body.field = rejected_field(&detail);
        api
    }
}

// =============================================================================
// JSON BODY EXTRACTOR
// =============================================================================

/// `Json` whose rejection is an [`ApiError`].
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// A request without a JSON content type yields `None`.
impl<T, S> OptionalFromRequest<S> for ApiJson<T>
where
    Json<T>: OptionalFromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        let body = <Json<T> as OptionalFromRequest<S>>::from_request(req, state).await?;
        Ok(body.map(|Json(value)| Self(value)))
    }
}

const BODY_FIELDS: &[&str] = &["age", "gender", "consent", "email", "option", "answers", "variant", "userData"];

/// Top-level field named in a deserialization error, e.g.
/// `...target type: consent: invalid type: string "ja", expected a boolean`.
fn rejected_field(detail: &str) -> Option<&'static str> {
    let path = detail.rsplit_once("target type: ").map_or(detail, |(_, rest)| rest);
    BODY_FIELDS.iter().copied().find(|field| {
        path.strip_prefix(field)
            .is_some_and(|rest| rest.starts_with([':', '.', '[']))
    })
}

/// Stateless endpoints report the user-facing message; details are logged
/// by the caller.
pub(crate) fn assess_error(err: &AssessError, fallback: &'static str) -> ApiError {
    let status = match err {
        AssessError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        AssessError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        AssessError::Llm(_)
        | AssessError::MalformedQuestions(_)
        | AssessError::NoQuestions
        | AssessError::EmptyEvaluation => StatusCode::BAD_GATEWAY,
    };
    ApiError::new(status, err.user_message(fallback), err.error_code())
}
