//! Stateless assessment endpoints in the request/response shapes the
//! browser frontend posts.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ApiError, ApiJson, assess_error};
use crate::error::ErrorCode;
use crate::flow::{Answer, Question, UserData};
use crate::services::assessor::{AssessError, EVALUATION_FAILED, QUESTIONS_FAILED};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateBody {
    pub user_data: UserData,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub evaluation: String,
}

/// `POST /api/generate-questions`: body is the user data itself.
pub async fn generate_questions(
    State(state): State<AppState>,
    ApiJson(user): ApiJson<UserData>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let result = match state.rate_limiter.check_global() {
        Ok(()) => state.assessor.generate_questions(&user).await,
        Err(e) => Err(AssessError::from(e)),
    };
    match result {
        Ok(questions) => Ok(Json(questions)),
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "generate-questions failed");
            Err(assess_error(&e, QUESTIONS_FAILED))
        }
    }
}

/// `POST /api/evaluate-answers`: `{userData, answers}` → `{evaluation}`.
pub async fn evaluate_answers(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EvaluateBody>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let result = match state.rate_limiter.check_global() {
        Ok(()) => state.assessor.evaluate_answers(&body.user_data, &body.answers).await,
        Err(e) => Err(AssessError::from(e)),
    };
    match result {
        Ok(evaluation) => Ok(Json(EvaluateResponse { evaluation })),
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "evaluate-answers failed");
            Err(assess_error(&e, EVALUATION_FAILED))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowVariant;
    use crate::state::test_helpers::{self, MockAssessor, RecordingLeads};
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn state_with(assessor: MockAssessor) -> AppState {
        test_helpers::test_app_state_with(FlowVariant::ThreeStep, Arc::new(assessor), Arc::new(RecordingLeads::default()))
    }

    #[tokio::test]
    async fn generate_returns_question_array() {
        let state = state_with(MockAssessor::happy());
        let Json(questions) = generate_questions(State(state), ApiJson(test_helpers::user())).await.unwrap();
        let json = serde_json::to_value(&questions).unwrap();
        assert_eq!(json[0]["questionText"], "Niesen Sie häufig?");
        assert_eq!(json[1]["options"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn generate_failure_has_error_field() {
        let state = state_with(MockAssessor::new(None, None));
        let err = generate_questions(State(state), ApiJson(test_helpers::user())).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.body.error, QUESTIONS_FAILED);
    }

    #[tokio::test]
    async fn evaluate_returns_evaluation_object() {
        let state = state_with(MockAssessor::happy());
        let body: EvaluateBody = serde_json::from_value(serde_json::json!({
            "userData": { "age": 50, "gender": "Divers" },
            "answers": [{ "question": "Niesen?", "answer": "Ja" }]
        }))
        .unwrap();
        let Json(resp) = evaluate_answers(State(state), ApiJson(body)).await.unwrap();
        assert!(resp.evaluation.starts_with("**Zusammenfassung**"));
    }

    #[tokio::test]
    async fn evaluate_failure_uses_evaluation_message() {
        let state = state_with(MockAssessor::new(None, None));
        let body = EvaluateBody { user_data: test_helpers::user(), answers: Vec::new() };
        let err = evaluate_answers(State(state), ApiJson(body)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.body.error, EVALUATION_FAILED);
        assert_eq!(err.body.code, "E_EMPTY_EVALUATION");
    }

    #[test]
    fn evaluate_body_rejects_invalid_user_data() {
        let parsed = serde_json::from_value::<EvaluateBody>(serde_json::json!({
            "userData": { "age": 150, "gender": "Divers" },
            "answers": []
        }));
        assert!(parsed.is_err());
    }
}
