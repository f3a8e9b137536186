use super::*;
use crate::flow::Step;
use crate::screens::Screen;
use crate::state::test_helpers;
use serde_json::json;

async fn new_session(state: &AppState, variant: Option<FlowVariant>) -> Uuid {
    let body = variant.map(|v| ApiJson(CreateSessionBody { variant: Some(v) }));
    let (status, Json(view)) = create_session(State(state.clone()), body).await;
    assert_eq!(status, StatusCode::CREATED);
    view.id
}

fn welcome_form(age: serde_json::Value, gender: &str, consent: bool) -> ApiJson<WelcomeForm> {
    ApiJson(serde_json::from_value(json!({ "age": age, "gender": gender, "consent": consent })).unwrap())
}

async fn start(state: &AppState, id: Uuid) -> SessionView {
    let Json(view) = start_session(State(state.clone()), Path(id), welcome_form(json!(34), "Weiblich", true))
        .await
        .unwrap();
    view
}

async fn answer(state: &AppState, id: Uuid, option: &str) -> Result<Json<SessionView>, ApiError> {
    answer_question(State(state.clone()), Path(id), ApiJson(AnswerBody { option: option.into() })).await
}

#[tokio::test]
async fn create_without_body_uses_default_variant() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let (_, Json(view)) = create_session(State(state), None).await;
    assert_eq!(view.step, Step::Welcome);
    assert_eq!(view.variant, FlowVariant::WithEmail);
    assert!(matches!(view.screen, Screen::Welcome { .. }));
}

#[tokio::test]
async fn create_honours_requested_variant() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let id = new_session(&state, Some(FlowVariant::ThreeStep)).await;
    let Json(view) = get_session(State(state), Path(id)).await.unwrap();
    assert_eq!(view.variant, FlowVariant::ThreeStep);
}

#[tokio::test]
async fn get_unknown_session_is_404() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let err = get_session(State(state), Path(Uuid::new_v4())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_welcome_form_is_422_and_step_unchanged() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let id = new_session(&state, None).await;

    let err = start_session(State(state.clone()), Path(id), welcome_form(json!("0"), "Weiblich", true))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.body.field, Some("age"));

    let err = start_session(State(state.clone()), Path(id), welcome_form(json!(34), "Weiblich", false))
        .await
        .unwrap_err();
    assert_eq!(err.body.field, Some("consent"));

    let Json(view) = get_session(State(state), Path(id)).await.unwrap();
    assert_eq!(view.step, Step::Welcome);
}

#[tokio::test]
async fn start_presents_first_question() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let id = new_session(&state, None).await;
    let view = start(&state, id).await;
    assert_eq!(view.step, Step::Questionnaire);
    let Screen::Questionnaire(q) = view.screen else {
        panic!("expected questionnaire screen");
    };
    assert_eq!(q.label, "Frage 1 von 2");
}

#[tokio::test]
async fn answer_in_wrong_step_is_409() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let id = new_session(&state, None).await;
    let err = answer(&state, id, "Ja").await.unwrap_err();
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.body.code, "E_INVALID_TRANSITION");
}

#[tokio::test]
async fn full_email_flow_over_handlers() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let id = new_session(&state, None).await;
    start(&state, id).await;
    answer(&state, id, "Ja").await.unwrap();
    let Json(view) = answer(&state, id, "Keine").await.unwrap();
    assert_eq!(view.step, Step::Email);

    let bad = ApiJson(EmailForm { email: "kein-at".into(), consent: true });
    let err = submit_email(State(state.clone()), Path(id), bad).await.unwrap_err();
    assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.body.field, Some("email"));

    let good = ApiJson(EmailForm { email: "max@example.de".into(), consent: true });
    let Json(view) = submit_email(State(state.clone()), Path(id), good).await.unwrap();
    assert_eq!(view.step, Step::Results);
    assert!(matches!(view.screen, Screen::Results { .. }));

    let Json(view) = restart_session(State(state.clone()), Path(id)).await.unwrap();
    assert_eq!(view.step, Step::Welcome);
}

#[tokio::test]
async fn bulk_answers_with_mismatch_is_409() {
    let state = test_helpers::test_app_state(FlowVariant::ThreeStep);
    let id = new_session(&state, None).await;
    start(&state, id).await;
    let body = ApiJson(AnswersBody { answers: vec![Answer { question: "Falsch?".into(), answer: "Ja".into() }] });
    let err = complete_questionnaire(State(state.clone()), Path(id), body).await.unwrap_err();
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.body.code, "E_ANSWER_MISMATCH");
}

#[tokio::test]
async fn bulk_answers_cannot_change_a_given_answer() {
    let state = test_helpers::test_app_state(FlowVariant::WithEmail);
    let id = new_session(&state, None).await;
    start(&state, id).await;
    answer(&state, id, "Manchmal").await.unwrap();

    let body = ApiJson(AnswersBody {
        answers: vec![
            Answer { question: "Niesen Sie häufig?".into(), answer: "Ja".into() },
            Answer { question: "Haben Sie Haustiere?".into(), answer: "Keine".into() },
        ],
    });
    let err = complete_questionnaire(State(state.clone()), Path(id), body).await.unwrap_err();
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.body.code, "E_ANSWER_MISMATCH");

    let Json(view) = get_session(State(state), Path(id)).await.unwrap();
    assert_eq!(view.step, Step::Questionnaire);
}

#[tokio::test]
async fn delete_then_get_is_404() {
    let state = test_helpers::test_app_state(FlowVariant::ThreeStep);
    let id = new_session(&state, None).await;
    assert_eq!(delete_session(State(state.clone()), Path(id)).await.unwrap(), StatusCode::NO_CONTENT);
    assert_eq!(get_session(State(state.clone()), Path(id)).await.unwrap_err().status, StatusCode::NOT_FOUND);
    assert_eq!(delete_session(State(state), Path(id)).await.unwrap_err().status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn router_serves_over_tcp() {
    let state = test_helpers::test_app_state(FlowVariant::ThreeStep);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, crate::routes::app(state)).await.unwrap();
    });

    let client = reqwest::Client::new();
    let health = client.get(format!("http://{addr}/healthz")).send().await.unwrap();
    assert_eq!(health.status().as_u16(), 200);

    let created: serde_json::Value = client
        .post(format!("http://{addr}/api/sessions"))
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created["step"], "welcome");
    assert_eq!(created["screen"]["kind"], "welcome");

    let id = created["id"].as_str().unwrap();
    let resp = client
        .post(format!("http://{addr}/api/sessions/{id}/start"))
        .json(&json!({ "age": "abc", "gender": "Divers", "consent": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["field"], "age");
    assert_eq!(body["error"], "Bitte geben Sie ein gültiges Alter ein.");

    let resp = client
        .post(format!("http://{addr}/api/sessions/{id}/start"))
        .json(&json!({ "age": 34, "gender": "Weiblich", "consent": "ja" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "E_INVALID_BODY");
    assert_eq!(body["field"], "consent");
    assert!(body["error"].as_str().unwrap().contains("consent"));
}
