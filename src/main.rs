mod config;
mod error;
mod flow;
mod llm;
mod rate_limit;
mod routes;
mod screens;
mod services;
mod state;

use std::sync::Arc;

use crate::llm::LlmChat;
use crate::services::assessor::LlmAssessor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env();

    // Non-fatal: the service still runs and the assessment endpoints report
    // an error until the provider is configured.
    let llm: Option<Arc<dyn LlmChat>> = match llm::LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "LLM client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "LLM client not configured; assessments disabled");
            None
        }
    };

    let assessor = Arc::new(LlmAssessor::new(llm, config.question_count, config.ai_max_tokens));
    let leads = services::leads::sink_from_config(config.lead_webhook_url.as_deref());
    let port = config.port;
    let state = state::AppState::new(config, assessor, leads, rate_limit::RateLimiter::new());
    services::controller::spawn_idle_sweep(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "allergy-check listening");
    axum::serve(listener, app).await.expect("server failed");
}
