//! Lead collection: best-effort notification of a captured email address.
//!
//! DESIGN
//! ======
//! Leads are sent from a detached task so the results transition never waits
//! on the webhook. Failures are logged and dropped. Without a configured
//! webhook the lead is only logged.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

const LEAD_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lead {
    pub email: String,
    pub source: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("lead request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("lead endpoint returned {status}")]
    Status { status: u16 },
}

impl crate::error::ErrorCode for LeadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_LEAD_REQUEST",
            Self::Status { .. } => "E_LEAD_STATUS",
        }
    }
}

#[async_trait::async_trait]
pub trait LeadSink: Send + Sync {
    /// Deliver one lead.
    ///
    /// # Errors
    ///
    /// Returns a [`LeadError`] when delivery fails.
    async fn submit(&self, lead: &Lead) -> Result<(), LeadError>;
}

// =============================================================================
// SINKS
// =============================================================================

/// Posts `{email, source}` as JSON to a webhook.
pub struct HttpLeadSink {
    http: reqwest::Client,
    url: String,
}

impl HttpLeadSink {
    /// # Errors
    ///
    /// Returns [`LeadError::Request`] if the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self, LeadError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(LEAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, url })
    }
}

#[async_trait::async_trait]
impl LeadSink for HttpLeadSink {
    async fn submit(&self, lead: &Lead) -> Result<(), LeadError> {
        let response = self.http.post(&self.url).json(lead).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LeadError::Status { status: status.as_u16() });
        }
        Ok(())
    }
}

/// Used when no webhook is configured.
pub struct LogLeadSink;

#[async_trait::async_trait]
impl LeadSink for LogLeadSink {
    async fn submit(&self, lead: &Lead) -> Result<(), LeadError> {
        info!(source = %lead.source, "lead captured (no webhook configured)");
        Ok(())
    }
}

/// Build the sink for the configured webhook, falling back to logging.
#[must_use]
pub fn sink_from_config(url: Option<&str>) -> Arc<dyn LeadSink> {
    let Some(url) = url else {
        return Arc::new(LogLeadSink);
    };
    match HttpLeadSink::new(url.to_owned()) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn!(error = %e, "lead webhook client unavailable; logging leads only");
            Arc::new(LogLeadSink)
        }
    }
}

/// Fire-and-forget delivery.
pub fn spawn_lead(sink: Arc<dyn LeadSink>, session_id: Uuid, lead: Lead) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match sink.submit(&lead).await {
            Ok(()) => info!(%session_id, "lead delivered"),
            Err(e) => warn!(%session_id, error = %e, "lead delivery failed"),
        }
    })
}

#[cfg(test)]
#[path = "leads_test.rs"]
mod tests;
