//! In-memory rate limiting for assessment requests.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<Uuid, VecDeque<Instant>>`.
//! Two limits guard the generative-AI backend:
//! - Per-session: 6 remote calls/min (a full pass needs two)
//! - Global: 30 remote calls/min across all sessions and the stateless API
//!
//! Windows for sessions that stop calling are pruned lazily on the next
//! check for that session and dropped when a session is deleted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::env_parse;

const DEFAULT_PER_SESSION_LIMIT: usize = 6;
const DEFAULT_PER_SESSION_WINDOW_SECS: u64 = 60;

const DEFAULT_GLOBAL_LIMIT: usize = 30;
const DEFAULT_GLOBAL_WINDOW_SECS: u64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub per_session_limit: usize,
    pub per_session_window: Duration,
    pub global_limit: usize,
    pub global_window: Duration,
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let per_session_window_secs = env_parse("RATE_LIMIT_PER_SESSION_WINDOW_SECS", DEFAULT_PER_SESSION_WINDOW_SECS);
        let global_window_secs = env_parse("RATE_LIMIT_GLOBAL_WINDOW_SECS", DEFAULT_GLOBAL_WINDOW_SECS);

        Self {
            per_session_limit: env_parse("RATE_LIMIT_PER_SESSION", DEFAULT_PER_SESSION_LIMIT),
            per_session_window: Duration::from_secs(per_session_window_secs),
            global_limit: env_parse("RATE_LIMIT_GLOBAL", DEFAULT_GLOBAL_LIMIT),
            global_window: Duration::from_secs(global_window_secs),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_session_limit: DEFAULT_PER_SESSION_LIMIT,
            per_session_window: Duration::from_secs(DEFAULT_PER_SESSION_WINDOW_SECS),
            global_limit: DEFAULT_GLOBAL_LIMIT,
            global_window: Duration::from_secs(DEFAULT_GLOBAL_WINDOW_SECS),
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RateLimitError {
    #[error("per-session rate limit exceeded (max {limit} requests/{window_secs}s)")]
    PerSessionExceeded { limit: usize, window_secs: u64 },
    #[error("global rate limit exceeded (max {limit} requests/{window_secs}s)")]
    GlobalExceeded { limit: usize, window_secs: u64 },
}

impl crate::error::ErrorCode for RateLimitError {
    fn error_code(&self) -> &'static str {
        "E_RATE_LIMITED"
    }

    fn retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
    config: RateLimitConfig,
}

#[derive(Default)]
struct RateLimiterInner {
    /// Per-session request timestamps.
    session_requests: HashMap<Uuid, VecDeque<Instant>>,
    /// Global request timestamps.
    global_requests: VecDeque<Instant>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: RateLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(RateLimiterInner::default())), config }
    }

    /// Check both per-session and global limits, then record the request.
    ///
    /// # Errors
    ///
    /// Returns the first limit that would be exceeded; nothing is recorded.
    pub fn check_session(&self, session_id: Uuid) -> Result<(), RateLimitError> {
        self.check_and_record_at(Some(session_id), Instant::now())
    }

    /// Check the global limit only, for calls not tied to a session.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::GlobalExceeded`] when the window is full.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        self.check_and_record_at(None, Instant::now())
    }

    /// Drop the window kept for a deleted session.
    pub fn forget(&self, session_id: Uuid) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.session_requests.remove(&session_id);
    }

    fn check_and_record_at(&self, session_id: Option<Uuid>, now: Instant) -> Result<(), RateLimitError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let cfg = self.config;

        prune_window(&mut inner.global_requests, now, cfg.global_window);
        if inner.global_requests.len() >= cfg.global_limit {
            return Err(RateLimitError::GlobalExceeded {
                limit: cfg.global_limit,
                window_secs: cfg.global_window.as_secs(),
            });
        }

        if let Some(id) = session_id {
            let session_deque = inner.session_requests.entry(id).or_default();
            prune_window(session_deque, now, cfg.per_session_window);
            if session_deque.len() >= cfg.per_session_limit {
                return Err(RateLimitError::PerSessionExceeded {
                    limit: cfg.per_session_limit,
                    window_secs: cfg.per_session_window.as_secs(),
                });
            }
            session_deque.push_back(now);
        }
        inner.global_requests.push_back(now);

        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
