//! Stable error codes shared by every error type that reaches a client.

/// Maps an error to a stable machine-readable code for API payloads.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
