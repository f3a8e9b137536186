//! Screens: what the user sees for each step, and local form validation.
//!
//! DESIGN
//! ======
//! Every response of the session API carries a [`Screen`] built from the
//! session alone. Form screens validate their input before any event reaches
//! the state machine; a [`ValidationError`] leaves the session untouched.

pub mod email;
pub mod questionnaire;
pub mod results;
pub mod view;
pub mod welcome;

pub use email::EmailForm;
pub use view::{Screen, SessionView};
pub use welcome::WelcomeForm;

/// A form field that failed validation, with the German message shown next
/// to the form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl crate::error::ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        "E_VALIDATION"
    }
}
