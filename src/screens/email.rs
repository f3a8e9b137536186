//! Email form shown between questionnaire and evaluation in the
//! email-capture flow.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::ValidationError;

pub const INVALID_EMAIL: &str = "Bitte geben Sie eine gültige E-Mail-Adresse ein.";
pub const MISSING_CONSENT: &str = "Bitte stimmen Sie der Datenverarbeitung zu.";

static EMAIL_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailForm {
    pub email: String,
    pub consent: bool,
}

impl EmailForm {
    /// Check the address shape, then consent. Returns the address as entered.
    ///
    /// # Errors
    ///
    /// Returns the first failing field with its message.
    pub fn validate(&self) -> Result<String, ValidationError> {
        if !is_valid_email(&self.email) {
            return Err(ValidationError { field: "email", message: INVALID_EMAIL });
        }
        if !self.consent {
            return Err(ValidationError { field: "consent", message: MISSING_CONSENT });
        }
        Ok(self.email.clone())
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE
        .as_ref()
        .is_ok_and(|re| re.is_match(&email.to_lowercase()))
}
