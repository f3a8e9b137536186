//! Value types collected and produced during a questionnaire session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MIN_AGE: u8 = 1;
pub const MAX_AGE: u8 = 120;
pub const MIN_OPTIONS: usize = 3;
pub const MAX_OPTIONS: usize = 5;

// =============================================================================
// GENDER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Männlich")]
    Maennlich,
    Weiblich,
    Divers,
}

impl Gender {
    pub const ALL: [Self; 3] = [Self::Maennlich, Self::Weiblich, Self::Divers];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Maennlich => "Männlich",
            Self::Weiblich => "Weiblich",
            Self::Divers => "Divers",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Gender {
    type Err = UserDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|g| g.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UserDataError::UnknownGender(trimmed.to_owned()))
    }
}

// =============================================================================
// USER DATA
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserDataError {
    #[error("age {0} is outside {MIN_AGE}..={MAX_AGE}")]
    AgeOutOfRange(i64),
    #[error("unknown gender {0:?}")]
    UnknownGender(String),
}

/// Demographic data entered on the welcome screen. Only constructible with a
/// valid age, so a held `UserData` is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawUserData")]
pub struct UserData {
    age: u8,
    gender: Gender,
}

#[derive(Deserialize)]
struct RawUserData {
    age: i64,
    gender: Gender,
}

impl TryFrom<RawUserData> for UserData {
    type Error = UserDataError;

    fn try_from(raw: RawUserData) -> Result<Self, Self::Error> {
        Self::new(raw.age, raw.gender)
    }
}

impl UserData {
    /// # Errors
    ///
    /// Returns [`UserDataError::AgeOutOfRange`] unless `age` is in 1..=120.
    pub fn new(age: i64, gender: Gender) -> Result<Self, UserDataError> {
        let age = u8::try_from(age)
            .ok()
            .filter(|a| (MIN_AGE..=MAX_AGE).contains(a))
            .ok_or(UserDataError::AgeOutOfRange(age))?;
        Ok(Self { age, gender })
    }

    #[must_use]
    pub fn age(&self) -> u8 {
        self.age
    }

    #[must_use]
    pub fn gender(&self) -> Gender {
        self.gender
    }
}

// =============================================================================
// QUESTIONS & ANSWERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_text: String,
    pub options: Vec<String>,
}

impl Question {
    /// A question is usable when it has text and 3..=5 non-blank options.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.question_text.trim().is_empty()
            && (MIN_OPTIONS..=MAX_OPTIONS).contains(&self.options.len())
            && self.options.iter().all(|o| !o.trim().is_empty())
    }

    #[must_use]
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
}

// =============================================================================
// FLOW VARIANT
// =============================================================================

/// Whether an email-capture step sits between the questionnaire and the
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowVariant {
    ThreeStep,
    WithEmail,
}

impl FromStr for FlowVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "three_step" => Ok(Self::ThreeStep),
            "with_email" => Ok(Self::WithEmail),
            other => Err(format!("unknown flow variant: {other}")),
        }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
