//! Welcome form: age, gender and data-processing consent.

use serde::Deserialize;

use super::ValidationError;
use crate::flow::model::{MAX_AGE, MIN_AGE};
use crate::flow::{Gender, UserData};

pub const INVALID_AGE: &str = "Bitte geben Sie ein gültiges Alter ein.";
pub const MISSING_GENDER: &str = "Bitte wählen Sie ein Geschlecht aus.";
pub const MISSING_CONSENT: &str = "Bitte stimmen Sie der Datenverarbeitung zu, um fortzufahren.";

/// Raw form input. `age` may arrive as a JSON number or as the text of a
/// number field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WelcomeForm {
    pub age: serde_json::Value,
    pub gender: Option<String>,
    pub consent: bool,
}

impl WelcomeForm {
    /// Check age, gender and consent, in that order.
    ///
    /// # Errors
    ///
    /// Returns the first failing field with its message.
    pub fn validate(&self) -> Result<UserData, ValidationError> {
        let invalid_age = ValidationError { field: "age", message: INVALID_AGE };
        let age = parse_age(&self.age)
            .filter(|a| (i64::from(MIN_AGE)..=i64::from(MAX_AGE)).contains(a))
            .ok_or(invalid_age.clone())?;

        let gender = self
            .gender
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .ok_or(ValidationError { field: "gender", message: MISSING_GENDER })?
            .parse::<Gender>()
            .map_err(|_| ValidationError { field: "gender", message: MISSING_GENDER })?;

        if !self.consent {
            return Err(ValidationError { field: "consent", message: MISSING_CONSENT });
        }

        UserData::new(age, gender).map_err(|_| invalid_age)
    }
}

/// Leading-integer parse of a number field: `"34"`, `" 34 "` and `"34 Jahre"`
/// give 34; fractional numbers are truncated.
fn parse_age(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(truncate)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(f: f64) -> i64 {
    f.trunc() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(age: serde_json::Value, gender: Option<&str>, consent: bool) -> WelcomeForm {
        WelcomeForm { age, gender: gender.map(str::to_owned), consent }
    }

    #[test]
    fn valid_form_yields_user_data() {
        let data = form(json!(34), Some("Männlich"), true).validate().unwrap();
        assert_eq!(data.age(), 34);
        assert_eq!(data.gender(), Gender::Maennlich);
    }

    #[test]
    fn age_text_is_parsed_like_a_number_field() {
        assert_eq!(form(json!("42"), Some("Divers"), true).validate().unwrap().age(), 42);
        assert_eq!(form(json!(" 7 Jahre"), Some("Divers"), true).validate().unwrap().age(), 7);
        assert_eq!(form(json!(12.9), Some("Divers"), true).validate().unwrap().age(), 12);
    }

    #[test]
    fn invalid_ages_are_rejected_first() {
        for age in [json!(0), json!(-5), json!(121), json!(""), json!("abc"), json!(null), json!(true)] {
            let err = form(age, None, false).validate().unwrap_err();
            assert_eq!(err, ValidationError { field: "age", message: INVALID_AGE });
        }
    }

    #[test]
    fn missing_or_unknown_gender_is_rejected() {
        for gender in [None, Some(""), Some("  "), Some("Alien")] {
            let err = form(json!(30), gender, true).validate().unwrap_err();
            assert_eq!(err.field, "gender");
            assert_eq!(err.message, MISSING_GENDER);
        }
    }

    #[test]
    fn consent_is_required() {
        let err = form(json!(30), Some("Weiblich"), false).validate().unwrap_err();
        assert_eq!(err.field, "consent");
        assert_eq!(err.to_string(), MISSING_CONSENT);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let parsed: WelcomeForm = serde_json::from_str("{}").unwrap();
        assert!(!parsed.consent);
        assert_eq!(parsed.validate().unwrap_err().field, "age");
    }
}
