//! Field-level request validation.
//!
//! Handlers collect every problem with a payload before rejecting it, so a
//! client sees all bad fields at once:
//!
//! ```json
//! { "message": "Invalid data!", "data": { "name": ["required field"] } }
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Accepted date format for request fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Field name → list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// No errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Error map with a single message.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field.
    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    /// Iterate over `(field, messages)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates rule failures for one payload.
///
/// Each rule returns the parsed value when the field passes, so a handler
/// can validate and convert in one step and only unwrap the options after
/// [`Validator::finish`] succeeded.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    /// Empty validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a custom failure.
    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Field must be present and non-blank. Returns the trimmed value.
    pub fn required<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.fail(field, "required field");
                None
            },
        }
    }

    /// Field must be present and not all whitespace. Returns the value
    /// untouched, for secrets that are hashed byte for byte.
    pub fn secret<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value {
            Some(v) if !v.trim().is_empty() => Some(v),
            _ => {
                self.fail(field, "required field");
                None
            },
        }
    }

    /// Presence check for non-string fields.
    pub fn present<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.fail(field, "required field");
        }
        value
    }

    /// Upper bound on character count.
    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.fail(field, format!("max length is {max}"));
            }
        }
    }

    /// Lower bound on character count.
    pub fn min_len(&mut self, field: &str, value: Option<&str>, min: usize) {
        if let Some(v) = value {
            if v.chars().count() < min {
                self.fail(field, format!("min length is {min}"));
            }
        }
    }

    /// Value must parse into one of the variants of `T`.
    pub fn one_of<T: FromStr>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        let v = value?;
        if let Ok(parsed) = v.parse() {
            Some(parsed)
        } else {
            self.fail(field, format!("unallowed value {v}"));
            None
        }
    }

    /// `YYYY-MM-DD` date.
    pub fn date(&mut self, field: &str, value: Option<&str>) -> Option<NaiveDate> {
        let v = value?;
        if let Ok(date) = NaiveDate::parse_from_str(v, DATE_FORMAT) {
            Some(date)
        } else {
            self.fail(field, "must be a date in YYYY-MM-DD format");
            None
        }
    }

    /// Loose email shape check: one `@`, non-empty local part, dotted domain.
    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_email(v) {
                self.fail(field, "must be a valid email address");
            }
        }
    }

    /// Whole number given as a string.
    pub fn integer(&mut self, field: &str, value: Option<&str>) -> Option<i64> {
        let v = value?;
        if let Ok(n) = v.trim().parse() {
            Some(n)
        } else {
            self.fail(field, "must be an integer");
            None
        }
    }

    /// Numeric string parsed with `T::from_str`.
    pub fn number<T: FromStr>(&mut self, field: &str, value: Option<&str>) -> Option<T> {
        let v = value?;
        if let Ok(n) = v.trim().parse() {
            Some(n)
        } else {
            self.fail(field, "must be a number");
            None
        }
    }

    /// Value must be zero or more.
    pub fn non_negative<T: PartialOrd + Default>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        let v = value?;
        if v < T::default() {
            self.fail(field, "must not be negative");
            None
        } else {
            Some(v)
        }
    }

    /// Finish validation.
    ///
    /// # Errors
    ///
    /// Returns every recorded failure when at least one rule failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::CarStatus;

    #[test]
    fn collects_all_failures() {
        let mut v = Validator::new();
        v.required("name", Some("   "));
        v.required("email", None);
        v.max_len("plate_number", Some("B 1234 ABCDEFGHIJK"), 10);
        let errors = v.finish().unwrap_err();

        assert_eq!(errors.field("name"), ["required field"]);
        assert_eq!(errors.field("email"), ["required field"]);
        assert_eq!(errors.field("plate_number"), ["max length is 10"]);
    }

    #[test]
    fn secrets_keep_their_whitespace() {
        let mut v = Validator::new();
        assert_eq!(v.secret("password", Some("  pass word  ")), Some("  pass word  "));
        assert_eq!(v.secret("password", Some("        ")), None);
        assert_eq!(v.secret("old_password", None), None);
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.field("password"), ["required field"]);
        assert_eq!(errors.field("old_password"), ["required field"]);
    }

    #[test]
    fn parses_enums_and_dates() {
        let mut v = Validator::new();
        let status: Option<CarStatus> = v.one_of("status", Some("Booked"));
        let date = v.date("dob", Some("1990-04-01"));
        assert!(v.finish().is_ok());
        assert_eq!(status, Some(CarStatus::Booked));
        assert_eq!(date, NaiveDate::from_ymd_opt(1990, 4, 1));

        let mut v = Validator::new();
        let _: Option<CarStatus> = v.one_of("status", Some("Lost"));
        v.date("dob", Some("01/04/1990"));
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.field("status"), ["unallowed value Lost"]);
        assert_eq!(errors.field("dob"), ["must be a date in YYYY-MM-DD format"]);
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("budi@example.com"));
        assert!(is_email("a.b@mail.co.id"));
        assert!(!is_email("budi.example.com"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("budi@example"));
        assert!(!is_email("bu di@example.com"));
        assert!(!is_email("a@b@example.com"));
    }

    #[test]
    fn numbers() {
        let mut v = Validator::new();
        assert_eq!(v.integer("capacity", Some("7")), Some(7));
        assert_eq!(v.non_negative("cost", Some(-1_i64)), None);
        assert_eq!(v.number::<f64>("price", Some("x")), None);
        let errors = v.finish().unwrap_err();
        assert_eq!(errors.field("cost"), ["must not be negative"]);
        assert_eq!(errors.field("price"), ["must be a number"]);
    }

    #[test]
    fn serializes_as_plain_map() {
        let errors = ValidationErrors::single("name", "required field");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "name": ["required field"] }));
        assert_eq!(errors.to_string(), "name: required field");
    }
}
