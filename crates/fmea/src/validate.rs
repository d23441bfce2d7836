//! Validation of submitted failure mode entries.
//!
//! Raw field values arrive as strings (from the web form or the CLI). They
//! are checked here and turned into a [`NewFailureMode`] ready for storage;
//! anything else is rejected with a [`ValidationError`] and nothing is written.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{NewFailureMode, Rating, RATING_MAX, RATING_MIN};

/// Why a submission was rejected.
///
/// The `Display` output is shown to the user next to the form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty or absent.
    #[error("{field} is required")]
    MissingField {
        /// Human-readable field name.
        field: &'static str,
    },

    /// A rating was not an integer.
    #[error("{field} must be a whole number, got '{value}'")]
    NotANumber {
        /// Human-readable field name.
        field: &'static str,
        /// The submitted text.
        value: String,
    },

    /// A rating was an integer outside `1..=10`.
    #[error("{field} must be between {min} and {max}, got {value}", min = RATING_MIN, max = RATING_MAX)]
    OutOfRange {
        /// Human-readable field name.
        field: &'static str,
        /// The submitted value.
        value: i64,
    },
}

impl ValidationError {
    /// The human-readable name of the offending field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::NotANumber { field, .. }
            | Self::OutOfRange { field, .. } => field,
        }
    }
}

/// Unvalidated field values as submitted.
///
/// Every field defaults to an empty string so that an absent field is
/// reported as missing rather than failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormInput {
    /// Process step.
    pub step: String,
    /// Failure mode description.
    pub failure_mode: String,
    /// Cause.
    pub cause: String,
    /// Current control.
    pub control: String,
    /// Severity rating text.
    pub severity: String,
    /// Occurrence rating text.
    pub occurrence: String,
    /// Detection rating text.
    #[serde(alias = "detectability")]
    pub detection: String,
}

/// Validate raw input and build the entry to store.
///
/// Text fields are trimmed and must be non-empty. Ratings must parse as
/// integers in `1..=10`. Fields are checked in form order and the first
/// problem found is returned.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing the first invalid field.
pub fn validate(input: &FormInput) -> Result<NewFailureMode, ValidationError> {
    let step = required_text("Step", &input.step)?;
    let failure_mode = required_text("Failure mode", &input.failure_mode)?;
    let cause = required_text("Cause", &input.cause)?;
    let control = required_text("Control", &input.control)?;
    let severity = rating("Severity", &input.severity)?;
    let occurrence = rating("Occurrence", &input.occurrence)?;
    let detection = rating("Detection", &input.detection)?;

    Ok(NewFailureMode {
        step,
        failure_mode,
        cause,
        control,
        severity,
        occurrence,
        detection,
    })
}

fn required_text(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_string())
}

fn rating(field: &'static str, raw: &str) -> Result<Rating, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    let value: i64 = trimmed.parse().map_err(|_| ValidationError::NotANumber {
        field,
        value: trimmed.to_string(),
    })?;
    Rating::new(value).ok_or(ValidationError::OutOfRange { field, value })
}
