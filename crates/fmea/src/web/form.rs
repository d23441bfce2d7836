//! The entry form flow.
//!
//! A form is either waiting for input (blank, or re-shown with the rejected
//! values and an error) or has been submitted, in which case the browser is
//! redirected back to a fresh form.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::validate::FormInput;

/// Where a form submission ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    /// Show the form, optionally with the previous input and an error.
    AwaitingInput {
        /// Values to pre-fill.
        input: FormInput,
        /// Message explaining why the last submission was rejected.
        error: Option<String>,
    },
    /// The entry was stored under `id`.
    Submitted {
        /// The assigned record id.
        id: i64,
    },
}

impl FormState {
    /// An empty form.
    #[must_use]
    pub fn blank() -> Self {
        Self::AwaitingInput {
            input: FormInput::default(),
            error: None,
        }
    }

    /// Resolve the outcome of a submission.
    ///
    /// Rejected input goes back to the user; any other error is a fault and
    /// is returned as-is.
    ///
    /// # Errors
    ///
    /// Returns the storage error when the failure wasn't a validation problem.
    pub fn from_submission(outcome: Result<i64>, input: FormInput) -> Result<Self> {
        match outcome {
            Ok(id) => Ok(Self::Submitted { id }),
            Err(Error::Validation(err)) => Ok(Self::AwaitingInput {
                input,
                error: Some(err.to_string()),
            }),
            Err(err) => Err(err),
        }
    }

    /// Template context for an awaiting form; `None` once submitted.
    #[must_use]
    pub fn view(&self, submitted: bool) -> Option<FormView<'_>> {
        match self {
            Self::AwaitingInput { input, error } => Some(FormView {
                input,
                error: error.as_deref(),
                submitted,
            }),
            Self::Submitted { .. } => None,
        }
    }
}

/// Values the form template reads.
#[derive(Debug, Serialize)]
pub struct FormView<'a> {
    /// Pre-filled values.
    pub input: &'a FormInput,
    /// Error message, if any.
    pub error: Option<&'a str>,
    /// Show the "saved" confirmation.
    pub submitted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationError;

    #[test]
    fn test_blank_has_no_error() {
        let state = FormState::blank();
        let view = state.view(false).unwrap();
        assert!(view.error.is_none());
        assert_eq!(view.input, &FormInput::default());
    }

    #[test]
    fn test_success_is_submitted() {
        let state = FormState::from_submission(Ok(12), FormInput::default()).unwrap();
        assert_eq!(state, FormState::Submitted { id: 12 });
        assert!(state.view(false).is_none());
    }

    #[test]
    fn test_validation_failure_keeps_input() {
        let input = FormInput {
            failure_mode: "Seal leak".to_string(),
            ..FormInput::default()
        };
        let outcome = Err(ValidationError::MissingField { field: "Step" }.into());
        let state = FormState::from_submission(outcome, input.clone()).unwrap();

        let view = state.view(false).unwrap();
        assert_eq!(view.error, Some("Step is required"));
        assert_eq!(view.input.failure_mode, "Seal leak");
    }

    #[test]
    fn test_fault_propagates() {
        let outcome = Err(Error::corrupt_record(1, "bad"));
        assert!(FormState::from_submission(outcome, FormInput::default()).is_err());
    }
}
