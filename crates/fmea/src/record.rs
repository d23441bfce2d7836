//! Core record types for fmea.
//!
//! This module defines the typed representation of a failure mode entry,
//! from the bounded 1-10 ratings up to the stored row with its assigned id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest allowed value for a severity, occurrence or detection rating.
pub const RATING_MIN: u8 = 1;

/// Highest allowed value for a severity, occurrence or detection rating.
pub const RATING_MAX: u8 = 10;

/// A severity, occurrence or detection rating in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Build a rating, returning `None` when `value` is outside `1..=10`.
    #[must_use]
    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| (RATING_MIN..=RATING_MAX).contains(v))
            .map(Self)
    }

    /// The rating as a plain integer.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
            .ok_or_else(|| format!("rating {value} is outside {RATING_MIN}..={RATING_MAX}"))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Risk Priority Number: severity x occurrence x detection, always in `1..=1000`.
///
/// Only built from three ratings; it is written out but never read back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Rpn(u16);

impl Rpn {
    /// Compute the RPN of three ratings.
    #[must_use]
    pub fn from_ratings(severity: Rating, occurrence: Rating, detection: Rating) -> Self {
        Self(u16::from(severity.0) * u16::from(occurrence.0) * u16::from(detection.0))
    }

    /// The RPN as a plain integer.
    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for Rpn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A validated failure mode that has not been stored yet.
///
/// Produced by [`crate::validate::validate`]; the RPN is derived from the
/// ratings and can't be set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFailureMode {
    /// Process step or function the failure belongs to.
    pub step: String,
    /// Description of how the step can fail.
    pub failure_mode: String,
    /// Root cause of the failure.
    pub cause: String,
    /// Current control that prevents or detects it.
    pub control: String,
    /// Impact rating.
    pub severity: Rating,
    /// Likelihood rating.
    pub occurrence: Rating,
    /// Detectability rating (10 = hardest to detect).
    pub detection: Rating,
}

impl NewFailureMode {
    /// The RPN this entry will be stored with.
    #[must_use]
    pub fn rpn(&self) -> Rpn {
        Rpn::from_ratings(self.severity, self.occurrence, self.detection)
    }
}

/// A stored failure mode entry.
///
/// Records are immutable once written; `rpn` is the product of the three
/// ratings as they were at insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureModeRecord {
    /// Identifier assigned by the store, strictly increasing.
    pub id: i64,
    /// Process step or function the failure belongs to.
    pub step: String,
    /// Description of how the step can fail.
    pub failure_mode: String,
    /// Root cause of the failure.
    pub cause: String,
    /// Current control that prevents or detects it.
    pub control: String,
    /// Impact rating.
    pub severity: Rating,
    /// Likelihood rating.
    pub occurrence: Rating,
    /// Detectability rating.
    pub detection: Rating,
    /// Risk Priority Number.
    pub rpn: Rpn,
    /// When the record was written; `None` for rows carried over from the
    /// first schema version, which had no timestamp column.
    pub recorded_at: Option<DateTime<Utc>>,
}
