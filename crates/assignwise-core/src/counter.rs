//! # Workload Counter Arithmetic
//!
//! The pure half of the load counter: strict parsing of the stored value
//! and the ±1 step. The read and the write-back belong to the app layer,
//! which talks to the store.
//!
//! Unlike ranking metrics, a counter that is absent or non-numeric is an
//! error: adjusting a load that cannot be read would silently reset it.

use crate::{AssignwiseError, CandidateId, FieldValue};
use serde::{Deserialize, Serialize};

/// Direction of a counter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterStep {
    Increment,
    Decrement,
}

impl CounterStep {
    #[must_use]
    pub fn delta(self) -> f64 {
        match self {
            Self::Increment => 1.0,
            Self::Decrement => -1.0,
        }
    }

    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        value + self.delta()
    }
}

impl std::fmt::Display for CounterStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increment => f.write_str("incremented"),
            Self::Decrement => f.write_str("decremented"),
        }
    }
}

/// A committed counter adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterChange {
    pub candidate: CandidateId,
    pub field: String,
    pub step: CounterStep,
    pub previous: f64,
    pub current: f64,
}

impl CounterChange {
    /// Compute the change that `step` makes to `previous`.
    #[must_use]
    pub fn plan(candidate: CandidateId, field: &str, step: CounterStep, previous: f64) -> Self {
        Self {
            candidate,
            field: field.to_string(),
            step,
            previous,
            current: step.apply(previous),
        }
    }
}

/// Strictly parse a stored counter value.
///
/// Accepts a finite number or text that is, after trimming, entirely a
/// finite number. Anything else is [`AssignwiseError::CounterValue`].
pub fn parse_counter_value(
    candidate: &CandidateId,
    field: &str,
    raw: Option<&FieldValue>,
) -> Result<f64, AssignwiseError> {
    let invalid = |raw: String| AssignwiseError::CounterValue {
        candidate: candidate.clone(),
        field: field.to_string(),
        raw,
    };

    match raw {
        Some(FieldValue::Number(n)) if n.is_finite() => Ok(*n),
        Some(FieldValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| invalid(s.clone())),
        Some(other) => Err(invalid(format!("{other:?}"))),
        None => Err(invalid(String::new())),
    }
}

// =============================================================================
// TESTS
// =============================================================================
