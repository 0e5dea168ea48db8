//! # Candidate Ranking Engine
//!
//! Cascading multi-criteria selection over a candidate pool.
//!
//! Rules are sorted by rank (stable for equal ranks) and folded over the
//! pool: each rule keeps only the candidates holding its extremum, and the
//! fold stops as soon as one candidate remains. Ties that survive every
//! rule are returned as-is for a human to resolve.
//!
//! Comparison is exact `f64` equality. Metric values are normalized when
//! parsed (no NaN, no infinity, no negative zero), so equality here is bit
//! equality and every metric survives a JSON round trip.

use crate::types::normalize;
use crate::{Candidate, CandidatePool, FieldValue, PriorityRule, SelectionResult};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

// =============================================================================
// METRIC PARSING
// =============================================================================

/// Parse a raw metric value with fallback to 0.
///
/// Text is read up to its longest numeric prefix (`"12abc"` reads as 12,
/// `"abc"` as 0). Empty fields, user lists, absent fields and non-finite
/// values read as 0.
#[must_use]
pub fn parse_metric(raw: Option<&FieldValue>) -> f64 {
    let value = match raw {
        Some(FieldValue::Number(n)) => *n,
        Some(FieldValue::Text(s)) => leading_number(s).unwrap_or(0.0),
        Some(FieldValue::Empty | FieldValue::Users(_)) | None => 0.0,
    };
    normalize(value)
}

/// Longest prefix of `s` (after leading whitespace) that reads as a decimal
/// number: optional sign, digits with an optional fraction, and an exponent
/// only when digits follow it.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        let rest = &s[int_start..];
        return rest.starts_with("Infinity").then(|| {
            if bytes.first() == Some(&b'-') {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        });
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

// =============================================================================
// RANKING
// =============================================================================

/// One applied rule and its effect, for display and logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankStep {
    pub field: String,
    pub extremum: f64,
    pub survivors: usize,
}

/// Rank `pool` under `rules`.
///
/// Returns an empty selection only when the pool is empty. A genuine tie
/// across every rule returns all tied candidates in pool order.
#[must_use]
pub fn rank(pool: &CandidatePool, rules: &[PriorityRule]) -> SelectionResult {
    rank_explained(pool, rules).0
}

/// Rank `pool` under `rules`, also reporting each rule that was applied.
#[must_use]
pub fn rank_explained(
    pool: &CandidatePool,
    rules: &[PriorityRule],
) -> (SelectionResult, Vec<RankStep>) {
    let mut ordered: Vec<&PriorityRule> = rules.iter().collect();
    ordered.sort_by_key(|rule| rule.rank);

    let mut steps = Vec::with_capacity(ordered.len());
    let seed = pool.candidates().to_vec();

    if seed.is_empty() {
        return (SelectionResult::default(), steps);
    }

    let folded = ordered.into_iter().try_fold(seed, |remaining, rule| {
        let (narrowed, extremum) = apply_rule(remaining, rule);
        steps.push(RankStep {
            field: rule.field.clone(),
            extremum,
            survivors: narrowed.len(),
        });

        if narrowed.len() == 1 {
            ControlFlow::Break(narrowed)
        } else {
            ControlFlow::Continue(narrowed)
        }
    });

    let (ControlFlow::Break(survivors) | ControlFlow::Continue(survivors)) = folded;
    (SelectionResult::new(survivors), steps)
}

/// Keep the candidates whose metric equals the rule's extremum.
///
/// `remaining` is never empty here, so the extremum always exists.
fn apply_rule(remaining: Vec<Candidate>, rule: &PriorityRule) -> (Vec<Candidate>, f64) {
    let extremum = remaining
        .iter()
        .map(|c| c.metric(&rule.field))
        .reduce(|a, b| rule.direction.pick(a, b))
        .unwrap_or(0.0);

    let narrowed = remaining
        .into_iter()
        .filter(|c| c.metric(&rule.field) == extremum)
        .collect();

    (narrowed, extremum)
}

// =============================================================================
// TESTS
// =============================================================================
