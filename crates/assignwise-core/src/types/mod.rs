//! # Core Type Definitions
//!
//! This module contains the data model shared by every assignwise component:
//! - Remote identifiers (`AppId`, `RecordId`, `CandidateId`)
//! - Raw record representation (`Record`, `FieldValue`, `UserRef`)
//! - Ranking inputs and outputs (`Candidate`, `PriorityRule`, `CandidatePool`,
//!   `SelectionResult`)
//! - Error types (`AssignwiseError`)
//!
//! ## Determinism Guarantees
//!
//! - Field and metric maps use `BTreeMap` so iteration order is stable
//! - Candidates keep the order in which the store returned them
//! - Metric values are normalized at construction (no NaN, no infinities, no negative zero)

use crate::ranking::parse_metric;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// REMOTE IDENTIFIERS
// =============================================================================

/// Identifier of an app (record collection) in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppId(pub String);

impl AppId {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a single record inside an app.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of a candidate (the user code in the assignee field).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl CandidateId {
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// RECORD REPRESENTATION
// =============================================================================

/// A user reference as stored in a user-selection field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub code: String,
    #[serde(default)]
    pub name: String,
}

impl UserRef {
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// The value held by one field of a remote record.
///
/// Remote stores commonly return numbers as strings, so `Text` is the
/// usual carrier for numeric fields; consumers decide how strictly to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Users(Vec<UserRef>),
}

impl FieldValue {
    /// Text value, if this is a non-empty text field.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// First user of a user-selection field.
    #[must_use]
    pub fn first_user(&self) -> Option<&UserRef> {
        match self {
            Self::Users(users) => users.first(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Users(users) => users.is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Field code → value.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A record as returned by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Current workflow stage, for apps with process management enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub fields: FieldMap,
}

impl Record {
    #[must_use]
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            status: None,
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with_field(mut self, code: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(code.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    #[must_use]
    pub fn field(&self, code: &str) -> Option<&FieldValue> {
        self.fields.get(code)
    }

    #[must_use]
    pub fn has_field(&self, code: &str) -> bool {
        self.fields.contains_key(code)
    }
}

// =============================================================================
// CANDIDATE
// =============================================================================

/// An entity eligible to receive an assignment, with its load metrics.
///
/// Candidates are ephemeral: built fresh from query results for every
/// ranking pass and never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    /// Metric key → parsed load value. Absent keys read as 0.
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl Candidate {
    #[must_use]
    pub fn new(id: CandidateId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style metric insertion. The value is normalized the same
    /// way parsed metrics are (NaN and -0.0 become 0).
    #[must_use]
    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), normalize(value));
        self
    }

    /// Build a candidate from a reference record.
    ///
    /// The identity and display name come from the first user of
    /// `assignee_field`. Every key in `metric_keys` is parsed with the
    /// lenient metric rule: missing or unparsable values become 0.
    pub fn from_record<'a>(
        record: &Record,
        assignee_field: &str,
        metric_keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, AssignwiseError> {
        let user = record
            .field(assignee_field)
            .and_then(FieldValue::first_user)
            .ok_or_else(|| AssignwiseError::MalformedRecord {
                record: record.id.clone(),
                field: assignee_field.to_string(),
            })?;

        let metrics = metric_keys
            .into_iter()
            .map(|key| (key.to_string(), parse_metric(record.field(key))))
            .collect();

        Ok(Self {
            id: CandidateId::new(&user.code),
            name: user.name.clone(),
            metrics,
        })
    }

    /// Metric value for `key`, 0 when absent.
    #[must_use]
    pub fn metric(&self, key: &str) -> f64 {
        self.metrics.get(key).copied().unwrap_or(0.0)
    }
}

/// Map NaN, the infinities and negative zero to `0.0`.
pub(crate) fn normalize(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        0.0
    } else {
        value
    }
}

// =============================================================================
// PRIORITY RULE
// =============================================================================

/// Which extremum a priority rule keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Keep the candidates with the lowest value ("low to high").
    #[serde(alias = "lth")]
    Minimize,
    /// Keep the candidates with the highest value ("high to low").
    #[serde(alias = "htl")]
    Maximize,
}

impl Direction {
    /// Fold step: the better of two values under this direction.
    #[must_use]
    pub fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Minimize => a.min(b),
            Self::Maximize => a.max(b),
        }
    }
}

/// One tie-break step: (metric key, rank, direction).
///
/// Lower ranks are evaluated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub field: String,
    pub rank: i64,
    pub direction: Direction,
}

impl PriorityRule {
    #[must_use]
    pub fn new(field: impl Into<String>, rank: i64, direction: Direction) -> Self {
        Self {
            field: field.into(),
            rank,
            direction,
        }
    }
}

// =============================================================================
// CANDIDATE POOL / SELECTION RESULT
// =============================================================================

/// The full, ordered candidate sequence produced by one query.
///
/// Treated as an immutable snapshot: it feeds ranking and, later, the
/// staleness comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CandidatePool(Vec<Candidate>);

impl CandidatePool {
    #[must_use]
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self(candidates)
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn find(&self, id: &CandidateId) -> Option<&Candidate> {
        self.0.iter().find(|c| &c.id == id)
    }
}

impl FromIterator<Candidate> for CandidatePool {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CandidatePool {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The candidates surviving every priority filter.
///
/// - empty: the pool was empty
/// - one element: unambiguous winner
/// - several: unresolved tie, a human picks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SelectionResult(Vec<Candidate>);

impl SelectionResult {
    #[must_use]
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self(candidates)
    }

    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single winner, if the rules resolved to exactly one candidate.
    #[must_use]
    pub fn winner(&self) -> Option<&Candidate> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_tie(&self) -> bool {
        self.0.len() > 1
    }

    /// The candidate presented first (the default pick).
    #[must_use]
    pub fn first(&self) -> Option<&Candidate> {
        self.0.first()
    }

    #[must_use]
    pub fn find(&self, id: &CandidateId) -> Option<&Candidate> {
        self.0.iter().find(|c| &c.id == id)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur anywhere in assignwise.
///
/// Every failure aborts the current invocation; nothing is retried
/// implicitly and already-committed remote writes are not rolled back.
#[derive(Debug, Error)]
pub enum AssignwiseError {
    /// The ranking pool was empty: every candidate is at or above the threshold.
    #[error("No candidate available below the assignment threshold")]
    NoCandidate,

    /// The candidate pool changed between selection and commit.
    #[error("Candidate pool changed since selection ({changed} candidate(s) differ)")]
    StaleData { changed: usize },

    /// A remote store call failed.
    #[error("Remote operation failed: {0}")]
    RemoteOperation(String),

    /// The load counter could not be read as a number.
    #[error("Counter field {field} of {candidate} is not numeric: {raw:?}")]
    CounterValue {
        candidate: CandidateId,
        field: String,
        raw: String,
    },

    /// Conditional counter updates kept conflicting with concurrent writers.
    #[error("Counter for {candidate} still contended after {attempts} attempt(s)")]
    CounterContention {
        candidate: CandidateId,
        attempts: u32,
    },

    /// A record returned by the store lacks a field the engine requires.
    #[error("Record {record} is missing required field {field}")]
    MalformedRecord { record: RecordId, field: String },

    /// The requested record does not exist.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// A stage name is absent from the process definition.
    #[error("Stage not found in process definition: {0}")]
    StageNotFound(String),

    /// Assignment was requested for a record outside the initial stage.
    #[error("Record {0} is not in the initial stage of its workflow")]
    NotInInitialStage(RecordId),

    /// The chosen candidate is not part of the selection offered.
    #[error("Candidate {0} is not among the selected candidates")]
    InvalidPick(CandidateId),

    /// A date string could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl AssignwiseError {
    /// Whether this error belongs to the remote-operation class.
    ///
    /// Counter read failures and malformed store records are reported the
    /// same way as a failed store call.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteOperation(_)
                | Self::CounterValue { .. }
                | Self::CounterContention { .. }
                | Self::MalformedRecord { .. }
                | Self::RecordNotFound(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
