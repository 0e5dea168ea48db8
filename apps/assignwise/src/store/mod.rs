//! # Work-Item Store
//!
//! The remote record store the engine reads candidates and work items from
//! and writes assignments back to.
//!
//! ## Operations
//!
//! | Operation | Purpose |
//! |-----------|---------|
//! | `query` | filtered, projected record listing of one app |
//! | `get_by_id` | a single work item |
//! | `update` | unconditional field write |
//! | `update_if` | compare-and-swap field write, when the store supports it |
//! | `process_definition` | stage order and transition actions of an app |
//! | `transition` | run a workflow action, naming the new assignee |
//!
//! Every error a store returns is a [`AssignwiseError::RemoteOperation`]
//! (or [`AssignwiseError::RecordNotFound`]) and aborts the invocation.

mod memory;

pub use memory::{AppSnapshot, InMemoryStore, StoreSnapshot};

use assignwise_core::{
    AppId, AssignwiseError, CandidateId, FieldMap, FieldValue, ProcessGraph, Record, RecordId,
    parse_metric,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// QUERY FILTER
// =============================================================================

/// Record selection criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordQuery {
    /// Every record of the app.
    All,
    /// Records whose numeric `field` is strictly below `threshold`.
    /// Absent or non-numeric values read as 0.
    Below { field: String, threshold: f64 },
    /// Records whose user-selection `field` contains the user `code`.
    AssignedTo { field: String, code: String },
}

impl RecordQuery {
    /// Whether `record` satisfies this filter.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::Below { field, threshold } => parse_metric(record.field(field)) < *threshold,
            Self::AssignedTo { field, code } => match record.field(field) {
                Some(FieldValue::Users(users)) => {
                    users.iter().any(|user| &user.code == code)
                }
                _ => false,
            },
        }
    }
}

/// Outcome of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalUpdate {
    /// Every expected field matched and the write was applied.
    Applied,
    /// At least one expected field differed; nothing was written.
    Conflict,
    /// The store cannot perform conditional writes.
    Unsupported,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Remote work-item store.
#[async_trait]
pub trait WorkItemStore: Send + Sync {
    /// Records of `app` matching `filter`, in store order.
    ///
    /// A non-empty `fields` projects every record to those field codes.
    async fn query(
        &self,
        app: &AppId,
        filter: &RecordQuery,
        fields: &[String],
    ) -> Result<Vec<Record>, AssignwiseError>;

    async fn get_by_id(&self, app: &AppId, id: &RecordId) -> Result<Record, AssignwiseError>;

    async fn update(
        &self,
        app: &AppId,
        id: &RecordId,
        fields: FieldMap,
    ) -> Result<(), AssignwiseError>;

    /// Write `fields` only if every field in `expected` still holds the
    /// given value.
    async fn update_if(
        &self,
        _app: &AppId,
        _id: &RecordId,
        _expected: &FieldMap,
        _fields: FieldMap,
    ) -> Result<ConditionalUpdate, AssignwiseError> {
        Ok(ConditionalUpdate::Unsupported)
    }

    async fn process_definition(&self, app: &AppId) -> Result<ProcessGraph, AssignwiseError>;

    /// Run `action` on the record and hand it to `assignee`.
    async fn transition(
        &self,
        app: &AppId,
        id: &RecordId,
        action: &str,
        assignee: &CandidateId,
    ) -> Result<(), AssignwiseError>;
}

/// Keep only `fields` of `record`. An empty projection keeps everything.
pub(crate) fn project(mut record: Record, fields: &[String]) -> Record {
    if !fields.is_empty() {
        record.fields.retain(|code, _| fields.contains(code));
    }
    record
}

// =============================================================================
// TESTS
// =============================================================================
