//! Per-item workflow context and the values the engine hands back.

use assignwise_core::{
    Candidate, CandidatePool, CounterChange, EntryPlan, ProcessGraph, RankStep, Record, RecordId,
    SelectionResult, StageTracker, TransitionAction,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// WORKFLOW SESSION
// =============================================================================

/// One work item together with the process definition of its app.
///
/// Loaded once when the item is opened and passed to every later stage
/// event of the same item.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSession {
    pub record: Record,
    pub graph: ProcessGraph,
}

impl WorkflowSession {
    #[must_use]
    pub fn new(record: Record, graph: ProcessGraph) -> Self {
        Self { record, graph }
    }

    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        self.record.status.as_deref()
    }

    /// The assign action, when the item sits in the initial stage.
    #[must_use]
    pub fn assign_action(&self) -> Option<&TransitionAction> {
        let stage = self.stage()?;
        match StageTracker::new(&self.graph, &[]).on_enter(stage) {
            EntryPlan::OfferAssignment(action) => Some(action),
            EntryPlan::Idle => None,
        }
    }
}

// =============================================================================
// ENGINE RESULTS
// =============================================================================

/// A ranked selection awaiting a decision.
///
/// `pool` is the snapshot the staleness check compares against at commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub record_id: RecordId,
    pub action: TransitionAction,
    pub pool: CandidatePool,
    pub selection: SelectionResult,
    pub steps: Vec<RankStep>,
}

/// A committed assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub record_id: RecordId,
    pub assignee: Candidate,
    pub counter: CounterChange,
    pub assigned_on: NaiveDate,
    /// Target fields filled from deadline sources.
    pub mirrored: Vec<String>,
}

/// What a proceed event did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProceedOutcome {
    /// Intermediate stage; nothing written.
    Passed { stage: String },
    /// Intermediate stage with its entry date recorded.
    Stamped {
        stage: String,
        field: String,
        date: NaiveDate,
    },
    /// Terminal stage: the assignee's load released. `elapsed_days` is
    /// `None` when the work item carried no assignment date.
    Completed {
        stage: String,
        elapsed_days: Option<i64>,
        counter: CounterChange,
    },
}

/// What an edit submit recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub mirrored: Vec<String>,
    pub elapsed_days: Option<i64>,
}
