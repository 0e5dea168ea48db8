//! # assignwise-core
//!
//! The deterministic logic of the workload-balanced assignment engine.
//!
//! ## Components
//!
//! - `calendar`: elapsed business days between two calendar dates
//! - `ranking`: cascading multi-criteria candidate selection
//! - `staleness`: pool drift detection between selection and commit
//! - `counter`: strict load-counter parsing and the ±1 step
//! - `process`: workflow definition and stage classification
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no clock: the app crate feeds every remote read
//!   in as a value and carries every write out
//! - Deterministic: `BTreeMap` ordering, no randomness
//! - Every fallible operation returns `Result<T, AssignwiseError>`

// =============================================================================
// MODULES
// =============================================================================

pub mod calendar;
pub mod counter;
pub mod primitives;
pub mod process;
pub mod ranking;
pub mod staleness;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AppId, AssignwiseError, Candidate, CandidateId, CandidatePool, Direction, FieldMap,
    FieldValue, PriorityRule, Record, RecordId, SelectionResult, UserRef,
};

// =============================================================================
// RE-EXPORTS: Engine Components
// =============================================================================

pub use calendar::{business_days_between, format_iso_date, parse_iso_date};
pub use counter::{CounterChange, CounterStep, parse_counter_value};
pub use process::{
    EntryPlan, ProceedPlan, ProcessGraph, StageDefinition, StageStamp, StageTracker,
    TransitionAction,
};
pub use ranking::{RankStep, parse_metric, rank, rank_explained};
pub use staleness::{PoolDrift, PoolFingerprint, StalenessCheck, detect_drift, sum_changed};
