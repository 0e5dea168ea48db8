//! # assignwise
//!
//! The async half of the workload-balanced assignment engine: store and
//! interaction collaborators, the assignment orchestration, configuration,
//! the CLI and the HTTP API.
//!
//! The deterministic logic lives in `assignwise-core`.

pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod counter;
pub mod engine;
pub mod interaction;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DeadlineMirror, EngineConfig, WorkItemFields};
pub use counter::{KeyGuard, KeyedLocks, WorkloadCounter};
pub use engine::{
    AssignmentEngine, Assignment, ProceedOutcome, Proposal, SubmitOutcome, WorkflowSession,
};
pub use interaction::{ConsoleInteraction, Decision, Interaction, Notice, TriggerGuard};
pub use store::{ConditionalUpdate, InMemoryStore, RecordQuery, StoreSnapshot, WorkItemStore};
