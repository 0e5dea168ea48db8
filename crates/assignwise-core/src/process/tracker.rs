//! # Process Stage Tracker
//!
//! A classifier over a work item's workflow: given the process definition,
//! decide whether a stage offers the assign action and what a "proceed"
//! into the next stage must trigger.
//!
//! ## Stage Order
//!
//! | Index | Role |
//! |-------|------|
//! | `"0"` | initial stage: ranking is offered through the assign action |
//! | `"1"` .. `"n-2"` | intermediate stages: optional entry timestamps |
//! | `"n-1"` | terminal stage: elapsed days + counter decrement |
//!
//! The tracker holds no memory of its own. Callers keep the
//! [`ProcessGraph`] in an explicit session value and rebuild the tracker
//! per event.

use crate::{AssignwiseError, primitives};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// PROCESS DEFINITION
// =============================================================================

/// A stage entry of the process definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Position in the workflow, as a decimal string.
    pub index: String,
}

/// A named action moving an item out of `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAction {
    pub name: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl TransitionAction {
    #[must_use]
    pub fn new(name: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Workflow metadata for one work-item type: stage name → index, plus the
/// transition actions. Read-only for the duration of an engine invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessGraph {
    pub states: BTreeMap<String, StageDefinition>,
    #[serde(default)]
    pub actions: Vec<TransitionAction>,
}

impl ProcessGraph {
    /// Build a linear workflow from stage names in order.
    #[must_use]
    pub fn linear<'a>(stages: impl IntoIterator<Item = &'a str>) -> Self {
        let states = stages
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    name.to_string(),
                    StageDefinition {
                        index: i.to_string(),
                    },
                )
            })
            .collect();
        Self {
            states,
            actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: TransitionAction) -> Self {
        self.actions.push(action);
        self
    }

    /// The stage whose index is `"0"`.
    #[must_use]
    pub fn initial_stage(&self) -> Option<&str> {
        self.stage_with_index("0")
    }

    /// The stage whose index equals the number of stages minus one.
    #[must_use]
    pub fn terminal_stage(&self) -> Option<&str> {
        let last = self.states.len().checked_sub(1)?;
        self.stage_with_index(&last.to_string())
    }

    fn stage_with_index(&self, index: &str) -> Option<&str> {
        self.states
            .iter()
            .find(|(_, def)| def.index == index)
            .map(|(name, _)| name.as_str())
    }

    /// The first action leaving the initial stage.
    #[must_use]
    pub fn assign_action(&self) -> Option<&TransitionAction> {
        let initial = self.initial_stage()?;
        self.actions.iter().find(|action| action.from == initial)
    }

    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.states.contains_key(stage)
    }

    /// Stage names sorted by numeric index.
    #[must_use]
    pub fn ordered_stages(&self) -> Vec<&str> {
        let mut stages: Vec<(usize, &str)> = self
            .states
            .iter()
            .map(|(name, def)| (def.index.parse().unwrap_or(usize::MAX), name.as_str()))
            .collect();
        stages.sort();
        stages.into_iter().map(|(_, name)| name).collect()
    }
}

// =============================================================================
// STAGE STAMPS
// =============================================================================

/// Intermediate stage whose entry date is recorded in `field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStamp {
    pub stage: String,
    pub field: String,
}

impl StageStamp {
    #[must_use]
    pub fn new(stage: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            field: field.into(),
        }
    }

    /// The stamps of the reference support workflow.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        primitives::DEFAULT_STAGE_STAMPS
            .iter()
            .map(|(stage, field)| Self::new(*stage, *field))
            .collect()
    }
}

// =============================================================================
// TRACKER
// =============================================================================

/// What showing an item in `current` should offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPlan<'a> {
    /// The item sits in the initial stage: offer ranking via this action.
    OfferAssignment(&'a TransitionAction),
    /// Nothing to offer.
    Idle,
}

/// What a proceed into `next` must trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProceedPlan<'a> {
    /// Not terminal; stamp the entry date if a stamp is configured.
    Intermediate { stamp: Option<&'a StageStamp> },
    /// Terminal: compute elapsed business days, then decrement the assignee.
    Terminal,
}

/// Stateless classifier over a [`ProcessGraph`].
#[derive(Debug, Clone, Copy)]
pub struct StageTracker<'a> {
    graph: &'a ProcessGraph,
    stamps: &'a [StageStamp],
}

impl<'a> StageTracker<'a> {
    #[must_use]
    pub fn new(graph: &'a ProcessGraph, stamps: &'a [StageStamp]) -> Self {
        Self { graph, stamps }
    }

    /// Classify an item currently displayed in `current`.
    ///
    /// A workflow with an initial stage but no action leaving it offers
    /// nothing.
    #[must_use]
    pub fn on_enter(&self, current: &str) -> EntryPlan<'a> {
        match (self.graph.initial_stage(), self.graph.assign_action()) {
            (Some(initial), Some(action)) if initial == current => {
                EntryPlan::OfferAssignment(action)
            }
            _ => EntryPlan::Idle,
        }
    }

    /// Classify a proceed event into `next`.
    #[must_use]
    pub fn on_proceed(&self, next: &str) -> ProceedPlan<'a> {
        if self.graph.terminal_stage() == Some(next) {
            return ProceedPlan::Terminal;
        }
        ProceedPlan::Intermediate {
            stamp: self.stamps.iter().find(|stamp| stamp.stage == next),
        }
    }

    /// Like [`Self::on_proceed`], but rejects a stage the workflow does not
    /// define.
    pub fn on_proceed_checked(&self, next: &str) -> Result<ProceedPlan<'a>, AssignwiseError> {
        if !self.graph.contains(next) {
            return Err(AssignwiseError::StageNotFound(next.to_string()));
        }
        Ok(self.on_proceed(next))
    }
}

// =============================================================================
// TESTS
// =============================================================================
