//! # Interaction Surface
//!
//! The human side of an assignment: review a proposal, confirm or cancel,
//! pick among tied candidates, and receive notices.
//!
//! The triggering control is disabled while an operation is in flight.
//! This only prevents duplicate invocations from the same session; it is
//! not a lock.

use crate::engine::Proposal;
use assignwise_core::CandidateId;
use async_trait::async_trait;

/// The answer to a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Assign to this candidate. Must be a member of the selection.
    Confirm(CandidateId),
    Cancel,
}

/// An outcome shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    /// No candidate, stale pool: nothing was written.
    Warning(String),
    /// A remote call failed; earlier writes are not rolled back.
    Failure(String),
}

impl Notice {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Warning(m) | Self::Failure(m) => m,
        }
    }
}

/// Collaborator presenting proposals and notices.
#[async_trait]
pub trait Interaction: Send + Sync {
    async fn review(&self, proposal: &Proposal) -> Decision;

    async fn notify(&self, notice: Notice);

    fn set_trigger_enabled(&self, enabled: bool);
}

/// Disables the trigger on creation and re-enables it on drop.
pub struct TriggerGuard<'a, I: Interaction + ?Sized> {
    interaction: &'a I,
}

impl<'a, I: Interaction + ?Sized> TriggerGuard<'a, I> {
    pub fn engage(interaction: &'a I) -> Self {
        interaction.set_trigger_enabled(false);
        Self { interaction }
    }
}

impl<I: Interaction + ?Sized> Drop for TriggerGuard<'_, I> {
    fn drop(&mut self) {
        self.interaction.set_trigger_enabled(true);
    }
}

// =============================================================================
// CONSOLE
// =============================================================================

/// Terminal interaction for the CLI.
///
/// Prints the proposal and answers from flags instead of prompting:
/// without `confirm` every proposal is cancelled.
#[derive(Debug, Clone, Default)]
pub struct ConsoleInteraction {
    pub confirm: bool,
    /// Preferred candidate among ties; the first survivor otherwise.
    pub pick: Option<CandidateId>,
    pub quiet: bool,
}

#[async_trait]
impl Interaction for ConsoleInteraction {
    async fn review(&self, proposal: &Proposal) -> Decision {
        if !self.quiet {
            let title = match proposal.selection.winner() {
                Some(_) => "Best candidate found!",
                None => "Best candidates found! (with tie score)",
            };
            println!("{}", title);
            for candidate in proposal.selection.candidates() {
                println!("  {} ({})", candidate.name, candidate.id);
                for (key, value) in &candidate.metrics {
                    println!("      {:<24} {}", key, value);
                }
            }
        }

        if !self.confirm {
            return Decision::Cancel;
        }
        match (&self.pick, proposal.selection.first()) {
            (Some(pick), _) => Decision::Confirm(pick.clone()),
            (None, Some(first)) => Decision::Confirm(first.id.clone()),
            (None, None) => Decision::Cancel,
        }
    }

    async fn notify(&self, notice: Notice) {
        match &notice {
            Notice::Success(m) => tracing::info!("{}", m),
            Notice::Warning(m) => tracing::warn!("{}", m),
            Notice::Failure(m) => tracing::error!("{}", m),
        }
        if !self.quiet {
            println!("{}", notice.message());
        }
    }

    fn set_trigger_enabled(&self, enabled: bool) {
        tracing::debug!(enabled, "Suggest trigger toggled");
    }
}

// =============================================================================
// TESTS
// =============================================================================
