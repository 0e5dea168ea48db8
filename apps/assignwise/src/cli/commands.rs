//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::EngineConfig;
use crate::engine::{AssignmentEngine, ProceedOutcome};
use crate::interaction::ConsoleInteraction;
use crate::store::{InMemoryStore, WorkItemStore};
use assignwise_core::{
    AssignwiseError, CandidateId, RecordId, business_days_between, parse_iso_date,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// WORKSPACE
// =============================================================================

/// Engine, store and output settings shared by the store-backed commands.
pub struct Workspace {
    pub engine: AssignmentEngine<InMemoryStore>,
    pub store: Arc<InMemoryStore>,
    pub store_path: PathBuf,
    pub json_mode: bool,
    pub quiet: bool,
}

impl Workspace {
    /// Load the configuration and the store snapshot.
    pub async fn open(
        config: Option<PathBuf>,
        store_path: PathBuf,
        json_mode: bool,
        quiet: bool,
    ) -> Result<Self, AssignwiseError> {
        let config = EngineConfig::load(&EngineConfig::resolve_path(config))?;
        let store = Arc::new(InMemoryStore::load(&validate_file_path(&store_path)?).await?);
        Ok(Self {
            engine: AssignmentEngine::new(Arc::clone(&store), config),
            store,
            store_path,
            json_mode,
            quiet,
        })
    }

    /// Write the store back to its snapshot file.
    async fn persist(&self) -> Result<(), AssignwiseError> {
        self.store.save(&self.store_path).await?;
        tracing::debug!("Store saved to {}", self.store_path.display());
        Ok(())
    }

    /// Persist whatever a failed command already wrote, then hand back
    /// the original error.
    async fn keep_partial<T>(
        &self,
        result: Result<T, AssignwiseError>,
    ) -> Result<T, AssignwiseError> {
        if let Err(e) = &result {
            tracing::warn!("Command failed, saving partial writes: {}", e);
            self.persist().await?;
        }
        result
    }

    fn human(&self) -> bool {
        !self.json_mode && !self.quiet
    }
}

/// Canonicalize `path` and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AssignwiseError> {
    let canonical = path.canonicalize().map_err(|e| {
        AssignwiseError::IoError(format!("Invalid store path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(AssignwiseError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

fn print_json(value: &impl Serialize) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SUGGEST COMMAND
// =============================================================================

/// Rank candidates for a work item and, with `confirm`, assign.
pub async fn cmd_suggest(
    workspace: &Workspace,
    record: &RecordId,
    confirm: bool,
    pick: Option<CandidateId>,
) -> Result<(), AssignwiseError> {
    let session = workspace.engine.open_session(record).await?;
    let interaction = ConsoleInteraction {
        confirm,
        pick,
        quiet: !workspace.human(),
    };

    let assignment = workspace
        .keep_partial(
            workspace
                .engine
                .suggest_assignee(&session, &interaction)
                .await,
        )
        .await?;

    if let Some(assignment) = &assignment {
        workspace.persist().await?;
        if workspace.json_mode {
            print_json(assignment);
        }
    } else if workspace.json_mode {
        print_json(&serde_json::json!({ "record_id": record, "assigned": false }));
    } else if workspace.human() {
        println!("Not assigned. Re-run with --yes to commit.");
    }

    Ok(())
}

// =============================================================================
// PROCEED COMMAND
// =============================================================================

/// Handle a proceed of `record` into `next`.
pub async fn cmd_proceed(
    workspace: &Workspace,
    record: &RecordId,
    next: &str,
) -> Result<(), AssignwiseError> {
    let session = workspace.engine.open_session(record).await?;
    let outcome = workspace
        .keep_partial(workspace.engine.on_proceed(&session, next).await)
        .await?;
    workspace.persist().await?;

    if workspace.json_mode {
        print_json(&outcome);
    } else if workspace.human() {
        match &outcome {
            ProceedOutcome::Passed { stage } => {
                println!("Entered {}; nothing to record.", stage);
            }
            ProceedOutcome::Stamped { stage, field, date } => {
                println!("Entered {}; {} set to {}.", stage, field, date);
            }
            ProceedOutcome::Completed {
                stage,
                elapsed_days,
                counter,
            } => {
                match elapsed_days {
                    Some(days) => println!("Entered {} after {} business day(s).", stage, days),
                    None => println!("Entered {}; no assignment date on record.", stage),
                }
                println!(
                    "{} for {} has been successfully {}!",
                    counter.field, counter.candidate, counter.step
                );
            }
        }
    }

    Ok(())
}

// =============================================================================
// RESUBMIT COMMAND
// =============================================================================

/// Recompute mirrored deadlines and elapsed days of `record`.
pub async fn cmd_resubmit(workspace: &Workspace, record: &RecordId) -> Result<(), AssignwiseError> {
    let outcome = workspace
        .keep_partial(workspace.engine.on_edit_submit(record).await)
        .await?;
    workspace.persist().await?;

    if workspace.json_mode {
        print_json(&outcome);
    } else if workspace.human() {
        println!("Mirrored: {}", outcome.mirrored.join(", "));
        match outcome.elapsed_days {
            Some(days) => println!("Elapsed:  {} business day(s)", days),
            None => println!("Elapsed:  not resolved yet"),
        }
    }

    Ok(())
}

// =============================================================================
// DAYS COMMAND
// =============================================================================

/// Business days between two ISO dates.
pub fn cmd_days(start: &str, end: &str, json_mode: bool) -> Result<(), AssignwiseError> {
    let start_date = parse_iso_date(start)?;
    let end_date = parse_iso_date(end)?;
    let days = business_days_between(start_date, end_date);

    if json_mode {
        print_json(&serde_json::json!({
            "start": start_date,
            "end": end_date,
            "business_days": days
        }));
    } else {
        println!("{}", days);
    }
    Ok(())
}

// =============================================================================
// PROCESS COMMAND
// =============================================================================

/// Show the source app's workflow.
pub async fn cmd_process(workspace: &Workspace) -> Result<(), AssignwiseError> {
    let graph = workspace
        .store
        .process_definition(&workspace.engine.config().source_app)
        .await?;
    let assign_action = graph.assign_action().map(|action| action.name.as_str());

    if workspace.json_mode {
        print_json(&serde_json::json!({
            "stages": graph.ordered_stages(),
            "initial_stage": graph.initial_stage(),
            "terminal_stage": graph.terminal_stage(),
            "assign_action": assign_action
        }));
        return Ok(());
    }

    println!("Workflow");
    println!("========");
    for (index, stage) in graph.ordered_stages().iter().enumerate() {
        println!("  {:>2}. {}", index, stage);
    }
    println!();
    println!("Initial stage:  {}", graph.initial_stage().unwrap_or("-"));
    println!("Terminal stage: {}", graph.terminal_stage().unwrap_or("-"));
    println!("Assign action:  {}", assign_action.unwrap_or("-"));

    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server; the store is saved back on shutdown.
pub async fn cmd_server(workspace: Workspace, host: &str, port: u16) -> Result<(), AssignwiseError> {
    let config = workspace.engine.config().clone();
    let store: Arc<dyn WorkItemStore> = workspace.store.clone();
    let engine = AssignmentEngine::new(store, config);

    if workspace.human() {
        println!("assignwise server starting...");
        println!();
        println!("Configuration:");
        println!("  Host:  {}", host);
        println!("  Port:  {}", port);
        println!("  Store: {:?}", workspace.store_path);
        println!();
        println!("Endpoints:");
        println!("  GET  /health              - Health check");
        println!("  GET  /process/{{record}}    - Stage classification");
        println!("  POST /suggest             - Rank candidates");
        println!("  POST /assign              - Commit an assignment");
        println!("  POST /proceed             - Proceed into a stage");
        println!("  POST /business-days       - Business day count");
        println!();
        println!("Press Ctrl+C to stop");
        println!();
    }

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, engine).await?;
    workspace.persist().await
}

// =============================================================================
// TESTS
// =============================================================================
