//! # assignwise CLI Module
//!
//! This module implements the CLI interface for assignwise.
//!
//! ## Available Commands
//!
//! - `suggest` - Rank candidates for a work item and optionally assign
//! - `proceed` - Handle a work item moving into its next stage
//! - `resubmit` - Recompute derived fields after a work item edit
//! - `days` - Business days between two dates
//! - `process` - Show the source app's workflow
//! - `server` - Start the HTTP server

mod commands;

use assignwise_core::{AssignwiseError, CandidateId, RecordId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// assignwise - workload-balanced assignment engine
///
/// Suggests the least-loaded eligible assignee for a work item, keeps each
/// candidate's load counter current, and reports elapsed business days.
#[derive(Parser, Debug)]
#[command(name = "assignwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Engine configuration file (default: $ASSIGNWISE_CONFIG or assignwise.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON store snapshot to operate on
    #[arg(short = 'S', long, global = true, default_value = "assignwise-store.json")]
    pub store: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rank candidates for a work item in its initial stage
    Suggest {
        /// Work item record ID
        #[arg(short, long)]
        record: String,

        /// Commit the assignment instead of only showing the proposal
        #[arg(short, long)]
        yes: bool,

        /// Candidate code to pick among tied candidates
        #[arg(long)]
        pick: Option<String>,
    },

    /// Proceed a work item into its next stage
    Proceed {
        /// Work item record ID
        #[arg(short, long)]
        record: String,

        /// Destination stage name
        #[arg(short, long)]
        next: String,
    },

    /// Recompute deadlines and elapsed days after an edit
    Resubmit {
        /// Work item record ID
        #[arg(short, long)]
        record: String,
    },

    /// Business days between two ISO dates, both inclusive
    Days {
        /// Start date (YYYY-MM-DD)
        start: String,

        /// End date (YYYY-MM-DD)
        end: String,
    },

    /// Show the source app's workflow stages
    Process,

    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AssignwiseError> {
    let json_mode = cli.json_mode;
    let command = cli.command.unwrap_or(Commands::Process);

    if let Commands::Days { start, end } = &command {
        return cmd_days(start, end, json_mode);
    }

    let workspace = Workspace::open(cli.config, cli.store, json_mode, cli.quiet).await?;

    match command {
        Commands::Suggest { record, yes, pick } => {
            cmd_suggest(&workspace, &RecordId::new(record), yes, pick.map(CandidateId::new)).await
        }
        Commands::Proceed { record, next } => {
            cmd_proceed(&workspace, &RecordId::new(record), &next).await
        }
        Commands::Resubmit { record } => cmd_resubmit(&workspace, &RecordId::new(record)).await,
        Commands::Process => cmd_process(&workspace).await,
        Commands::Server { host, port } => cmd_server(workspace, &host, port).await,
        Commands::Days { start, end } => cmd_days(&start, &end, json_mode),
    }
}

// =============================================================================
// TESTS
// =============================================================================
