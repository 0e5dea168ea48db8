//! # assignwise
//!
//! Workload-balanced assignment of work items to candidates.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                  apps/assignwise (THE BINARY)                 │
//! │                                                               │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐    │
//! │   │    CLI      │    │  HTTP API   │    │  JSON snapshot │    │
//! │   │   (clap)    │    │   (axum)    │    │     store      │    │
//! │   └──────┬──────┘    └──────┬──────┘    └───────┬────────┘    │
//! │          └──────────────────┼───────────────────┘             │
//! │                             ▼                                 │
//! │                   ┌───────────────────┐                       │
//! │                   │ AssignmentEngine  │                       │
//! │                   └─────────┬─────────┘                       │
//! │                             ▼                                 │
//! │                   ┌───────────────────┐                       │
//! │                   │  assignwise-core  │                       │
//! │                   │   (THE LOGIC)     │                       │
//! │                   └───────────────────┘                       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Suggest and commit an assignee for work item 12
//! assignwise --store store.json suggest --record 12 --yes
//!
//! # Proceed work item 12 into "Resolved"
//! assignwise --store store.json proceed --record 12 --next Resolved
//!
//! # Start the HTTP server
//! assignwise --store store.json server --host 0.0.0.0 --port 8080
//! ```

use assignwise::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // ASSIGNWISE_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("ASSIGNWISE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "assignwise=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
