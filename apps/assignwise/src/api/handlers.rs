//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ApiError, AssignRequest, BusinessDaysRequest, BusinessDaysResponse, HealthResponse,
        ProceedRequest, ProcessResponse, SuggestRequest, SuggestResponse,
    },
};
use crate::engine::{Assignment, ProceedOutcome};
use assignwise_core::{CandidateId, RecordId, business_days_between, parse_iso_date};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// PROCESS HANDLER
// =============================================================================

/// Stage classification of a work item.
pub async fn process_handler(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let session = state.engine.open_session(&RecordId::new(record_id)).await?;
    let graph = &session.graph;

    Ok(Json(ProcessResponse {
        record_id: session.record.id.as_str().to_string(),
        stage: session.stage().map(str::to_string),
        stages: graph.ordered_stages().into_iter().map(str::to_string).collect(),
        initial_stage: graph.initial_stage().map(str::to_string),
        terminal_stage: graph.terminal_stage().map(str::to_string),
        assign_action: session.assign_action().map(|action| action.name.clone()),
    }))
}

// =============================================================================
// SUGGEST HANDLER
// =============================================================================

/// Rank candidates for a work item in its initial stage.
pub async fn suggest_handler(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let session = state
        .engine
        .open_session(&RecordId::new(request.record_id))
        .await?;
    let proposal = state.engine.propose(&session).await?;
    Ok(Json(proposal.into()))
}

// =============================================================================
// ASSIGN HANDLER
// =============================================================================

/// Commit an assignment against the pool returned by `/suggest`.
pub async fn assign_handler(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Assignment>, ApiError> {
    request.validate()?;

    let session = state
        .engine
        .open_session(&RecordId::new(request.record_id))
        .await?;
    let proposal = state.engine.proposal_from_pool(&session, request.pool)?;
    let assignment = state
        .engine
        .commit(&session, &proposal, &CandidateId::new(request.assignee))
        .await?;
    Ok(Json(assignment))
}

// =============================================================================
// PROCEED HANDLER
// =============================================================================

/// Handle a work item entering `next_stage`.
pub async fn proceed_handler(
    State(state): State<AppState>,
    Json(request): Json<ProceedRequest>,
) -> Result<Json<ProceedOutcome>, ApiError> {
    request.validate()?;

    let session = state
        .engine
        .open_session(&RecordId::new(request.record_id))
        .await?;
    let outcome = state.engine.on_proceed(&session, &request.next_stage).await?;
    Ok(Json(outcome))
}

// =============================================================================
// BUSINESS DAYS HANDLER
// =============================================================================

/// Business days between two ISO dates, both inclusive.
pub async fn business_days_handler(
    Json(request): Json<BusinessDaysRequest>,
) -> Result<Json<BusinessDaysResponse>, ApiError> {
    let start = parse_iso_date(&request.start)?;
    let end = parse_iso_date(&request.end)?;
    Ok(Json(BusinessDaysResponse {
        start,
        end,
        business_days: business_days_between(start, end),
    }))
}
