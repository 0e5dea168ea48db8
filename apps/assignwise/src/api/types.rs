//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use crate::engine::Proposal;
use assignwise_core::{
    AssignwiseError, Candidate, CandidatePool, RankStep, TransitionAction,
    primitives::{MAX_FIELD_CODE_LENGTH, MAX_POOL_SIZE},
};
use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// PROCESS RESPONSE
// =============================================================================

/// Where a work item sits in its workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub record_id: String,
    pub stage: Option<String>,
    pub stages: Vec<String>,
    pub initial_stage: Option<String>,
    pub terminal_stage: Option<String>,
    /// Present only while the item is in the initial stage.
    pub assign_action: Option<String>,
}

// =============================================================================
// SUGGEST REQUEST/RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub record_id: String,
}

/// A ranked proposal. Send `pool` back unchanged in [`AssignRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub record_id: String,
    pub action: TransitionAction,
    pub candidates: Vec<Candidate>,
    pub tie: bool,
    pub steps: Vec<RankStep>,
    pub pool: CandidatePool,
}

impl From<Proposal> for SuggestResponse {
    fn from(proposal: Proposal) -> Self {
        Self {
            record_id: proposal.record_id.as_str().to_string(),
            action: proposal.action,
            tie: proposal.selection.is_tie(),
            candidates: proposal.selection.candidates().to_vec(),
            steps: proposal.steps,
            pool: proposal.pool,
        }
    }
}

// =============================================================================
// ASSIGN REQUEST
// =============================================================================

/// Commit request. `pool` is the one returned by `/suggest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub record_id: String,
    pub assignee: String,
    pub pool: CandidatePool,
}

impl AssignRequest {
    /// Reject empty identifiers and oversized pools.
    pub fn validate(&self) -> Result<(), ApiError> {
        require_code("record_id", &self.record_id)?;
        require_code("assignee", &self.assignee)?;
        if self.pool.len() > MAX_POOL_SIZE {
            return Err(ApiError::BadRequest(format!(
                "pool exceeds {} candidates",
                MAX_POOL_SIZE
            )));
        }
        Ok(())
    }
}

// =============================================================================
// PROCEED REQUEST
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceedRequest {
    pub record_id: String,
    pub next_stage: String,
}

impl ProceedRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        require_code("record_id", &self.record_id)?;
        require_code("next_stage", &self.next_stage)
    }
}

// =============================================================================
// BUSINESS DAYS REQUEST/RESPONSE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessDaysRequest {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessDaysResponse {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub business_days: i64,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request: malformed input or an engine error.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Engine(AssignwiseError),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Engine(e) => match e {
                AssignwiseError::StaleData { .. } | AssignwiseError::NotInInitialStage(_) => {
                    StatusCode::CONFLICT
                }
                AssignwiseError::NoCandidate | AssignwiseError::RecordNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                AssignwiseError::InvalidPick(_) | AssignwiseError::StageNotFound(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                AssignwiseError::InvalidDate(_) => StatusCode::BAD_REQUEST,
                e if e.is_remote() => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<AssignwiseError> for ApiError {
    fn from(e: AssignwiseError) -> Self {
        Self::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let error = match self {
            Self::BadRequest(message) => message,
            Self::Engine(e) => {
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", e);
                }
                e.to_string()
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

fn require_code(name: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", name)));
    }
    if value.len() > MAX_FIELD_CODE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "{} exceeds {} bytes",
            name, MAX_FIELD_CODE_LENGTH
        )));
    }
    Ok(())
}
