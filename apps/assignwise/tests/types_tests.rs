//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use assignwise::api::{
    ApiError, AssignRequest, BusinessDaysResponse, ErrorResponse, HealthResponse, ProceedRequest,
    SuggestRequest, SuggestResponse,
};
use assignwise_core::{
    AssignwiseError, Candidate, CandidateId, CandidatePool, RecordId, TransitionAction,
};
use axum::http::StatusCode;
use chrono::NaiveDate;

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_deserialization() {
    let json = r#"{"status":"healthy","version":"1.0.0"}"#;
    let health: HealthResponse = serde_json::from_str(json).unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, "1.0.0");
}

// =============================================================================
// REQUEST TESTS
// =============================================================================

#[test]
fn test_suggest_request_deserialization() {
    let request: SuggestRequest = serde_json::from_str(r#"{"record_id":"12"}"#).unwrap();
    assert_eq!(request.record_id, "12");
}

#[test]
fn test_assign_request_with_pool() {
    let json = r#"{
        "record_id": "12",
        "assignee": "alice",
        "pool": [{"id": "alice", "name": "Alice", "metrics": {"Open_Tickets": 1.0}}]
    }"#;
    let request: AssignRequest = serde_json::from_str(json).unwrap();

    assert_eq!(request.pool.len(), 1);
    assert!(request.validate().is_ok());
}

#[test]
fn test_assign_request_rejects_blank_and_oversized_codes() {
    let blank = AssignRequest {
        record_id: "12".to_string(),
        assignee: "  ".to_string(),
        pool: CandidatePool::default(),
    };
    assert!(matches!(blank.validate(), Err(ApiError::BadRequest(_))));

    let long = AssignRequest {
        record_id: "x".repeat(200),
        assignee: "alice".to_string(),
        pool: CandidatePool::default(),
    };
    assert!(matches!(long.validate(), Err(ApiError::BadRequest(_))));
}

#[test]
fn test_proceed_request_validation() {
    let request = ProceedRequest {
        record_id: "12".to_string(),
        next_stage: String::new(),
    };
    assert!(request.validate().is_err());
}

// =============================================================================
// RESPONSE TESTS
// =============================================================================

#[test]
fn test_suggest_response_serialization() {
    let response = SuggestResponse {
        record_id: "12".to_string(),
        action: TransitionAction::new("Assign", "Unassigned", "In Progress"),
        candidates: vec![Candidate::new(CandidateId::new("alice"), "Alice")],
        tie: false,
        steps: Vec::new(),
        pool: CandidatePool::default(),
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"record_id\":\"12\""));
    assert!(json.contains("\"tie\":false"));
    assert!(json.contains("\"name\":\"Assign\""));
}

#[test]
fn test_business_days_response_serialization() {
    let response = BusinessDaysResponse {
        start: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        business_days: 2,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"start\":\"2024-01-05\""));
    assert!(json.contains("\"business_days\":2"));
}

#[test]
fn test_error_response_roundtrip() {
    let json = r#"{"error":"No candidate available below the assignment threshold"}"#;
    let error: ErrorResponse = serde_json::from_str(json).unwrap();
    assert!(error.error.starts_with("No candidate"));
}

// =============================================================================
// STATUS MAPPING TESTS
// =============================================================================

#[test]
fn test_api_error_status_mapping() {
    let cases = [
        (
            AssignwiseError::StaleData { changed: 1 },
            StatusCode::CONFLICT,
        ),
        (
            AssignwiseError::NotInInitialStage(RecordId::new("12")),
            StatusCode::CONFLICT,
        ),
        (AssignwiseError::NoCandidate, StatusCode::NOT_FOUND),
        (
            AssignwiseError::RecordNotFound("999".to_string()),
            StatusCode::NOT_FOUND,
        ),
        (
            AssignwiseError::InvalidPick(CandidateId::new("x")),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            AssignwiseError::StageNotFound("Archived".to_string()),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            AssignwiseError::InvalidDate("2024-13-01".to_string()),
            StatusCode::BAD_REQUEST,
        ),
        (
            AssignwiseError::RemoteOperation("timeout".to_string()),
            StatusCode::BAD_GATEWAY,
        ),
        (
            AssignwiseError::IoError("disk".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, status) in cases {
        assert_eq!(ApiError::from(error).status(), status);
    }
    assert_eq!(
        ApiError::BadRequest("empty".to_string()).status(),
        StatusCode::BAD_REQUEST
    );
}
