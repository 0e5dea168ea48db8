//! End-to-end tests of the store-backed CLI commands.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use assignwise::cli::{Workspace, cmd_proceed, cmd_resubmit, cmd_suggest};
use assignwise::{InMemoryStore, WorkItemStore};
use assignwise_core::{AppId, AssignwiseError, CandidateId, FieldValue, RecordId};
use std::path::{Path, PathBuf};

const CONFIG: &str = r#"
reference_app = "42"
source_app = "7"
assignee_field = "Assignee"
counter_field = "Open_Tickets"
threshold = 5.0

[[priority]]
field = "Open_Tickets"
rank = 1
direction = "lth"
"#;

const STORE: &str = r#"{
  "apps": {
    "42": {
      "records": [
        {"id": "1", "fields": {"Assignee": [{"code": "alice", "name": "Alice"}], "Open_Tickets": "2"}},
        {"id": "2", "fields": {"Assignee": [{"code": "bob", "name": "Bob"}], "Open_Tickets": "1"}}
      ]
    },
    "7": {
      "process": {
        "states": {
          "Unassigned": {"index": "0"},
          "In Progress": {"index": "1"},
          "Resolved": {"index": "2"}
        },
        "actions": [{"name": "Assign", "from": "Unassigned", "to": "In Progress"}]
      },
      "records": [
        {"id": "12", "status": "Unassigned", "fields": {"In_Progress_Deadline_Final": "2024-02-01"}}
      ]
    }
  }
}"#;

fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let config = dir.join("assignwise.toml");
    let store = dir.join("store.json");
    std::fs::write(&config, CONFIG).unwrap();
    std::fs::write(&store, STORE).unwrap();
    (config, store)
}

async fn open(config: &Path, store: &Path) -> Workspace {
    Workspace::open(Some(config.to_path_buf()), store.to_path_buf(), true, true)
        .await
        .unwrap()
}

async fn persisted_load(store: &Path, id: &str) -> Option<FieldValue> {
    InMemoryStore::load(store)
        .await
        .unwrap()
        .get_by_id(&AppId::new("42"), &RecordId::new(id))
        .await
        .unwrap()
        .field("Open_Tickets")
        .cloned()
}

#[tokio::test]
async fn test_suggest_without_confirm_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = write_fixture(dir.path());
    let workspace = open(&config, &store).await;

    cmd_suggest(&workspace, &RecordId::new("12"), false, None)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&store).unwrap(), STORE);
}

#[tokio::test]
async fn test_full_lifecycle_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = write_fixture(dir.path());

    let workspace = open(&config, &store).await;
    cmd_suggest(&workspace, &RecordId::new("12"), true, None)
        .await
        .unwrap();
    assert_eq!(persisted_load(&store, "2").await, Some(FieldValue::Number(2.0)));

    let workspace = open(&config, &store).await;
    cmd_resubmit(&workspace, &RecordId::new("12")).await.unwrap();
    cmd_proceed(&workspace, &RecordId::new("12"), "Resolved")
        .await
        .unwrap();
    assert_eq!(persisted_load(&store, "2").await, Some(FieldValue::Number(1.0)));
    assert_eq!(persisted_load(&store, "1").await, Some(FieldValue::from("2")));
}

#[tokio::test]
async fn test_pick_outside_selection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = write_fixture(dir.path());
    let workspace = open(&config, &store).await;

    let result = cmd_suggest(
        &workspace,
        &RecordId::new("12"),
        true,
        Some(CandidateId::new("alice")),
    )
    .await;

    assert!(matches!(result, Err(AssignwiseError::InvalidPick(_))));
    assert_eq!(persisted_load(&store, "1").await, Some(FieldValue::from("2")));
}

#[tokio::test]
async fn test_failed_proceed_keeps_earlier_writes() {
    let dir = tempfile::tempdir().unwrap();
    let (config, store) = write_fixture(dir.path());
    // Assignee with no reference record: the decrement fails after the stamp.
    let orphaned = STORE.replace(
        r#""fields": {"In_Progress_Deadline_Final": "2024-02-01"}"#,
        r#""fields": {"Assignment_Date": "2024-01-05", "Dedicated_Assignee": [{"code": "zed", "name": "Zed"}]}"#,
    );
    std::fs::write(&store, &orphaned).unwrap();
    let workspace = open(&config, &store).await;

    let result = cmd_proceed(&workspace, &RecordId::new("12"), "Resolved").await;

    assert!(matches!(result, Err(AssignwiseError::RecordNotFound(_))));
    let persisted = InMemoryStore::load(&store)
        .await
        .unwrap()
        .get_by_id(&AppId::new("7"), &RecordId::new("12"))
        .await
        .unwrap();
    assert!(persisted.has_field("Resolved_Actual"));
    assert!(persisted.has_field("Days_Taken"));
}

#[tokio::test]
async fn test_missing_config_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let (_config, store) = write_fixture(dir.path());

    let result = Workspace::open(Some(dir.path().join("absent.toml")), store, true, true).await;

    assert!(result.is_err());
}
