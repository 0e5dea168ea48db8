//! # In-Memory Store
//!
//! A [`WorkItemStore`] held in memory behind a `tokio::sync::RwLock`, with a
//! JSON snapshot on disk for the CLI. Supports conditional updates, so the
//! workload counter runs its compare-and-swap path against it.
//!
//! Transitions follow the app's process definition: the action must leave
//! the record's current stage. The new assignee is written to the
//! [`PROCESS_ASSIGNEE_FIELD`] of the record.

use super::{ConditionalUpdate, RecordQuery, WorkItemStore, project};
use assignwise_core::{
    AppId, AssignwiseError, CandidateId, FieldMap, FieldValue, ProcessGraph, Record, RecordId,
    UserRef,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;

/// Field receiving the assignee of the last transition.
pub const PROCESS_ASSIGNEE_FIELD: &str = "Process_Assignee";

/// Maximum snapshot file size accepted by [`InMemoryStore::load`] (64 MB).
const MAX_SNAPSHOT_FILE_SIZE: u64 = 64 * 1024 * 1024;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Records and workflow of one app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSnapshot {
    #[serde(default)]
    pub process: ProcessGraph,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// Serializable content of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub apps: BTreeMap<AppId, AppSnapshot>,
}

impl StoreSnapshot {
    #[must_use]
    pub fn with_app(mut self, app: AppId, snapshot: AppSnapshot) -> Self {
        self.apps.insert(app, snapshot);
        self
    }

    fn app(&self, app: &AppId) -> Result<&AppSnapshot, AssignwiseError> {
        self.apps
            .get(app)
            .ok_or_else(|| AssignwiseError::RemoteOperation(format!("Unknown app {}", app.as_str())))
    }

    fn record_mut(&mut self, app: &AppId, id: &RecordId) -> Result<&mut Record, AssignwiseError> {
        self.apps
            .get_mut(app)
            .ok_or_else(|| AssignwiseError::RemoteOperation(format!("Unknown app {}", app.as_str())))?
            .records
            .iter_mut()
            .find(|record| &record.id == id)
            .ok_or_else(|| AssignwiseError::RecordNotFound(id.to_string()))
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Store backed by a [`StoreSnapshot`] in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// Load a JSON snapshot from `path`.
    pub async fn load(path: &Path) -> Result<Self, AssignwiseError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| AssignwiseError::IoError(format!("Cannot read store metadata: {}", e)))?;
        if metadata.len() > MAX_SNAPSHOT_FILE_SIZE {
            return Err(AssignwiseError::SerializationError(format!(
                "Store file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_SNAPSHOT_FILE_SIZE
            )));
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AssignwiseError::IoError(format!("Cannot read store file: {}", e)))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)
            .map_err(|e| AssignwiseError::SerializationError(format!("Invalid store file: {}", e)))?;

        tracing::debug!(apps = snapshot.apps.len(), "Loaded store snapshot");
        Ok(Self::new(snapshot))
    }

    /// Write the current content to `path` as pretty JSON.
    pub async fn save(&self, path: &Path) -> Result<(), AssignwiseError> {
        let content = serde_json::to_string_pretty(&*self.state.read().await)
            .map_err(|e| AssignwiseError::SerializationError(e.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| AssignwiseError::IoError(format!("Cannot write store file: {}", e)))
    }

    /// Copy of the current content.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl WorkItemStore for InMemoryStore {
    async fn query(
        &self,
        app: &AppId,
        filter: &RecordQuery,
        fields: &[String],
    ) -> Result<Vec<Record>, AssignwiseError> {
        let state = self.state.read().await;
        Ok(state
            .app(app)?
            .records
            .iter()
            .filter(|record| filter.matches(record))
            .map(|record| project(record.clone(), fields))
            .collect())
    }

    async fn get_by_id(&self, app: &AppId, id: &RecordId) -> Result<Record, AssignwiseError> {
        let state = self.state.read().await;
        state
            .app(app)?
            .records
            .iter()
            .find(|record| &record.id == id)
            .cloned()
            .ok_or_else(|| AssignwiseError::RecordNotFound(id.to_string()))
    }

    async fn update(
        &self,
        app: &AppId,
        id: &RecordId,
        fields: FieldMap,
    ) -> Result<(), AssignwiseError> {
        let mut state = self.state.write().await;
        state.record_mut(app, id)?.fields.extend(fields);
        Ok(())
    }

    async fn update_if(
        &self,
        app: &AppId,
        id: &RecordId,
        expected: &FieldMap,
        fields: FieldMap,
    ) -> Result<ConditionalUpdate, AssignwiseError> {
        let mut state = self.state.write().await;
        let record = state.record_mut(app, id)?;

        let unchanged = expected
            .iter()
            .all(|(code, value)| record.field(code).unwrap_or(&FieldValue::Empty) == value);
        if !unchanged {
            return Ok(ConditionalUpdate::Conflict);
        }

        record.fields.extend(fields);
        Ok(ConditionalUpdate::Applied)
    }

    async fn process_definition(&self, app: &AppId) -> Result<ProcessGraph, AssignwiseError> {
        Ok(self.state.read().await.app(app)?.process.clone())
    }

    async fn transition(
        &self,
        app: &AppId,
        id: &RecordId,
        action: &str,
        assignee: &CandidateId,
    ) -> Result<(), AssignwiseError> {
        let mut state = self.state.write().await;
        let process = state.app(app)?.process.clone();
        let record = state.record_mut(app, id)?;
        let current = record.status.clone().unwrap_or_default();

        let step = process
            .actions
            .iter()
            .find(|candidate| candidate.name == action && candidate.from == current)
            .ok_or_else(|| {
                AssignwiseError::RemoteOperation(format!(
                    "Action {} is not available from stage {:?}",
                    action, current
                ))
            })?;

        if !step.to.is_empty() {
            record.status = Some(step.to.clone());
        }
        record.fields.insert(
            PROCESS_ASSIGNEE_FIELD.to_string(),
            FieldValue::Users(vec![UserRef::new(assignee.as_str(), assignee.as_str())]),
        );
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
