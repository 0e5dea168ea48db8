//! # Workload Counter
//!
//! Increment and decrement of a candidate's load counter on the reference
//! app.
//!
//! ## Write Paths
//!
//! | Store support | Path |
//! |---------------|------|
//! | `update_if` applied/conflict | compare-and-swap on the value read, retried up to `max_attempts` |
//! | `update_if` unsupported | read-modify-write under a per-candidate in-process lock |
//! | [`WorkloadCounter::adjust_unguarded`] | bare read-modify-write, open to lost updates |
//!
//! The keyed lock only serializes writers inside this process. Writers in
//! other processes can still interleave with it.

use crate::store::{ConditionalUpdate, RecordQuery, WorkItemStore};
use assignwise_core::{
    AppId, AssignwiseError, CandidateId, CounterChange, CounterStep, FieldMap, FieldValue, Record,
    parse_counter_value,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

// =============================================================================
// KEYED LOCKS
// =============================================================================

/// One async mutex per candidate, created on first use and dropped once
/// no caller holds or waits on it.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: std::sync::Mutex<BTreeMap<CandidateId, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &CandidateId) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        KeyGuard {
            locks: self,
            key: key.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Number of keys with a live lock.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one key of a [`KeyedLocks`].
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: CandidateId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release first so the map holds the last reference.
        self.guard.take();
        let mut locks = self.locks.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

// =============================================================================
// COUNTER
// =============================================================================

/// Load counter of the reference app.
pub struct WorkloadCounter<S: ?Sized> {
    store: Arc<S>,
    app: AppId,
    assignee_field: String,
    counter_field: String,
    max_attempts: u32,
    locks: KeyedLocks,
}

impl<S: WorkItemStore + ?Sized> WorkloadCounter<S> {
    #[must_use]
    pub fn new(
        store: Arc<S>,
        app: AppId,
        assignee_field: impl Into<String>,
        counter_field: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            app,
            assignee_field: assignee_field.into(),
            counter_field: counter_field.into(),
            max_attempts: max_attempts.max(1),
            locks: KeyedLocks::default(),
        }
    }

    #[must_use]
    pub fn counter_field(&self) -> &str {
        &self.counter_field
    }

    pub async fn increment(&self, candidate: &CandidateId) -> Result<CounterChange, AssignwiseError> {
        self.adjust(candidate, CounterStep::Increment).await
    }

    pub async fn decrement(&self, candidate: &CandidateId) -> Result<CounterChange, AssignwiseError> {
        self.adjust(candidate, CounterStep::Decrement).await
    }

    /// Apply `step` with the strongest guard the store offers.
    pub async fn adjust(
        &self,
        candidate: &CandidateId,
        step: CounterStep,
    ) -> Result<CounterChange, AssignwiseError> {
        for attempt in 1..=self.max_attempts {
            let (record, change) = self.read(candidate, step).await?;
            let raw = record.field(&self.counter_field).cloned().unwrap_or_default();
            let expected = FieldMap::from([(self.counter_field.clone(), raw)]);

            match self
                .store
                .update_if(&self.app, &record.id, &expected, self.write_fields(&change))
                .await?
            {
                ConditionalUpdate::Applied => {
                    tracing::info!(
                        candidate = %candidate,
                        previous = change.previous,
                        current = change.current,
                        "Counter {}",
                        step
                    );
                    return Ok(change);
                }
                ConditionalUpdate::Conflict => {
                    tracing::warn!(candidate = %candidate, attempt, "Counter changed concurrently, retrying");
                }
                ConditionalUpdate::Unsupported => return self.adjust_serialized(candidate, step).await,
            }
        }

        Err(AssignwiseError::CounterContention {
            candidate: candidate.clone(),
            attempts: self.max_attempts,
        })
    }

    /// Read-modify-write while holding the candidate's keyed lock.
    async fn adjust_serialized(
        &self,
        candidate: &CandidateId,
        step: CounterStep,
    ) -> Result<CounterChange, AssignwiseError> {
        let _guard = self.locks.acquire(candidate).await;
        self.adjust_unguarded(candidate, step).await
    }

    /// Read, step and write back with no guard at all.
    ///
    /// Two concurrent calls for the same candidate can both read the same
    /// value, and one of the two steps is then lost.
    pub async fn adjust_unguarded(
        &self,
        candidate: &CandidateId,
        step: CounterStep,
    ) -> Result<CounterChange, AssignwiseError> {
        let (record, change) = self.read(candidate, step).await?;
        self.store
            .update(&self.app, &record.id, self.write_fields(&change))
            .await?;
        tracing::info!(
            candidate = %candidate,
            previous = change.previous,
            current = change.current,
            "Counter {}",
            step
        );
        Ok(change)
    }

    /// Locate the candidate's reference record and plan the step.
    async fn read(
        &self,
        candidate: &CandidateId,
        step: CounterStep,
    ) -> Result<(Record, CounterChange), AssignwiseError> {
        let filter = RecordQuery::AssignedTo {
            field: self.assignee_field.clone(),
            code: candidate.as_str().to_string(),
        };
        let record = self
            .store
            .query(&self.app, &filter, &[])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AssignwiseError::RecordNotFound(candidate.to_string()))?;

        let previous =
            parse_counter_value(candidate, &self.counter_field, record.field(&self.counter_field))?;
        let change = CounterChange::plan(candidate.clone(), &self.counter_field, step, previous);
        Ok((record, change))
    }

    fn write_fields(&self, change: &CounterChange) -> FieldMap {
        FieldMap::from([(self.counter_field.clone(), FieldValue::Number(change.current))])
    }
}

// =============================================================================
// TESTS
// =============================================================================
