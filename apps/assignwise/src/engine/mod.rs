//! # Assignment Engine
//!
//! Orchestrates one invocation against the work-item store:
//!
//! ```text
//! open_session ─► propose ─► review ─► verify_pool ─► increment ─► transition ─► update item
//!                  (rank)    (human)   (staleness)    (counter)    (assign)       (date, assignee,
//!                                                                                  deadlines)
//! ```
//!
//! Steps run strictly in that order and the first error aborts the rest.
//! Remote writes that already happened are not rolled back.
//!
//! Proceed and edit-submit events of the same item reuse the
//! [`WorkflowSession`] opened for it.

mod session;

pub use session::{Assignment, ProceedOutcome, Proposal, SubmitOutcome, WorkflowSession};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::counter::WorkloadCounter;
use crate::interaction::{Decision, Interaction, Notice, TriggerGuard};
use crate::store::{RecordQuery, WorkItemStore};
use assignwise_core::{
    AssignwiseError, Candidate, CandidateId, CandidatePool, FieldMap, FieldValue, PoolFingerprint,
    ProceedPlan, Record, RecordId, StageTracker, UserRef, business_days_between, detect_drift,
    format_iso_date, parse_iso_date, primitives::MAX_POOL_SIZE, rank_explained, sum_changed,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Workload-balanced assignment over a [`WorkItemStore`].
pub struct AssignmentEngine<S: ?Sized, C = SystemClock> {
    store: Arc<S>,
    config: EngineConfig,
    counter: WorkloadCounter<S>,
    clock: C,
}

impl<S: WorkItemStore + ?Sized> AssignmentEngine<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: WorkItemStore + ?Sized, C: Clock> AssignmentEngine<S, C> {
    #[must_use]
    pub fn with_clock(store: Arc<S>, config: EngineConfig, clock: C) -> Self {
        let counter = WorkloadCounter::new(
            Arc::clone(&store),
            config.reference_app.clone(),
            config.assignee_field.clone(),
            config.counter_field.clone(),
            config.max_cas_attempts,
        );
        Self {
            store,
            config,
            counter,
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn counter(&self) -> &WorkloadCounter<S> {
        &self.counter
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Load a work item and its app's process definition.
    pub async fn open_session(
        &self,
        record_id: &RecordId,
    ) -> Result<WorkflowSession, AssignwiseError> {
        let app = &self.config.source_app;
        let record = self.store.get_by_id(app, record_id).await?;
        let graph = self.store.process_definition(app).await?;
        Ok(WorkflowSession::new(record, graph))
    }

    // =========================================================================
    // RANKING
    // =========================================================================

    /// Query the reference app for candidates below the threshold.
    pub async fn build_pool(&self) -> Result<CandidatePool, AssignwiseError> {
        let filter = RecordQuery::Below {
            field: self.config.counter_field.clone(),
            threshold: self.config.threshold,
        };
        let records = self
            .store
            .query(
                &self.config.reference_app,
                &filter,
                &self.config.projected_fields(),
            )
            .await?;

        if records.len() > MAX_POOL_SIZE {
            return Err(AssignwiseError::RemoteOperation(format!(
                "Candidate query returned {} records, limit is {}",
                records.len(),
                MAX_POOL_SIZE
            )));
        }

        let keys = self.config.metric_keys();
        records
            .iter()
            .map(|record| {
                Candidate::from_record(record, &self.config.assignee_field, keys.iter().copied())
            })
            .collect()
    }

    /// Rank a fresh pool for an item in its initial stage.
    pub async fn propose(&self, session: &WorkflowSession) -> Result<Proposal, AssignwiseError> {
        if session.assign_action().is_none() {
            return Err(AssignwiseError::NotInInitialStage(session.record.id.clone()));
        }
        let pool = self.build_pool().await?;
        self.proposal_from_pool(session, pool)
    }

    /// Rank a pool captured earlier. Ranking is deterministic, so the
    /// selection equals the one offered when `pool` was first ranked.
    pub fn proposal_from_pool(
        &self,
        session: &WorkflowSession,
        pool: CandidatePool,
    ) -> Result<Proposal, AssignwiseError> {
        let action = session
            .assign_action()
            .cloned()
            .ok_or_else(|| AssignwiseError::NotInInitialStage(session.record.id.clone()))?;
        if pool.is_empty() {
            return Err(AssignwiseError::NoCandidate);
        }

        let (selection, steps) = rank_explained(&pool, &self.config.priority);
        let fingerprint = PoolFingerprint::capture(&pool, self.config.metric_keys());
        tracing::info!(
            record = %session.record.id,
            pool = pool.len(),
            pool_digest = %fingerprint.digest_hex(),
            selected = selection.len(),
            tie = selection.is_tie(),
            "Candidates ranked"
        );

        Ok(Proposal {
            record_id: session.record.id.clone(),
            action,
            pool,
            selection,
            steps,
        })
    }

    // =========================================================================
    // STALENESS
    // =========================================================================

    /// Re-query the pool and compare counter sums only.
    ///
    /// Blind to redistributions that keep the sum constant.
    pub async fn has_pool_changed(
        &self,
        initial: &CandidatePool,
        counter_key: &str,
    ) -> Result<bool, AssignwiseError> {
        let current = self.build_pool().await?;
        Ok(sum_changed(initial, &current, counter_key))
    }

    /// Re-query the pool and apply the configured staleness check.
    pub async fn verify_pool(&self, initial: &CandidatePool) -> Result<(), AssignwiseError> {
        let current = self.build_pool().await?;
        let tracked = self.config.priority.iter().map(|rule| rule.field.as_str());

        match detect_drift(
            self.config.staleness_check,
            initial,
            &current,
            &self.config.counter_field,
            tracked,
        ) {
            None => Ok(()),
            Some(drift) => {
                tracing::warn!(
                    appeared = drift.appeared.len(),
                    vanished = drift.vanished.len(),
                    changed = drift.changed.len(),
                    "Candidate pool changed since selection"
                );
                Err(AssignwiseError::StaleData {
                    changed: drift.len().max(1),
                })
            }
        }
    }

    // =========================================================================
    // COMMIT
    // =========================================================================

    /// Assign the item to `chosen`.
    ///
    /// Staleness check, counter increment, transition and work-item update
    /// run in that order; the first failure stops the sequence.
    pub async fn commit(
        &self,
        session: &WorkflowSession,
        proposal: &Proposal,
        chosen: &CandidateId,
    ) -> Result<Assignment, AssignwiseError> {
        let assignee = proposal
            .selection
            .find(chosen)
            .cloned()
            .ok_or_else(|| AssignwiseError::InvalidPick(chosen.clone()))?;

        self.verify_pool(&proposal.pool).await?;

        let counter = self.counter.increment(chosen).await?;
        let app = &self.config.source_app;
        let record_id = &session.record.id;
        self.store
            .transition(app, record_id, &proposal.action.name, chosen)
            .await?;

        let work_item = &self.config.work_item;
        let today = self.clock.today();
        let mut fields = FieldMap::new();
        fields.insert(
            work_item.assignment_date_field.clone(),
            FieldValue::Text(format_iso_date(today)),
        );
        fields.insert(
            work_item.assignee_field.clone(),
            FieldValue::Users(vec![UserRef::new(chosen.as_str(), assignee.name.as_str())]),
        );
        let mirrored = self.mirror_deadlines(&session.record, &mut fields);
        self.store.update(app, record_id, fields).await?;

        tracing::info!(record = %record_id, assignee = %chosen, "Work item assigned");
        Ok(Assignment {
            record_id: record_id.clone(),
            assignee,
            counter,
            assigned_on: today,
            mirrored,
        })
    }

    /// The interactive flow: rank, ask, commit, and report the outcome.
    ///
    /// The trigger stays disabled until this returns. `Ok(None)` means the
    /// user cancelled.
    pub async fn suggest_assignee<I: Interaction + ?Sized>(
        &self,
        session: &WorkflowSession,
        interaction: &I,
    ) -> Result<Option<Assignment>, AssignwiseError> {
        let _guard = TriggerGuard::engage(interaction);

        let outcome = match self.propose(session).await {
            Ok(proposal) => match interaction.review(&proposal).await {
                Decision::Cancel => Ok(None),
                Decision::Confirm(chosen) => self.commit(session, &proposal, &chosen).await.map(Some),
            },
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(Some(assignment)) => {
                interaction
                    .notify(Notice::Success(format!(
                        "{} for {} has been successfully {}!",
                        self.config.counter_field, assignment.assignee.name, assignment.counter.step
                    )))
                    .await;
            }
            Ok(None) => tracing::info!(record = %session.record.id, "Assignment cancelled"),
            Err(AssignwiseError::NoCandidate) => {
                interaction
                    .notify(Notice::Warning(
                        "No assignee candidate is available below the threshold.".to_string(),
                    ))
                    .await;
            }
            Err(AssignwiseError::StaleData { .. }) => {
                interaction
                    .notify(Notice::Warning(
                        "The assignee candidates have changed since you last checked. Please retry the process."
                            .to_string(),
                    ))
                    .await;
            }
            Err(e @ (AssignwiseError::InvalidPick(_) | AssignwiseError::NotInInitialStage(_))) => {
                interaction.notify(Notice::Warning(e.to_string())).await;
            }
            Err(e) => {
                tracing::error!("Assignment failed: {}", e);
                interaction
                    .notify(Notice::Failure(
                        "An error occurred while processing the request. If the problem persists, reload and retry."
                            .to_string(),
                    ))
                    .await;
            }
        }

        outcome
    }

    // =========================================================================
    // STAGE EVENTS
    // =========================================================================

    /// Handle a proceed of the session's item into `next_stage`.
    pub async fn on_proceed(
        &self,
        session: &WorkflowSession,
        next_stage: &str,
    ) -> Result<ProceedOutcome, AssignwiseError> {
        let tracker = StageTracker::new(&session.graph, &self.config.work_item.stage_stamps);

        match tracker.on_proceed_checked(next_stage)? {
            ProceedPlan::Intermediate { stamp: Some(stamp) }
                if session.record.has_field(&stamp.field) =>
            {
                let today = self.clock.today();
                let fields = FieldMap::from([(
                    stamp.field.clone(),
                    FieldValue::Text(format_iso_date(today)),
                )]);
                self.store
                    .update(&self.config.source_app, &session.record.id, fields)
                    .await?;
                Ok(ProceedOutcome::Stamped {
                    stage: next_stage.to_string(),
                    field: stamp.field.clone(),
                    date: today,
                })
            }
            ProceedPlan::Intermediate { .. } => Ok(ProceedOutcome::Passed {
                stage: next_stage.to_string(),
            }),
            ProceedPlan::Terminal => self.complete(session, next_stage).await,
        }
    }

    /// Terminal entry: stamp, store elapsed business days when the
    /// assignment date is known, then release the assignee's load.
    ///
    /// The decrement does not depend on the assignment date.
    async fn complete(
        &self,
        session: &WorkflowSession,
        stage: &str,
    ) -> Result<ProceedOutcome, AssignwiseError> {
        let work_item = &self.config.work_item;
        let record = &session.record;

        let assignee = record
            .field(&work_item.assignee_field)
            .and_then(FieldValue::first_user)
            .map(|user| CandidateId::new(&user.code))
            .ok_or_else(|| AssignwiseError::MalformedRecord {
                record: record.id.clone(),
                field: work_item.assignee_field.clone(),
            })?;

        let today = self.clock.today();
        let elapsed_days = optional_date(record, &work_item.assignment_date_field)
            .unwrap_or_else(|e| {
                tracing::warn!(record = %record.id, "Assignment date unreadable: {}", e);
                None
            })
            .map(|assigned_on| business_days_between(assigned_on, today));

        let mut fields = FieldMap::from([(
            work_item.terminal_stamp_field.clone(),
            FieldValue::Text(format_iso_date(today)),
        )]);
        match elapsed_days {
            Some(days) => {
                fields.insert(
                    work_item.elapsed_days_field.clone(),
                    FieldValue::Number(days as f64),
                );
            }
            None => tracing::warn!(
                record = %record.id,
                field = %work_item.assignment_date_field,
                "No assignment date, elapsed days not recorded"
            ),
        }
        self.store
            .update(&self.config.source_app, &record.id, fields)
            .await?;

        let counter = self.counter.decrement(&assignee).await?;
        tracing::info!(record = %record.id, ?elapsed_days, assignee = %assignee, "Work item completed");

        Ok(ProceedOutcome::Completed {
            stage: stage.to_string(),
            elapsed_days,
            counter,
        })
    }

    /// Recompute derived fields when a work item is saved: mirror
    /// deadlines and, once both dates exist, the elapsed business days.
    pub async fn on_edit_submit(
        &self,
        record_id: &RecordId,
    ) -> Result<SubmitOutcome, AssignwiseError> {
        let work_item = &self.config.work_item;
        let record = self
            .store
            .get_by_id(&self.config.source_app, record_id)
            .await?;

        let mut fields = FieldMap::new();
        let mirrored = self.mirror_deadlines(&record, &mut fields);

        let assigned_on = optional_date(&record, &work_item.assignment_date_field)?;
        let resolved_on = optional_date(&record, &work_item.terminal_stamp_field)?;
        let elapsed_days = match (assigned_on, resolved_on) {
            (Some(start), Some(end)) => Some(business_days_between(start, end)),
            _ => None,
        };
        if let Some(days) = elapsed_days {
            fields.insert(
                work_item.elapsed_days_field.clone(),
                FieldValue::Number(days as f64),
            );
        }

        if !fields.is_empty() {
            self.store
                .update(&self.config.source_app, record_id, fields)
                .await?;
        }
        Ok(SubmitOutcome {
            mirrored,
            elapsed_days,
        })
    }

    /// Copy each configured deadline source present on `record` into its
    /// target. Returns the targets written.
    fn mirror_deadlines(&self, record: &Record, fields: &mut FieldMap) -> Vec<String> {
        let mut mirrored = Vec::new();
        for mirror in &self.config.work_item.deadline_mirrors {
            if let Some(value) = record.field(&mirror.source) {
                fields.insert(mirror.target.clone(), value.clone());
                mirrored.push(mirror.target.clone());
            }
        }
        mirrored
    }
}

/// Date held in `field`, or `None` when the field is absent or blank.
fn optional_date(record: &Record, field: &str) -> Result<Option<NaiveDate>, AssignwiseError> {
    record
        .field(field)
        .and_then(FieldValue::as_text)
        .map(parse_iso_date)
        .transpose()
}
