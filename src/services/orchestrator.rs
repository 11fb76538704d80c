//! Sequential phase runner.
//!
//! Each phase goes through the status state machine: it is entered as
//! `running`, loads and verifies every entity, and ends `completed` or
//! `failed`. A failure is written to the status record and then returned to
//! the caller, which stops any remaining phases.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::MigratorConfig;
use crate::errors::MigrationError;
use crate::services::batch_writer::BatchWriter;
use crate::services::phases::PhaseName;
use crate::services::pipeline::{EntityReport, PipelineContext};
use crate::services::sequence::SequenceAllocator;
use crate::services::status::{PhaseState, RunCounters, StatusStore};
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub batch_size: u64,
    /// Skip a phase whose collections already hold documents.
    pub skip_existing: bool,
}

impl RunOptions {
    pub fn from_config(cfg: &MigratorConfig) -> Self {
        Self {
            batch_size: cfg.batch_size,
            skip_existing: cfg.skip_existing,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            skip_existing: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseOutcome {
    Completed,
    /// Already completed, or its collections were already populated
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: PhaseName,
    pub outcome: PhaseOutcome,
    pub entities: Vec<EntityReport>,
    pub duration_seconds: f64,
}

pub struct PhaseOrchestrator {
    source: DatabaseConnection,
    store: Arc<dyn DocumentStore>,
    status: StatusStore,
    ids: Arc<SequenceAllocator>,
    options: RunOptions,
}

impl PhaseOrchestrator {
    pub fn new(
        source: DatabaseConnection,
        store: Arc<dyn DocumentStore>,
        options: RunOptions,
    ) -> Self {
        Self {
            status: StatusStore::new(store.clone()),
            ids: Arc::new(SequenceAllocator::new(store.clone())),
            source,
            store,
            options,
        }
    }

    pub fn status(&self) -> &StatusStore {
        &self.status
    }

    pub fn ids(&self) -> &SequenceAllocator {
        &self.ids
    }

    fn details(
        phase: PhaseName,
        run_id: Uuid,
        skipped: bool,
        counters: &RunCounters,
        entities: &[EntityReport],
    ) -> Value {
        let tables: Vec<&str> = phase
            .pipelines()
            .iter()
            .flat_map(|p| p.source_tables())
            .collect();
        json!({
            "title": phase.title(),
            "run_id": run_id.to_string(),
            "tables": tables,
            "collections": phase.collections(),
            "skipped": skipped,
            "counters": counters,
            "entities": entities,
        })
    }

    /// Runs one phase to `completed`, or records why it failed and returns the error.
    #[instrument(skip(self), fields(title = phase.title()))]
    pub async fn run_phase(&self, phase: PhaseName) -> Result<PhaseReport, MigrationError> {
        let name = phase.to_string();
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        match self.status.state(&name).await? {
            PhaseState::Completed => {
                info!(phase = %name, "Phase already completed; skipping");
                return Ok(PhaseReport {
                    phase,
                    outcome: PhaseOutcome::Skipped,
                    entities: Vec::new(),
                    duration_seconds: 0.0,
                });
            }
            state @ (PhaseState::Running | PhaseState::Failed) => {
                return Err(MigrationError::ResetRequired {
                    phase: name,
                    state: state.to_string(),
                });
            }
            PhaseState::Pending => {}
        }

        if self.options.skip_existing && self.already_migrated(phase).await? {
            info!(phase = %name, "Target collections already populated; skipping phase");
            self.status
                .mark_running(&name, Self::details(phase, run_id, true, &RunCounters::default(), &[]))
                .await?;
            self.status
                .mark_completed(
                    &name,
                    RunCounters::default(),
                    started.elapsed(),
                    Self::details(phase, run_id, true, &RunCounters::default(), &[]),
                )
                .await?;
            counter!("migrator_phase.skipped", 1, "phase" => name);
            return Ok(PhaseReport {
                phase,
                outcome: PhaseOutcome::Skipped,
                entities: Vec::new(),
                duration_seconds: started.elapsed().as_secs_f64(),
            });
        }

        self.status
            .mark_running(&name, Self::details(phase, run_id, false, &RunCounters::default(), &[]))
            .await?;
        info!(phase = %name, run_id = %run_id, "Phase started");

        let mut entities = Vec::new();
        let mut counters = RunCounters::default();
        let result = self.load(phase, &mut entities, &mut counters).await;
        for entity in &entities {
            counters.merge(&entity.counters);
        }
        let elapsed = started.elapsed();
        histogram!("migrator_phase.duration_seconds", elapsed.as_secs_f64(), "phase" => name.clone());

        match result {
            Ok(()) => {
                self.status
                    .mark_completed(
                        &name,
                        counters,
                        elapsed,
                        Self::details(phase, run_id, false, &counters, &entities),
                    )
                    .await?;
                counter!("migrator_phase.completed", 1, "phase" => name.clone());
                info!(
                    phase = %name,
                    processed = counters.processed,
                    succeeded = counters.succeeded,
                    failed = counters.failed,
                    seconds = elapsed.as_secs_f64(),
                    "Phase completed"
                );
                Ok(PhaseReport {
                    phase,
                    outcome: PhaseOutcome::Completed,
                    entities,
                    duration_seconds: elapsed.as_secs_f64(),
                })
            }
            Err(err) => {
                error!(phase = %name, "Phase failed: {}", err);
                counter!("migrator_phase.failed", 1, "phase" => name.clone());
                self.record_failure(phase, &name, run_id, counters, elapsed, &entities, &err)
                    .await;
                Err(err)
            }
        }
    }

    async fn load(
        &self,
        phase: PhaseName,
        entities: &mut Vec<EntityReport>,
        unfinished: &mut RunCounters,
    ) -> Result<(), MigrationError> {
        self.ids.initialize(phase.sequences()).await?;

        let ctx = PipelineContext {
            source: self.source.clone(),
            store: self.store.clone(),
            ids: self.ids.clone(),
            batch_size: self.options.batch_size,
        };
        for mut pipeline in phase.pipelines() {
            match pipeline.run(&ctx).await {
                Ok(report) => entities.push(report),
                Err(err) => {
                    *unfinished = pipeline.counters();
                    return Err(err);
                }
            }
        }

        // Keys are carried over from the source, so counters must catch up.
        self.ids.initialize(phase.sequences()).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_failure(
        &self,
        phase: PhaseName,
        name: &str,
        run_id: Uuid,
        counters: RunCounters,
        elapsed: Duration,
        entities: &[EntityReport],
        err: &MigrationError,
    ) {
        let details = Self::details(phase, run_id, false, &counters, entities);
        if let Err(status_err) = self
            .status
            .mark_failed(name, counters, elapsed, details, err)
            .await
        {
            warn!(phase = name, "Could not record phase failure: {}", status_err);
        }
    }

    async fn already_migrated(&self, phase: PhaseName) -> Result<bool, MigrationError> {
        let writer = BatchWriter::new(self.store.clone());
        for collection in phase.collections() {
            if writer.should_skip(collection).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs `phases` in order and stops at the first failure.
    pub async fn run_all(&self, phases: &[PhaseName]) -> Result<Vec<PhaseReport>, MigrationError> {
        let mut reports = Vec::with_capacity(phases.len());
        for phase in phases {
            reports.push(self.run_phase(*phase).await?);
        }
        Ok(reports)
    }

    /// Operator reset: forgets the status record and empties the phase's
    /// collections so the next run starts from scratch.
    #[instrument(skip(self))]
    pub async fn reset_phase(&self, phase: PhaseName) -> Result<u64, MigrationError> {
        let existed = self.status.reset(&phase.to_string()).await?;
        let mut removed = 0;
        for collection in phase.collections() {
            removed += self.store.drop_collection(collection).await?;
        }
        warn!(
            phase = %phase,
            had_status = existed,
            documents_removed = removed,
            "Phase reset"
        );
        Ok(removed)
    }
}
