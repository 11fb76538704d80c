use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};

use crate::errors::MigrationError;
use crate::store::{DocumentStore, StatusRecord};

/// Lifecycle of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
    /// No record exists yet
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PhaseEvent {
    Start,
    Complete,
    Fail,
    /// Operator reset; the only way out of `running`, `completed` or `failed`
    Reset,
}

impl PhaseState {
    /// Next state, or `None` when `event` is illegal in this state.
    pub fn transition(self, event: PhaseEvent) -> Option<PhaseState> {
        use PhaseEvent::*;
        use PhaseState::*;

        match (self, event) {
            (Pending, Start) => Some(Running),
            (Running, Complete) => Some(Completed),
            (Running, Fail) => Some(Failed),
            (_, Reset) => Some(Pending),
            _ => None,
        }
    }
}

/// Row counters accumulated over one entity or one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Rows a transformer deliberately dropped
    pub skipped: u64,
}

impl RunCounters {
    pub fn merge(&mut self, other: &RunCounters) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// One status record with its derived success rate.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    #[serde(flatten)]
    pub record: StatusRecord,
    /// `succeeded / processed` in percent; absent before anything was processed
    pub success_rate: Option<f64>,
}

/// Read-only view for the admin dashboard and `commerce-migrate status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub phases: Vec<StatusView>,
    pub completed: usize,
    pub known: usize,
    pub progress_percent: f64,
}

/// Durable phase status records. Every write goes through [`PhaseState::transition`].
#[derive(Clone)]
pub struct StatusStore {
    store: Arc<dyn DocumentStore>,
}

impl StatusStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, name: &str) -> Result<Option<StatusRecord>, MigrationError> {
        Ok(self.store.load_status(name).await?)
    }

    pub async fn state(&self, name: &str) -> Result<PhaseState, MigrationError> {
        match self.get(name).await? {
            Some(record) => parse_state(&record),
            None => Ok(PhaseState::Pending),
        }
    }

    async fn apply<F>(
        &self,
        name: &str,
        event: PhaseEvent,
        update: F,
    ) -> Result<StatusRecord, MigrationError>
    where
        F: FnOnce(&mut StatusRecord) + Send,
    {
        let existing = self.get(name).await?;
        let from = match &existing {
            Some(record) => parse_state(record)?,
            None => PhaseState::Pending,
        };
        let to = from
            .transition(event)
            .ok_or_else(|| MigrationError::IllegalTransition {
                phase: name.to_string(),
                from: from.to_string(),
                event: event.to_string(),
            })?;

        let mut record = existing.unwrap_or_else(|| blank_record(name));
        record.status = to.to_string();
        update(&mut record);
        self.store.save_status(record.clone()).await?;
        info!(phase = name, from = %from, to = %to, "Phase status updated");
        Ok(record)
    }

    /// Enters `running`. `first_run` is stamped only if it was never set.
    #[instrument(skip(self, details))]
    pub async fn mark_running(
        &self,
        name: &str,
        details: Value,
    ) -> Result<StatusRecord, MigrationError> {
        let now = Utc::now();
        self.apply(name, PhaseEvent::Start, move |record| {
            if record.first_run.is_none() {
                record.first_run = Some(now);
            }
            record.last_run = Some(now);
            record.duration_seconds = None;
            record.processed = 0;
            record.succeeded = 0;
            record.failed = 0;
            record.error = None;
            record.stack = None;
            record.details = details;
        })
        .await
    }

    #[instrument(skip(self, details))]
    pub async fn mark_completed(
        &self,
        name: &str,
        counters: RunCounters,
        duration: Duration,
        details: Value,
    ) -> Result<StatusRecord, MigrationError> {
        self.apply(name, PhaseEvent::Complete, move |record| {
            let now = Utc::now();
            if record.first_run.is_none() {
                record.first_run = Some(now);
            }
            record.last_run = Some(now);
            record.duration_seconds = Some(duration.as_secs_f64());
            apply_counters(record, &counters);
            record.details = details;
        })
        .await
    }

    #[instrument(skip(self, details, error))]
    pub async fn mark_failed(
        &self,
        name: &str,
        counters: RunCounters,
        duration: Duration,
        details: Value,
        error: &MigrationError,
    ) -> Result<StatusRecord, MigrationError> {
        let message = error.to_string();
        let stack = error.error_chain();
        self.apply(name, PhaseEvent::Fail, move |record| {
            record.last_run = Some(Utc::now());
            record.duration_seconds = Some(duration.as_secs_f64());
            apply_counters(record, &counters);
            record.error = Some(message);
            record.stack = Some(stack);
            record.details = details;
        })
        .await
    }

    /// Admin reset: removes the record so the phase is `pending` again.
    /// Returns whether a record existed.
    #[instrument(skip(self))]
    pub async fn reset(&self, name: &str) -> Result<bool, MigrationError> {
        let state = self.state(name).await?;
        if state.transition(PhaseEvent::Reset).is_none() {
            return Err(MigrationError::IllegalTransition {
                phase: name.to_string(),
                from: state.to_string(),
                event: PhaseEvent::Reset.to_string(),
            });
        }
        let existed = self.store.delete_status(name).await?;
        if existed {
            warn!(phase = name, previous = %state, "Phase status reset by operator");
        }
        Ok(existed)
    }

    pub async fn list(&self) -> Result<Vec<StatusRecord>, MigrationError> {
        Ok(self.store.list_statuses().await?)
    }

    /// Every record plus progress over `known_phases`.
    pub async fn report(&self, known_phases: &[String]) -> Result<StatusReport, MigrationError> {
        let records = self.list().await?;
        let completed = records
            .iter()
            .filter(|r| known_phases.contains(&r.name))
            .filter(|r| r.status == PhaseState::Completed.to_string())
            .count();
        let known = known_phases.len();
        let progress_percent = if known == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / known as f64
        };

        let phases = records
            .into_iter()
            .map(|record| {
                let success_rate = (record.processed > 0)
                    .then(|| record.succeeded as f64 * 100.0 / record.processed as f64);
                StatusView {
                    record,
                    success_rate,
                }
            })
            .collect();

        Ok(StatusReport {
            phases,
            completed,
            known,
            progress_percent,
        })
    }
}

fn parse_state(record: &StatusRecord) -> Result<PhaseState, MigrationError> {
    PhaseState::from_str(&record.status).map_err(|_| {
        MigrationError::Serialization(format!(
            "status record {} has unknown state {:?}",
            record.name, record.status
        ))
    })
}

fn apply_counters(record: &mut StatusRecord, counters: &RunCounters) {
    record.processed = counters.processed as i64;
    record.succeeded = counters.succeeded as i64;
    record.failed = counters.failed as i64;
}

fn blank_record(name: &str) -> StatusRecord {
    StatusRecord {
        name: name.to_string(),
        status: PhaseState::Pending.to_string(),
        first_run: None,
        last_run: None,
        duration_seconds: None,
        processed: 0,
        succeeded: 0,
        failed: 0,
        error: None,
        stack: None,
        details: json!({}),
    }
}
