//! Single reconciliation pass

use crate::config::{BlockPolicy, ReconcilerConfig};
use crate::error::{ReconcileError, StoreError};
use crate::execution::ExecutionDriver;
use crate::lifecycle::BlockTracker;
use crate::machine::StateMachine;
use crate::store::{SimulationStore, StatusWriter, WriteOutcome};
use crate::workload::WorkloadClient;
use serde::Serialize;
use simflow_types::{SimulationKey, SimulationState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the scheduler should do after a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Terminal state reached or object gone; wait for an external change
    Done,
    /// Evaluate again after the delay
    RequeueAfter(Duration),
}

/// Counters exposed on the status endpoint
#[derive(Debug, Default)]
pub struct ReconcileStats {
    passes: AtomicU64,
    errors: AtomicU64,
    conflicts: AtomicU64,
    status_writes: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`ReconcileStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub passes: u64,
    pub errors: u64,
    pub conflicts: u64,
    pub status_writes: u64,
    pub completed: u64,
    pub failed: u64,
}

impl ReconcileStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            status_writes: self.status_writes.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn record_error(&self, error: &ReconcileError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        if error.is_conflict() {
            self.conflicts.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_terminal(&self, state: SimulationState) {
        match state {
            SimulationState::Completed => self.completed.fetch_add(1, Ordering::Relaxed),
            SimulationState::Failed => self.failed.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };
    }
}

/// Compares a Simulation's desired and observed state, one pass at a time
///
/// Holds no per-Simulation state between passes. Passes for different keys
/// can run concurrently on the same reconciler.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn SimulationStore>,
    writer: StatusWriter,
    machine: StateMachine,
    config: ReconcilerConfig,
    stats: Arc<ReconcileStats>,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(
        store: Arc<dyn SimulationStore>,
        workload: Arc<dyn WorkloadClient>,
        driver: Arc<dyn ExecutionDriver>,
        config: ReconcilerConfig,
        policy: BlockPolicy,
    ) -> Self {
        let tracker = BlockTracker::new(workload, policy);

        Self {
            writer: StatusWriter::new(store.clone()),
            store,
            machine: StateMachine::new(tracker, driver),
            config,
            stats: Arc::new(ReconcileStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ReconcileStats> {
        self.stats.clone()
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one pass for `key`, bounded by the configured deadline.
    ///
    /// An error means nothing was persisted; the caller re-invokes with backoff.
    pub async fn reconcile(&self, key: &SimulationKey) -> Result<Action, ReconcileError> {
        self.stats.passes.fetch_add(1, Ordering::Relaxed);
        let deadline = self.config.pass_timeout();

        let result = match tokio::time::timeout(deadline, self.pass(key)).await {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::Timeout(deadline)),
        };

        if let Err(e) = &result {
            self.stats.record_error(e);
            if e.is_conflict() {
                tracing::debug!(simulation = %key, error = %e, "Status write conflicted");
            } else {
                tracing::error!(simulation = %key, error = %e, "Reconciliation pass failed");
            }
        }

        result
    }

    async fn pass(&self, key: &SimulationKey) -> Result<Action, ReconcileError> {
        let Some(mut simulation) = self.store.get(key).await? else {
            tracing::debug!(simulation = %key, "Simulation not found, treating as deleted");
            return Ok(Action::Done);
        };

        let read = simulation.status.clone();
        if simulation.state().is_terminal() {
            return Ok(Action::Done);
        }

        tracing::debug!(
            simulation = %key,
            state = %simulation.state(),
            "Reconciling simulation"
        );

        let transition = self.machine.advance(&mut simulation).await?;

        match self.writer.write(read.as_ref(), &simulation).await {
            Ok(WriteOutcome::Written(_)) => {
                self.stats.status_writes.fetch_add(1, Ordering::Relaxed);
            }
            Ok(WriteOutcome::Unchanged) => {}
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(simulation = %key, "Simulation deleted during pass");
                return Ok(Action::Done);
            }
            Err(e) => return Err(e.into()),
        }

        if transition.changed() {
            tracing::info!(
                simulation = %key,
                from = %transition.from,
                to = %transition.to,
                "Simulation state changed"
            );
        }

        if transition.to.is_terminal() {
            self.stats.record_terminal(transition.to);
            return Ok(Action::Done);
        }

        Ok(Action::RequeueAfter(self.config.requeue_interval()))
    }
}
