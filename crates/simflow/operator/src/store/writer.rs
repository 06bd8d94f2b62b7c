//! Status writer

use super::traits::{SimulationStore, StoreResult};
use simflow_types::{Simulation, SimulationStatus};
use std::sync::Arc;

/// Outcome of a status write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Status was identical to what was read; nothing was sent
    Unchanged,
    /// Status was replaced; carries the stored object
    Written(Box<Simulation>),
}

/// Persists a pass's status as a single conditional replace
///
/// A conflict is returned to the caller as-is. The pass is retried from a
/// fresh fetch, never merged.
#[derive(Clone)]
pub struct StatusWriter {
    store: Arc<dyn SimulationStore>,
}

impl StatusWriter {
    pub fn new(store: Arc<dyn SimulationStore>) -> Self {
        Self { store }
    }

    /// Write `updated.status` unless it equals the status originally read
    pub async fn write(
        &self,
        read: Option<&SimulationStatus>,
        updated: &Simulation,
    ) -> StoreResult<WriteOutcome> {
        if read == updated.status.as_ref() {
            return Ok(WriteOutcome::Unchanged);
        }

        let stored = self.store.replace_status(updated).await?;
        Ok(WriteOutcome::Written(Box::new(stored)))
    }
}
