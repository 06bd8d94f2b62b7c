//! Store trait definitions

use crate::error::StoreError;
use async_trait::async_trait;
use simflow_types::{Simulation, SimulationKey};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Access to Simulation objects
#[async_trait]
pub trait SimulationStore: Send + Sync {
    /// Get a Simulation by key. `None` means it was deleted.
    async fn get(&self, key: &SimulationKey) -> StoreResult<Option<Simulation>>;

    /// Replace the status sub-object of `simulation`.
    ///
    /// The write is conditioned on `metadata.resourceVersion`; a stale version
    /// fails with `StoreError::Conflict` and nothing is written.
    async fn replace_status(&self, simulation: &Simulation) -> StoreResult<Simulation>;
}
