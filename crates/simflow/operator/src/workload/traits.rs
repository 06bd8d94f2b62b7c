//! Workload client trait

use crate::error::WorkloadError;
use async_trait::async_trait;
use simflow_types::{UnitHandle, UnitObservation, UnitSpec};

/// Result type for workload operations
pub type WorkloadResult<T> = Result<T, WorkloadError>;

/// Creates units and reports their phase
#[async_trait]
pub trait WorkloadClient: Send + Sync {
    /// Create a unit. Billable: the reconciler calls this at most once per block.
    async fn create_unit(&self, unit: &UnitSpec) -> WorkloadResult<UnitHandle>;

    /// Fetch a unit's current phase and platform-reported reason
    async fn get_unit(&self, name: &str, namespace: &str) -> WorkloadResult<UnitObservation>;
}
