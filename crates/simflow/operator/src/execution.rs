//! Execution driver extension point
//!
//! Once every building block is ready the Simulation is `Running`. What runs
//! then, and how completion is detected, is up to the driver plugged in here.

use crate::error::ExecutionError;
use async_trait::async_trait;
use simflow_types::{ExecutionProgress, Simulation};

/// Runs the simulation payload and reports its progress
///
/// `poll` is called once per pass while the Simulation is `Running`. It must
/// be idempotent: the same Simulation is polled every requeue interval.
#[async_trait]
pub trait ExecutionDriver: Send + Sync {
    async fn poll(&self, simulation: &Simulation) -> Result<ExecutionProgress, ExecutionError>;
}

/// Driver that never finishes; the Simulation stays `Running`
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleExecutionDriver;

#[async_trait]
impl ExecutionDriver for IdleExecutionDriver {
    async fn poll(&self, simulation: &Simulation) -> Result<ExecutionProgress, ExecutionError> {
        tracing::trace!(simulation = %simulation.key(), "No execution driver configured");
        Ok(ExecutionProgress::InProgress)
    }
}
