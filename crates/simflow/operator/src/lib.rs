//! simflow operator library
//!
//! This crate provides the reconciliation components for Simulation resources:
//! - Resource store and building block workload boundaries
//! - Block lifecycle tracking and the Simulation state machine
//! - Scheduler, controller wiring and per-key error backoff
//! - Health endpoints and server lifecycle management

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod lifecycle;
pub mod machine;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod workload;

pub use config::{BlockPolicy, ExecutionMode, OperatorConfig, ReconcilerConfig};
pub use error::{OperatorError, OperatorResult, ReconcileError, StoreError, WorkloadError};
pub use execution::{ExecutionDriver, IdleExecutionDriver};
pub use scheduler::{Action, Reconciler};
pub use server::Server;
pub use store::{InMemorySimulationStore, KubeSimulationStore, SimulationStore};
pub use workload::{InMemoryWorkloadClient, PodWorkloadClient, WorkloadClient};
