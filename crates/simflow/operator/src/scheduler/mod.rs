//! Scheduler and reconciliation loop
//!
//! The scheduler is responsible for:
//! - Running level-triggered passes that converge a Simulation's status
//! - Requeueing non-terminal Simulations on the poll interval
//! - Backing off per Simulation after infrastructure errors

pub mod controller;
mod reconciler;

pub use controller::{ControllerContext, ErrorBackoff};
pub use reconciler::{Action, ReconcileStats, Reconciler, StatsSnapshot};
