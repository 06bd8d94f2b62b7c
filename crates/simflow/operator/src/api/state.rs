//! Application state for API handlers

use crate::config::ExecutionMode;
use crate::scheduler::ReconcileStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Reconciliation counters
    pub stats: Arc<ReconcileStats>,

    /// Set while the controller is running
    pub ready: Arc<AtomicBool>,

    /// How the operator connects to the cluster
    pub execution_mode: ExecutionMode,

    /// Operator version
    pub version: String,

    /// Operator start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        stats: Arc<ReconcileStats>,
        ready: Arc<AtomicBool>,
        execution_mode: ExecutionMode,
    ) -> Self {
        Self {
            stats,
            ready,
            execution_mode,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
