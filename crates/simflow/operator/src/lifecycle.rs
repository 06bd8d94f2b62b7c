//! Building block lifecycle tracking
//!
//! Advances one observed block at a time: `desired -> created -> ready | failed`.
//! The flags on [`BlockStatus`] only ever go from false to true, so re-running
//! the tracker on an already settled block is a no-op that issues no calls.

use crate::config::BlockPolicy;
use crate::workload::WorkloadClient;
use simflow_types::{BlockStatus, UnitPhase, UnitSpec};
use std::sync::Arc;

/// Outcome of checking one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCheck {
    Ready,
    Pending,
    Failed,
}

/// Creates units for blocks and maps their phase onto block flags
#[derive(Clone)]
pub struct BlockTracker {
    workload: Arc<dyn WorkloadClient>,
    policy: BlockPolicy,
}

impl BlockTracker {
    pub fn new(workload: Arc<dyn WorkloadClient>, policy: BlockPolicy) -> Self {
        Self { workload, policy }
    }

    /// Issue the create for a block that has none recorded yet.
    ///
    /// With the default policy any error fails the block immediately. A
    /// transient error within the create budget leaves it uncreated so a later
    /// pass tries again.
    pub async fn ensure_created(&self, simulation: &str, namespace: &str, block: &mut BlockStatus) {
        if block.created || block.failed {
            return;
        }

        let unit = UnitSpec::for_block(block, namespace, simulation);

        match self.workload.create_unit(&unit).await {
            Ok(handle) => {
                tracing::debug!(
                    simulation = %simulation,
                    block = %block.name,
                    image = %unit.image_ref(),
                    adopted = handle.adopted,
                    "Created unit"
                );
                block.mark_created();
            }
            Err(e) => {
                block.create_failures += 1;
                if e.is_transient() && block.create_failures < self.policy.max_create_attempts {
                    tracing::warn!(
                        simulation = %simulation,
                        block = %block.name,
                        failures = block.create_failures,
                        error = %e,
                        "Unit creation failed, will retry"
                    );
                    return;
                }

                tracing::warn!(
                    simulation = %simulation,
                    block = %block.name,
                    error = %e,
                    "Unit creation failed"
                );
                block.mark_failed(e.to_string());
            }
        }
    }

    /// Check a created block's unit and record what it reports
    pub async fn observe(
        &self,
        simulation: &str,
        namespace: &str,
        block: &mut BlockStatus,
    ) -> BlockCheck {
        if block.failed {
            return BlockCheck::Failed;
        }
        if block.ready {
            return BlockCheck::Ready;
        }
        if !block.created {
            self.ensure_created(simulation, namespace, block).await;
            return if block.failed {
                BlockCheck::Failed
            } else {
                BlockCheck::Pending
            };
        }

        match self.workload.get_unit(&block.name, namespace).await {
            Ok(observation) => match observation.phase {
                UnitPhase::Running => {
                    block.mark_ready();
                    BlockCheck::Ready
                }
                UnitPhase::Failed => {
                    let reason = observation
                        .reason
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| format!("unit {} failed", block.name));
                    tracing::warn!(
                        simulation = %simulation,
                        block = %block.name,
                        reason = %reason,
                        "Building block failed"
                    );
                    block.mark_failed(reason);
                    BlockCheck::Failed
                }
                UnitPhase::Pending | UnitPhase::Succeeded | UnitPhase::Unknown => {
                    tracing::debug!(
                        simulation = %simulation,
                        block = %block.name,
                        phase = %observation.phase,
                        "Building block not ready"
                    );
                    BlockCheck::Pending
                }
            },
            Err(e) => {
                block.status_failures += 1;
                if e.is_transient() && block.status_failures < self.policy.max_status_failures {
                    tracing::warn!(
                        simulation = %simulation,
                        block = %block.name,
                        failures = block.status_failures,
                        error = %e,
                        "Unit status query failed, will retry"
                    );
                    return BlockCheck::Pending;
                }

                tracing::warn!(
                    simulation = %simulation,
                    block = %block.name,
                    error = %e,
                    "Unit status query failed"
                );
                block.mark_failed(e.to_string());
                BlockCheck::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkloadError;
    use crate::workload::InMemoryWorkloadClient;
    use simflow_types::BuildingBlock;

    fn tracker(policy: BlockPolicy) -> (BlockTracker, Arc<InMemoryWorkloadClient>) {
        let workload = Arc::new(InMemoryWorkloadClient::new());
        (BlockTracker::new(workload.clone(), policy), workload)
    }

    fn block(name: &str) -> BlockStatus {
        BlockStatus::pending(&BuildingBlock::new(name, "img", "v1"))
    }

    fn retrying() -> BlockPolicy {
        BlockPolicy {
            max_create_attempts: 3,
            max_status_failures: 2,
        }
    }

    #[tokio::test]
    async fn test_create_marks_created() {
        let (tracker, workload) = tracker(BlockPolicy::default());
        let mut a = block("a");

        tracker.ensure_created("sim", "default", &mut a).await;
        assert!(a.created && !a.failed && !a.ready);
        assert_eq!(a.create_failures, 0);

        // Already created: no second call
        tracker.ensure_created("sim", "default", &mut a).await;
        assert_eq!(workload.create_count("default", "a"), 1);
    }

    #[tokio::test]
    async fn test_create_error_fails_block_by_default() {
        let (tracker, workload) = tracker(BlockPolicy::default());
        workload.fail_next_create("a", WorkloadError::Transport("connection refused".into()));
        let mut a = block("a");

        tracker.ensure_created("sim", "default", &mut a).await;
        assert!(a.created);
        assert!(a.failed);
        assert!(a.error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_transient_create_error_retried_within_budget() {
        let (tracker, workload) = tracker(retrying());
        workload.fail_next_create("a", WorkloadError::Transport("reset".into()));
        let mut a = block("a");

        tracker.ensure_created("sim", "default", &mut a).await;
        assert!(!a.created && !a.failed);
        assert!(a.error.is_none());

        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Pending);
        assert!(a.created);
        assert_eq!(a.create_failures, 1);
        assert_eq!(workload.create_count("default", "a"), 2);
    }

    #[tokio::test]
    async fn test_permanent_create_error_ignores_budget() {
        let (tracker, workload) = tracker(retrying());
        workload.fail_next_create(
            "a",
            WorkloadError::Rejected {
                code: 422,
                message: "invalid image".into(),
            },
        );
        let mut a = block("a");

        tracker.ensure_created("sim", "default", &mut a).await;
        assert!(a.failed && a.created);
    }

    #[tokio::test]
    async fn test_create_budget_exhausted() {
        let (tracker, workload) = tracker(retrying());
        for _ in 0..3 {
            workload.fail_next_create("a", WorkloadError::Transport("reset".into()));
        }
        let mut a = block("a");

        tracker.ensure_created("sim", "default", &mut a).await;
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Pending);
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Failed);
        assert_eq!(a.create_failures, 3);
        assert!(a.failed && a.created);
    }

    #[tokio::test]
    async fn test_observe_maps_phases() {
        let (tracker, workload) = tracker(BlockPolicy::default());
        let mut a = block("a");
        tracker.ensure_created("sim", "default", &mut a).await;

        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Pending);

        workload.set_phase("default", "a", UnitPhase::Succeeded, None);
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Pending);

        workload.set_phase("default", "a", UnitPhase::Running, None);
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Ready);
        assert!(a.ready);

        // Settled: no further queries
        let queries = workload.get_count("default", "a");
        workload.set_phase("default", "a", UnitPhase::Failed, Some("OOMKilled"));
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Ready);
        assert_eq!(workload.get_count("default", "a"), queries);
        assert!(!a.failed);
    }

    #[tokio::test]
    async fn test_observe_failed_phase_records_reason() {
        let (tracker, workload) = tracker(BlockPolicy::default());
        let mut a = block("a");
        tracker.ensure_created("sim", "default", &mut a).await;

        workload.set_phase("default", "a", UnitPhase::Failed, Some("OOMKilled"));
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Failed);
        assert_eq!(a.error.as_deref(), Some("OOMKilled"));

        workload.set_phase("default", "a", UnitPhase::Running, None);
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Failed);
        assert!(!a.ready);
    }

    #[tokio::test]
    async fn test_failed_phase_without_reason() {
        let (tracker, workload) = tracker(BlockPolicy::default());
        let mut a = block("a");
        tracker.ensure_created("sim", "default", &mut a).await;

        workload.set_phase("default", "a", UnitPhase::Failed, Some(""));
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Failed);
        assert_eq!(a.error.as_deref(), Some("unit a failed"));
    }

    #[tokio::test]
    async fn test_query_error_fails_block_by_default() {
        let (tracker, workload) = tracker(BlockPolicy::default());
        let mut a = block("a");
        tracker.ensure_created("sim", "default", &mut a).await;

        workload.fail_next_get("a", WorkloadError::Transport("timeout".into()));
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Failed);
        assert!(a.failed);
        assert_eq!(a.status_failures, 1);
    }

    #[tokio::test]
    async fn test_transient_query_error_tolerated_within_budget() {
        let (tracker, workload) = tracker(retrying());
        let mut a = block("a");
        tracker.ensure_created("sim", "default", &mut a).await;

        workload.fail_next_get("a", WorkloadError::Transport("timeout".into()));
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Pending);
        assert!(!a.failed);

        workload.fail_next_get("a", WorkloadError::Transport("timeout".into()));
        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Failed);
        assert_eq!(a.status_failures, 2);
    }

    #[tokio::test]
    async fn test_missing_unit_fails_block() {
        let (tracker, _workload) = tracker(retrying());
        let mut a = block("a");
        a.mark_created();

        assert_eq!(tracker.observe("sim", "default", &mut a).await, BlockCheck::Failed);
        assert_eq!(a.error.as_deref(), Some("unit a not found"));
    }
}
