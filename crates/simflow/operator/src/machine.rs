//! Simulation state machine
//!
//! Evaluates the current state of one in-memory Simulation copy, performs the
//! side effects that state calls for, and applies the transition function
//! from [`SimulationState::next`]. Every pass recomputes from the persisted
//! status, never from a remembered delta.

use crate::error::ExecutionError;
use crate::execution::ExecutionDriver;
use crate::lifecycle::{BlockCheck, BlockTracker};
use simflow_types::{BlockStatus, Observation, Readiness, Simulation, SimulationState};
use std::sync::Arc;

/// State before and after one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SimulationState,
    pub to: SimulationState,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Drives a Simulation through its lifecycle
#[derive(Clone)]
pub struct StateMachine {
    tracker: BlockTracker,
    driver: Arc<dyn ExecutionDriver>,
}

impl StateMachine {
    pub fn new(tracker: BlockTracker, driver: Arc<dyn ExecutionDriver>) -> Self {
        Self { tracker, driver }
    }

    /// Evaluate the current state and record the next one in `simulation.status`
    pub async fn advance(&self, simulation: &mut Simulation) -> Result<Transition, ExecutionError> {
        let from = simulation.state();

        let observation = match from {
            SimulationState::Unset => {
                self.provision(simulation).await;
                Observation::Provisioned
            }
            SimulationState::NotReady => {
                Observation::Readiness(self.check_readiness(simulation).await)
            }
            SimulationState::Running => Observation::Execution(self.driver.poll(simulation).await?),
            SimulationState::Completed | SimulationState::Failed => {
                return Ok(Transition { from, to: from });
            }
        };

        let to = from.next(observation);
        debug_assert!(from.can_advance_to(to), "{} -> {} regresses", from, to);
        simulation.status_mut().simulation_state = to;

        Ok(Transition { from, to })
    }

    /// Attempt a create for every declared block and record it in `createdBlocks`
    async fn provision(&self, simulation: &mut Simulation) {
        let key = simulation.key();
        let declared = simulation.spec.building_blocks.clone();
        let checks = simulation.spec.validate_blocks();
        let status = simulation.status_mut();

        for (block, check) in declared.iter().zip(checks) {
            let mut observed = BlockStatus::pending(block);

            if let Err(issue) = check {
                tracing::warn!(
                    simulation = %key,
                    block = %block.name,
                    error = %issue,
                    "Invalid building block, not creating a unit"
                );
                observed.mark_failed(issue.to_string());
                status.created_blocks.push(observed);
                continue;
            }

            self.tracker
                .ensure_created(key.name(), key.namespace(), &mut observed)
                .await;
            status.created_blocks.push(observed);
        }
    }

    /// Check every unsettled block, stopping at the first failure
    async fn check_readiness(&self, simulation: &mut Simulation) -> Readiness {
        let key = simulation.key();
        let status = simulation.status_mut();
        let mut readiness = Readiness::AllReady;

        for block in status.created_blocks.iter_mut() {
            match self
                .tracker
                .observe(key.name(), key.namespace(), block)
                .await
            {
                BlockCheck::Ready => {}
                BlockCheck::Pending => readiness = Readiness::Waiting,
                BlockCheck::Failed => return Readiness::Failed,
            }
        }

        readiness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockPolicy;
    use crate::execution::IdleExecutionDriver;
    use crate::workload::InMemoryWorkloadClient;
    use async_trait::async_trait;
    use simflow_types::{BuildingBlock, ExecutionProgress, SimulationSpec, UnitPhase};

    struct FixedDriver(ExecutionProgress);

    #[async_trait]
    impl ExecutionDriver for FixedDriver {
        async fn poll(
            &self,
            _simulation: &Simulation,
        ) -> Result<ExecutionProgress, ExecutionError> {
            Ok(self.0)
        }
    }

    fn machine_with(
        driver: Arc<dyn ExecutionDriver>,
    ) -> (StateMachine, Arc<InMemoryWorkloadClient>) {
        let workload = Arc::new(InMemoryWorkloadClient::new());
        let tracker = BlockTracker::new(workload.clone(), BlockPolicy::default());
        (StateMachine::new(tracker, driver), workload)
    }

    fn create_test_simulation(blocks: Vec<BuildingBlock>) -> Simulation {
        let mut simulation = Simulation::new(
            "sim-a",
            SimulationSpec {
                owner: "alice".to_string(),
                command: "run".to_string(),
                entry_point: "a".to_string(),
                building_blocks: blocks,
            },
        );
        simulation.metadata.namespace = Some("default".to_string());
        simulation
    }

    #[tokio::test]
    async fn test_unset_creates_every_block() {
        let (machine, workload) = machine_with(Arc::new(IdleExecutionDriver));
        let mut simulation = create_test_simulation(vec![
            BuildingBlock::new("a", "img", "v1"),
            BuildingBlock::new("b", "img", "v1"),
        ]);

        let transition = machine.advance(&mut simulation).await.unwrap();
        assert_eq!(transition.from, SimulationState::Unset);
        assert_eq!(transition.to, SimulationState::NotReady);

        let blocks = &simulation.status.as_ref().unwrap().created_blocks;
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.created && !b.ready && !b.failed));
        assert_eq!(workload.total_creates(), 2);
        assert_eq!(
            workload.unit("default", "a").unwrap().image_ref(),
            "img:v1"
        );
    }

    #[tokio::test]
    async fn test_no_blocks_goes_straight_to_running() {
        let (machine, workload) = machine_with(Arc::new(IdleExecutionDriver));
        let mut simulation = create_test_simulation(vec![]);

        machine.advance(&mut simulation).await.unwrap();
        assert_eq!(simulation.state(), SimulationState::NotReady);

        machine.advance(&mut simulation).await.unwrap();
        assert_eq!(simulation.state(), SimulationState::Running);
        assert_eq!(workload.total_creates(), 0);
    }

    #[tokio::test]
    async fn test_fail_fast_skips_remaining_blocks() {
        let (machine, workload) = machine_with(Arc::new(IdleExecutionDriver));
        let mut simulation = create_test_simulation(vec![
            BuildingBlock::new("a", "img", "v1"),
            BuildingBlock::new("b", "img", "v1"),
        ]);
        machine.advance(&mut simulation).await.unwrap();

        workload.set_phase("default", "a", UnitPhase::Failed, Some("ErrImagePull"));
        let transition = machine.advance(&mut simulation).await.unwrap();

        assert_eq!(transition.to, SimulationState::Failed);
        assert_eq!(workload.get_count("default", "b"), 0);
    }

    #[tokio::test]
    async fn test_invalid_blocks_are_failed_without_create() {
        let (machine, workload) = machine_with(Arc::new(IdleExecutionDriver));
        let mut simulation = create_test_simulation(vec![
            BuildingBlock::new("a", "img", "v1"),
            BuildingBlock::new("a", "img", "v2"),
        ]);

        machine.advance(&mut simulation).await.unwrap();
        assert_eq!(simulation.state(), SimulationState::NotReady);
        assert_eq!(workload.total_creates(), 1);

        let blocks = &simulation.status.as_ref().unwrap().created_blocks;
        assert!(!blocks[0].failed);
        assert!(blocks[1].failed && blocks[1].created);

        workload.set_phase("default", "a", UnitPhase::Running, None);
        machine.advance(&mut simulation).await.unwrap();
        assert_eq!(simulation.state(), SimulationState::Failed);
    }

    #[tokio::test]
    async fn test_running_consults_driver() {
        let (machine, _workload) =
            machine_with(Arc::new(FixedDriver(ExecutionProgress::Completed)));
        let mut simulation = create_test_simulation(vec![]);
        simulation.status_mut().simulation_state = SimulationState::Running;

        let transition = machine.advance(&mut simulation).await.unwrap();
        assert_eq!(transition.to, SimulationState::Completed);
        assert!(transition.changed());
    }

    #[tokio::test]
    async fn test_terminal_state_is_untouched() {
        let (machine, workload) = machine_with(Arc::new(IdleExecutionDriver));
        let mut simulation = create_test_simulation(vec![BuildingBlock::new("a", "img", "v1")]);
        simulation.status_mut().simulation_state = SimulationState::Failed;
        let before = simulation.status.clone();

        let transition = machine.advance(&mut simulation).await.unwrap();
        assert!(!transition.changed());
        assert_eq!(simulation.status, before);
        assert_eq!(workload.total_creates() + workload.total_gets(), 0);
    }
}
