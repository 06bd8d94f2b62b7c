//! Shared fixtures for reconciliation tests

#![allow(dead_code)]

use simflow_operator::config::{BlockPolicy, ReconcilerConfig};
use simflow_operator::execution::IdleExecutionDriver;
use simflow_operator::scheduler::Reconciler;
use simflow_operator::store::{InMemorySimulationStore, SimulationStore};
use simflow_operator::workload::InMemoryWorkloadClient;
use simflow_types::{BlockStatus, BuildingBlock, Simulation, SimulationSpec};
use std::sync::Arc;

pub struct Harness {
    pub store: Arc<InMemorySimulationStore>,
    pub workload: Arc<InMemoryWorkloadClient>,
    pub reconciler: Reconciler,
}

pub fn harness() -> Harness {
    harness_with(ReconcilerConfig::default(), BlockPolicy::default())
}

pub fn harness_with(config: ReconcilerConfig, policy: BlockPolicy) -> Harness {
    let store = Arc::new(InMemorySimulationStore::new());
    let workload = Arc::new(InMemoryWorkloadClient::new());
    let reconciler = Reconciler::new(
        store.clone(),
        workload.clone(),
        Arc::new(IdleExecutionDriver),
        config,
        policy,
    );

    Harness {
        store,
        workload,
        reconciler,
    }
}

/// Reconciler over an arbitrary store, sharing `workload`
pub fn reconciler_over(
    store: Arc<dyn SimulationStore>,
    workload: Arc<InMemoryWorkloadClient>,
    config: ReconcilerConfig,
) -> Reconciler {
    Reconciler::new(
        store,
        workload,
        Arc::new(IdleExecutionDriver),
        config,
        BlockPolicy::default(),
    )
}

/// Simulation named `name` with `(name, image, tag)` blocks
pub fn simulation(name: &str, blocks: &[(&str, &str, &str)]) -> Simulation {
    Simulation::new(
        name,
        SimulationSpec {
            owner: "alice".to_string(),
            command: "run".to_string(),
            entry_point: blocks.first().map(|b| b.0.to_string()).unwrap_or_default(),
            building_blocks: blocks
                .iter()
                .map(|(name, image, tag)| BuildingBlock::new(*name, *image, *tag))
                .collect(),
        },
    )
}

/// Recorded status of block `name`
pub fn block<'a>(simulation: &'a Simulation, name: &str) -> &'a BlockStatus {
    simulation
        .status
        .as_ref()
        .and_then(|status| status.created_blocks.iter().find(|b| b.name == name))
        .unwrap_or_else(|| panic!("block {} not recorded", name))
}
