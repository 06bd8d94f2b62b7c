//! simflow Types - Resource schema for the Simulation workflow
//!
//! A `Simulation` is a declarative job: an owner, a command, an entry-point
//! building block, and a set of building blocks (container image + tag) that
//! must all be up before the simulation payload can run.
//!
//! ## Key Concepts
//!
//! - **Simulation**: The custom resource (`spec` is desired, `status` is observed)
//! - **BuildingBlock**: A declared workload unit inside a Simulation
//! - **BlockStatus**: The observed lifecycle of one building block
//! - **SimulationState**: The job-level lifecycle and its transition function
//! - **Unit**: The orchestration platform's runtime instance of a block (a Pod)

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod ids;
pub mod simulation;
pub mod state;
pub mod workload;

pub use ids::SimulationKey;
pub use simulation::{
    BlockSpecError, BlockStatus, BuildingBlock, Simulation, SimulationSpec, SimulationStatus,
    API_GROUP, API_VERSION,
};
pub use state::{ExecutionProgress, Observation, Readiness, SimulationState};
pub use workload::{UnitHandle, UnitObservation, UnitPhase, UnitSpec, SIMULATION_ANNOTATION};
