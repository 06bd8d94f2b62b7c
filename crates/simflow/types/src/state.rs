//! Simulation lifecycle state and its transition function
//!
//! The lifecycle only moves forward:
//!
//! ```text
//! Unset -> NotReady -> Running -> Completed
//!             |           |
//!             +-----------+-----> Failed
//! ```
//!
//! `Completed` and `Failed` are terminal. The transition function is total over
//! `SimulationState x Observation`; an observation that does not belong to the
//! current state leaves it unchanged.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job-level lifecycle of a Simulation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub enum SimulationState {
    /// Just submitted, nothing has been created yet
    #[default]
    #[serde(rename = "")]
    Unset,

    /// Waiting for building blocks to be up and running
    #[serde(rename = "SimulationNotReady")]
    NotReady,

    /// Every building block is ready and the simulation is executing
    #[serde(rename = "SimulationRunning")]
    Running,

    /// The simulation run completed with success
    #[serde(rename = "SimulationCompleted")]
    Completed,

    /// A building block or the simulation run failed
    #[serde(rename = "SimulationFailed")]
    Failed,
}

impl SimulationState {
    /// Wire representation, as stored in `status.simulationState`
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationState::Unset => "",
            SimulationState::NotReady => "SimulationNotReady",
            SimulationState::Running => "SimulationRunning",
            SimulationState::Completed => "SimulationCompleted",
            SimulationState::Failed => "SimulationFailed",
        }
    }

    /// No further mutation happens once a terminal state is reached
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimulationState::Completed | SimulationState::Failed)
    }

    /// Position along the lifecycle. Both terminal states share the last rank.
    pub fn progression(&self) -> u8 {
        match self {
            SimulationState::Unset => 0,
            SimulationState::NotReady => 1,
            SimulationState::Running => 2,
            SimulationState::Completed | SimulationState::Failed => 3,
        }
    }

    /// Whether moving from `self` to `next` respects monotonicity
    pub fn can_advance_to(&self, next: SimulationState) -> bool {
        if *self == next {
            return true;
        }
        !self.is_terminal() && next.progression() > self.progression()
    }

    /// Transition function: `state x observation -> state`
    pub fn next(self, observation: Observation) -> SimulationState {
        use SimulationState::*;

        match (self, observation) {
            (Completed | Failed, _) => self,

            (Unset, Observation::Provisioned) => NotReady,
            (Unset, Observation::Readiness(_) | Observation::Execution(_)) => Unset,

            (NotReady, Observation::Readiness(readiness)) => match readiness {
                Readiness::AllReady => Running,
                Readiness::Waiting => NotReady,
                Readiness::Failed => Failed,
            },
            (NotReady, Observation::Provisioned | Observation::Execution(_)) => NotReady,

            (Running, Observation::Execution(progress)) => match progress {
                ExecutionProgress::InProgress => Running,
                ExecutionProgress::Completed => Completed,
                ExecutionProgress::Failed => Failed,
            },
            (Running, Observation::Provisioned | Observation::Readiness(_)) => Running,
        }
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationState::Unset => write!(f, "unset"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// What a reconciliation pass observed for the state it evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// A create attempt was made for every declared building block
    Provisioned,

    /// Aggregate readiness of the created building blocks
    Readiness(Readiness),

    /// Progress reported by the execution driver
    Execution(ExecutionProgress),
}

/// Aggregate readiness of a Simulation's building blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Every block is ready and none failed
    AllReady,
    /// At least one block is still pending
    Waiting,
    /// A block failed; remaining blocks were not waited for
    Failed,
}

/// Progress of the simulation payload once every block is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProgress {
    InProgress,
    Completed,
    Failed,
}
