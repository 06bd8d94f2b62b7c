//! Value types exchanged with the workload orchestration API

use crate::simulation::BlockStatus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Annotation put on every unit, naming the Simulation that created it
pub const SIMULATION_ANNOTATION: &str = "simulationworkflow.poc-simulation-workflow.io/simulation";

/// Everything needed to create one unit for a building block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub tag: String,
    pub annotations: BTreeMap<String, String>,
}

impl UnitSpec {
    /// Unit for `block`, owned by the simulation named `simulation`
    pub fn for_block(block: &BlockStatus, namespace: &str, simulation: &str) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(SIMULATION_ANNOTATION.to_string(), simulation.to_string());

        Self {
            name: block.name.clone(),
            namespace: namespace.to_string(),
            image: block.docker_image.clone(),
            tag: block.docker_tag.clone(),
            annotations,
        }
    }

    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Name of the Simulation this unit belongs to
    pub fn owner(&self) -> Option<&str> {
        self.annotations.get(SIMULATION_ANNOTATION).map(String::as_str)
    }
}

/// Handle returned by a successful create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitHandle {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
    /// True when the unit already existed and was adopted
    pub adopted: bool,
}

/// Platform-reported phase of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl UnitPhase {
    /// Map a platform phase string; anything unrecognised is `Unknown`
    pub fn from_platform(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => UnitPhase::Pending,
            Some("Running") => UnitPhase::Running,
            Some("Succeeded") => UnitPhase::Succeeded,
            Some("Failed") => UnitPhase::Failed,
            _ => UnitPhase::Unknown,
        }
    }
}

impl fmt::Display for UnitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitPhase::Pending => "Pending",
            UnitPhase::Running => "Running",
            UnitPhase::Succeeded => "Succeeded",
            UnitPhase::Failed => "Failed",
            UnitPhase::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Result of querying a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitObservation {
    pub phase: UnitPhase,
    /// Platform-reported reason, mostly present for failures
    pub reason: Option<String>,
}

impl UnitObservation {
    pub fn new(phase: UnitPhase) -> Self {
        Self {
            phase,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
