//! The Simulation custom resource
//!
//! `spec` is written by users and never touched by the operator. `status` is
//! written only by the reconciler.

use crate::ids::SimulationKey;
use crate::state::SimulationState;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// API group of the Simulation resource
pub const API_GROUP: &str = "simulationworkflow.poc-simulation-workflow.io";

/// API version of the Simulation resource
pub const API_VERSION: &str = "v1alpha1";

/// Desired state of a Simulation
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "simulationworkflow.poc-simulation-workflow.io",
    version = "v1alpha1",
    kind = "Simulation",
    plural = "simulations",
    shortname = "sim",
    status = "SimulationStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Owner","type":"string","jsonPath":".spec.owner"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.simulationState"}"#,
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSpec {
    /// The simulation owner
    pub owner: String,

    /// The command to execute
    pub command: String,

    /// Name of the building block that is the entry point
    pub entry_point: String,

    /// Building blocks for the simulation. Names are unique within a Simulation.
    #[serde(default)]
    pub building_blocks: Vec<BuildingBlock>,
}

/// A declared building block
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingBlock {
    pub name: String,
    pub docker_image: String,
    pub docker_tag: String,
}

impl BuildingBlock {
    pub fn new(
        name: impl Into<String>,
        docker_image: impl Into<String>,
        docker_tag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            docker_image: docker_image.into(),
            docker_tag: docker_tag.into(),
        }
    }

    /// `image:tag` reference used for the unit's container
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.docker_image, self.docker_tag)
    }
}

/// Reasons a declared building block cannot be created
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockSpecError {
    #[error("building block name must not be empty")]
    EmptyName,

    #[error("building block '{block}' has an empty {field}")]
    EmptyField { block: String, field: &'static str },

    #[error("building block name '{0}' is declared more than once")]
    DuplicateName(String),
}

impl SimulationSpec {
    /// Check every declared block, in declaration order.
    ///
    /// The first occurrence of a name is valid; later duplicates are reported.
    pub fn validate_blocks(&self) -> Vec<Result<(), BlockSpecError>> {
        let mut seen = HashSet::new();
        self.building_blocks
            .iter()
            .map(|block| {
                if block.name.is_empty() {
                    return Err(BlockSpecError::EmptyName);
                }
                if block.docker_image.is_empty() {
                    return Err(BlockSpecError::EmptyField {
                        block: block.name.clone(),
                        field: "dockerImage",
                    });
                }
                if block.docker_tag.is_empty() {
                    return Err(BlockSpecError::EmptyField {
                        block: block.name.clone(),
                        field: "dockerTag",
                    });
                }
                if !seen.insert(block.name.as_str()) {
                    return Err(BlockSpecError::DuplicateName(block.name.clone()));
                }
                Ok(())
            })
            .collect()
    }
}

/// Observed state of a Simulation
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStatus {
    /// Lifecycle state of the simulation
    #[serde(default)]
    pub simulation_state: SimulationState,

    /// Blocks a create attempt was made for, in declaration order
    #[serde(default)]
    pub created_blocks: Vec<BlockStatus>,
}

/// Observed lifecycle of one building block
///
/// `ready`, `created` and `failed` are monotonic: once true they stay true.
/// `failed` implies `created`, and a failed block never becomes ready.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub name: String,
    pub docker_image: String,
    pub docker_tag: String,

    #[serde(default)]
    pub ready: bool,

    #[serde(default)]
    pub created: bool,

    #[serde(default)]
    pub failed: bool,

    /// Human-readable diagnostic, only set when `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Number of create calls that returned an error
    #[serde(default, skip_serializing_if = "is_zero")]
    pub create_failures: u32,

    /// Number of status queries that returned an error
    #[serde(default, skip_serializing_if = "is_zero")]
    pub status_failures: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl BlockStatus {
    /// Observed record for a declared block before any create attempt
    pub fn pending(block: &BuildingBlock) -> Self {
        Self {
            name: block.name.clone(),
            docker_image: block.docker_image.clone(),
            docker_tag: block.docker_tag.clone(),
            ..Default::default()
        }
    }

    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.docker_image, self.docker_tag)
    }

    pub fn mark_created(&mut self) {
        self.created = true;
    }

    /// No-op on a failed block
    pub fn mark_ready(&mut self) {
        if !self.failed {
            self.ready = true;
        }
    }

    /// Record a failure. Keeps the first diagnostic if already failed.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.created = true;
        if !self.failed {
            self.failed = true;
            self.error = Some(reason.into());
        }
    }
}

impl Simulation {
    /// Namespace-qualified key of this object
    pub fn key(&self) -> SimulationKey {
        SimulationKey::new(
            self.namespace().unwrap_or_else(|| "default".to_string()),
            self.name_any(),
        )
    }

    /// Current lifecycle state; `Unset` when no status has been written
    pub fn state(&self) -> SimulationState {
        self.status
            .as_ref()
            .map(|status| status.simulation_state)
            .unwrap_or_default()
    }

    pub fn status_mut(&mut self) -> &mut SimulationStatus {
        self.status.get_or_insert_with(SimulationStatus::default)
    }
}
