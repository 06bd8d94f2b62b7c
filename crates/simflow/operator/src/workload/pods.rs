//! Pod-backed workload client

use super::traits::{WorkloadClient, WorkloadResult};
use crate::error::WorkloadError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use simflow_types::{
    UnitHandle, UnitObservation, UnitPhase, UnitSpec, SIMULATION_ANNOTATION,
};

/// Runs each building block as a single-container Pod
#[derive(Clone)]
pub struct PodWorkloadClient {
    client: Client,
}

impl PodWorkloadClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Resolve a 409 on create: adopt the Pod if this Simulation made it
    async fn adopt(&self, unit: &UnitSpec) -> WorkloadResult<UnitHandle> {
        let existing = self
            .api(&unit.namespace)
            .get(&unit.name)
            .await
            .map_err(|e| WorkloadError::from_kube(e, &unit.name))?;

        let owner = existing
            .annotations()
            .get(SIMULATION_ANNOTATION)
            .map(String::as_str);
        if owner.is_none() || owner != unit.owner() {
            return Err(WorkloadError::Conflict {
                name: unit.name.clone(),
                simulation: unit.owner().unwrap_or_default().to_string(),
            });
        }

        tracing::info!(
            unit = %unit.name,
            namespace = %unit.namespace,
            "Adopted existing pod"
        );

        let mut handle = handle_for(&existing, &unit.namespace);
        handle.adopted = true;
        Ok(handle)
    }
}

#[async_trait]
impl WorkloadClient for PodWorkloadClient {
    async fn create_unit(&self, unit: &UnitSpec) -> WorkloadResult<UnitHandle> {
        let pod = build_pod(unit);

        match self
            .api(&unit.namespace)
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| WorkloadError::from_kube(e, &unit.name))
        {
            Ok(created) => Ok(handle_for(&created, &unit.namespace)),
            Err(WorkloadError::AlreadyExists(_)) => self.adopt(unit).await,
            Err(e) => Err(e),
        }
    }

    async fn get_unit(&self, name: &str, namespace: &str) -> WorkloadResult<UnitObservation> {
        let pod = self
            .api(namespace)
            .get(name)
            .await
            .map_err(|e| WorkloadError::from_kube(e, name))?;

        Ok(observe(&pod))
    }
}

/// Pod manifest for a unit: one container named after the block
pub(crate) fn build_pod(unit: &UnitSpec) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(unit.name.clone()),
            namespace: Some(unit.namespace.clone()),
            annotations: Some(unit.annotations.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: unit.name.clone(),
                image: Some(unit.image_ref()),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn handle_for(pod: &Pod, namespace: &str) -> UnitHandle {
    UnitHandle {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_else(|| namespace.to_string()),
        uid: pod.uid(),
        adopted: false,
    }
}

pub(crate) fn observe(pod: &Pod) -> UnitObservation {
    let status = pod.status.as_ref();
    let phase = UnitPhase::from_platform(status.and_then(|s| s.phase.as_deref()));

    UnitObservation {
        phase,
        reason: status.and_then(failure_reason),
    }
}

/// Pod-level reason, then message, then the first container-level reason
fn failure_reason(status: &PodStatus) -> Option<String> {
    let non_empty = |value: &Option<String>| value.clone().filter(|s| !s.is_empty());

    if let Some(reason) = non_empty(&status.reason).or_else(|| non_empty(&status.message)) {
        return Some(reason);
    }

    status
        .container_statuses
        .iter()
        .flatten()
        .filter_map(|container| container.state.as_ref())
        .find_map(|state| {
            state
                .terminated
                .as_ref()
                .and_then(|t| non_empty(&t.reason))
                .or_else(|| state.waiting.as_ref().and_then(|w| non_empty(&w.reason)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateTerminated, ContainerStatus,
    };
    use simflow_types::{BlockStatus, BuildingBlock};

    fn unit() -> UnitSpec {
        let block = BlockStatus::pending(&BuildingBlock::new("solver", "registry/solver", "v3"));
        UnitSpec::for_block(&block, "lab", "sim-a")
    }

    #[test]
    fn test_build_pod() {
        let pod = build_pod(&unit());

        assert_eq!(pod.metadata.name.as_deref(), Some("solver"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("lab"));
        assert_eq!(
            pod.annotations().get(SIMULATION_ANNOTATION).map(String::as_str),
            Some("sim-a")
        );

        let containers = &pod.spec.as_ref().unwrap().containers;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "solver");
        assert_eq!(containers[0].image.as_deref(), Some("registry/solver:v3"));
    }

    #[test]
    fn test_build_pod_long_simulation_name() {
        let simulation = "s".repeat(100);
        let block = BlockStatus::pending(&BuildingBlock::new("solver", "registry/solver", "v3"));
        let pod = build_pod(&UnitSpec::for_block(&block, "lab", &simulation));

        // Label values are capped at 63 characters; ownership must not live there
        assert!(pod.labels().values().all(|value| value.len() <= 63));
        assert_eq!(pod.annotations().get(SIMULATION_ANNOTATION), Some(&simulation));
    }

    #[test]
    fn test_observe_running() {
        let pod = Pod {
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(observe(&pod), UnitObservation::new(UnitPhase::Running));
    }

    #[test]
    fn test_observe_without_status() {
        assert_eq!(
            observe(&Pod::default()),
            UnitObservation::new(UnitPhase::Unknown)
        );
    }

    #[test]
    fn test_failure_reason_prefers_pod_reason() {
        let pod = Pod {
            status: Some(PodStatus {
                phase: Some("Failed".to_string()),
                reason: Some("Evicted".to_string()),
                message: Some("node low on memory".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(observe(&pod).reason.as_deref(), Some("Evicted"));
    }

    #[test]
    fn test_failure_reason_falls_back_to_container() {
        let pod = Pod {
            status: Some(PodStatus {
                phase: Some("Failed".to_string()),
                reason: Some(String::new()),
                container_statuses: Some(vec![ContainerStatus {
                    name: "solver".to_string(),
                    state: Some(ContainerState {
                        terminated: Some(ContainerStateTerminated {
                            exit_code: 137,
                            reason: Some("OOMKilled".to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let observation = observe(&pod);
        assert_eq!(observation.phase, UnitPhase::Failed);
        assert_eq!(observation.reason.as_deref(), Some("OOMKilled"));
    }
}
