//! Kubernetes API server backed store

use super::traits::{SimulationStore, StoreResult};
use crate::error::StoreError;
use async_trait::async_trait;
use kube::api::{Api, PostParams};
use kube::Client;
use simflow_types::{Simulation, SimulationKey};

/// Reads Simulations from and writes status to the API server
#[derive(Clone)]
pub struct KubeSimulationStore {
    client: Client,
}

impl KubeSimulationStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Simulation> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl SimulationStore for KubeSimulationStore {
    async fn get(&self, key: &SimulationKey) -> StoreResult<Option<Simulation>> {
        self.api(key.namespace())
            .get_opt(key.name())
            .await
            .map_err(|e| StoreError::from_kube(e, &key.to_string()))
    }

    async fn replace_status(&self, simulation: &Simulation) -> StoreResult<Simulation> {
        let key = simulation.key();

        // The body carries metadata.resourceVersion, so the API server rejects
        // the write with 409 if the object changed since it was read.
        let body =
            serde_json::to_vec(simulation).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.api(key.namespace())
            .replace_status(key.name(), &PostParams::default(), body)
            .await
            .map_err(|e| StoreError::from_kube(e, &key.to_string()))
    }
}
