//! In-memory store implementation

use super::traits::*;
use crate::error::StoreError;
use async_trait::async_trait;
use simflow_types::{Simulation, SimulationKey};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// In-memory store for development and testing
///
/// Every write bumps a store-wide resource version, and `replace_status`
/// enforces it the same way the API server does.
#[derive(Debug)]
pub struct InMemorySimulationStore {
    simulations: Arc<RwLock<HashMap<SimulationKey, Simulation>>>,
    resource_version: Arc<AtomicU64>,
    status_writes: Arc<AtomicU64>,
    injected_get_failures: Arc<Mutex<VecDeque<StoreError>>>,
    injected_write_failures: Arc<Mutex<VecDeque<StoreError>>>,
}

impl Default for InMemorySimulationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySimulationStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            simulations: Arc::new(RwLock::new(HashMap::new())),
            resource_version: Arc::new(AtomicU64::new(0)),
            status_writes: Arc::new(AtomicU64::new(0)),
            injected_get_failures: Arc::new(Mutex::new(VecDeque::new())),
            injected_write_failures: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    fn next_version(&self) -> String {
        (self.resource_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Create or overwrite a Simulation, as an external client would
    pub async fn insert(&self, mut simulation: Simulation) -> Simulation {
        if simulation.metadata.namespace.is_none() {
            simulation.metadata.namespace = Some("default".to_string());
        }
        simulation.metadata.resource_version = Some(self.next_version());

        let mut simulations = self.simulations.write().await;
        simulations.insert(simulation.key(), simulation.clone());
        simulation
    }

    /// Bump the resource version without changing content (a concurrent edit)
    pub async fn touch(&self, key: &SimulationKey) -> bool {
        let mut simulations = self.simulations.write().await;
        match simulations.get_mut(key) {
            Some(simulation) => {
                simulation.metadata.resource_version = Some(self.next_version());
                true
            }
            None => false,
        }
    }

    /// Delete a Simulation
    pub async fn delete(&self, key: &SimulationKey) -> bool {
        let mut simulations = self.simulations.write().await;
        simulations.remove(key).is_some()
    }

    /// Current copy of a Simulation
    pub async fn snapshot(&self, key: &SimulationKey) -> Option<Simulation> {
        let simulations = self.simulations.read().await;
        simulations.get(key).cloned()
    }

    /// Number of successful status writes
    pub fn status_writes(&self) -> u64 {
        self.status_writes.load(Ordering::SeqCst)
    }

    /// Fail the next `get` with `error`
    pub async fn fail_next_get(&self, error: StoreError) {
        self.injected_get_failures.lock().await.push_back(error);
    }

    /// Fail the next `replace_status` with `error`
    pub async fn fail_next_write(&self, error: StoreError) {
        self.injected_write_failures.lock().await.push_back(error);
    }
}

#[async_trait]
impl SimulationStore for InMemorySimulationStore {
    async fn get(&self, key: &SimulationKey) -> StoreResult<Option<Simulation>> {
        if let Some(error) = self.injected_get_failures.lock().await.pop_front() {
            return Err(error);
        }

        let simulations = self.simulations.read().await;
        Ok(simulations.get(key).cloned())
    }

    async fn replace_status(&self, simulation: &Simulation) -> StoreResult<Simulation> {
        if let Some(error) = self.injected_write_failures.lock().await.pop_front() {
            return Err(error);
        }

        let key = simulation.key();
        let mut simulations = self.simulations.write().await;
        let stored = simulations
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if stored.metadata.resource_version != simulation.metadata.resource_version {
            return Err(StoreError::Conflict(format!(
                "{} has version {:?}, write was based on {:?}",
                key, stored.metadata.resource_version, simulation.metadata.resource_version
            )));
        }

        stored.status = simulation.status.clone();
        stored.metadata.resource_version = Some(self.next_version());
        self.status_writes.fetch_add(1, Ordering::SeqCst);

        Ok(stored.clone())
    }
}
