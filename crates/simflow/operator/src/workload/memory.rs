//! In-memory workload client for development and testing

use super::traits::{WorkloadClient, WorkloadResult};
use crate::error::WorkloadError;
use async_trait::async_trait;
use dashmap::DashMap;
use simflow_types::{UnitHandle, UnitObservation, UnitPhase, UnitSpec};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

type UnitKey = (String, String);

fn unit_key(namespace: &str, name: &str) -> UnitKey {
    (namespace.to_string(), name.to_string())
}

#[derive(Debug, Clone)]
struct UnitRecord {
    spec: UnitSpec,
    observation: UnitObservation,
}

/// Scriptable workload client
///
/// Units start `Pending`. Tests move them along with [`set_phase`] and inject
/// errors per unit name; every call is counted.
///
/// [`set_phase`]: InMemoryWorkloadClient::set_phase
#[derive(Debug, Default)]
pub struct InMemoryWorkloadClient {
    units: DashMap<UnitKey, UnitRecord>,
    create_calls: DashMap<UnitKey, u32>,
    get_calls: DashMap<UnitKey, u32>,
    total_creates: AtomicU64,
    total_gets: AtomicU64,
    create_failures: DashMap<String, VecDeque<WorkloadError>>,
    get_failures: DashMap<String, VecDeque<WorkloadError>>,
}

impl InMemoryWorkloadClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the phase (and reason) reported for an existing unit
    pub fn set_phase(&self, namespace: &str, name: &str, phase: UnitPhase, reason: Option<&str>) {
        if let Some(mut record) = self.units.get_mut(&unit_key(namespace, name)) {
            record.observation = match reason {
                Some(reason) => UnitObservation::new(phase).with_reason(reason),
                None => UnitObservation::new(phase),
            };
        }
    }

    /// Fail the next create of unit `name` with `error`
    pub fn fail_next_create(&self, name: &str, error: WorkloadError) {
        self.create_failures
            .entry(name.to_string())
            .or_default()
            .push_back(error);
    }

    /// Fail the next query of unit `name` with `error`
    pub fn fail_next_get(&self, name: &str, error: WorkloadError) {
        self.get_failures
            .entry(name.to_string())
            .or_default()
            .push_back(error);
    }

    /// Register a unit that was created outside this client
    pub fn seed(&self, unit: UnitSpec, phase: UnitPhase) {
        let key = unit_key(&unit.namespace, &unit.name);
        self.units.insert(
            key,
            UnitRecord {
                spec: unit,
                observation: UnitObservation::new(phase),
            },
        );
    }

    /// Create calls issued for one unit, successful or not
    pub fn create_count(&self, namespace: &str, name: &str) -> u32 {
        self.create_calls
            .get(&unit_key(namespace, name))
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Status queries issued for one unit
    pub fn get_count(&self, namespace: &str, name: &str) -> u32 {
        self.get_calls
            .get(&unit_key(namespace, name))
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn total_creates(&self) -> u64 {
        self.total_creates.load(Ordering::SeqCst)
    }

    pub fn total_gets(&self) -> u64 {
        self.total_gets.load(Ordering::SeqCst)
    }

    /// Spec a unit was created with
    pub fn unit(&self, namespace: &str, name: &str) -> Option<UnitSpec> {
        self.units
            .get(&unit_key(namespace, name))
            .map(|record| record.spec.clone())
    }

    fn take_failure(
        failures: &DashMap<String, VecDeque<WorkloadError>>,
        name: &str,
    ) -> Option<WorkloadError> {
        failures.get_mut(name).and_then(|mut queue| queue.pop_front())
    }
}

#[async_trait]
impl WorkloadClient for InMemoryWorkloadClient {
    async fn create_unit(&self, unit: &UnitSpec) -> WorkloadResult<UnitHandle> {
        let key = unit_key(&unit.namespace, &unit.name);
        *self.create_calls.entry(key.clone()).or_insert(0) += 1;
        self.total_creates.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = Self::take_failure(&self.create_failures, &unit.name) {
            return Err(error);
        }

        if let Some(existing) = self.units.get(&key) {
            if existing.spec.owner() == unit.owner() {
                return Ok(UnitHandle {
                    name: unit.name.clone(),
                    namespace: unit.namespace.clone(),
                    uid: None,
                    adopted: true,
                });
            }
            return Err(WorkloadError::Conflict {
                name: unit.name.clone(),
                simulation: unit.owner().unwrap_or_default().to_string(),
            });
        }

        self.units.insert(
            key,
            UnitRecord {
                spec: unit.clone(),
                observation: UnitObservation::new(UnitPhase::Pending),
            },
        );

        Ok(UnitHandle {
            name: unit.name.clone(),
            namespace: unit.namespace.clone(),
            uid: None,
            adopted: false,
        })
    }

    async fn get_unit(&self, name: &str, namespace: &str) -> WorkloadResult<UnitObservation> {
        let key = unit_key(namespace, name);
        *self.get_calls.entry(key.clone()).or_insert(0) += 1;
        self.total_gets.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = Self::take_failure(&self.get_failures, name) {
            return Err(error);
        }

        self.units
            .get(&key)
            .map(|record| record.observation.clone())
            .ok_or_else(|| WorkloadError::NotFound(name.to_string()))
    }
}
