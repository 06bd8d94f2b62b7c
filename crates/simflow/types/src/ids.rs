//! Identifiers for simulation resources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace-qualified key of a Simulation
///
/// This is the unit of serialization for the reconciler: at most one pass per
/// key is in flight at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimulationKey {
    namespace: String,
    name: String,
}

impl SimulationKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SimulationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = SimulationKey::new("default", "sim-a");
        assert_eq!(key.to_string(), "default/sim-a");
    }
}
