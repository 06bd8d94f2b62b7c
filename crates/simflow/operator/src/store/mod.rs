//! Resource store boundary
//!
//! The store owns Simulation objects. The reconciler only holds a transient
//! copy per pass and writes status back conditioned on the version it read.

mod kubernetes;
mod memory;
mod traits;
mod writer;

pub use kubernetes::KubeSimulationStore;
pub use memory::InMemorySimulationStore;
pub use traits::{SimulationStore, StoreResult};
pub use writer::{StatusWriter, WriteOutcome};
