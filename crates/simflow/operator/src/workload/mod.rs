//! Workload orchestration boundary
//!
//! A building block runs as one unit (a Pod). The reconciler guards
//! re-creation through the block's `created` flag; clients only need to
//! tolerate the occasional duplicate create after a crash.

mod memory;
mod pods;
mod traits;

pub use memory::InMemoryWorkloadClient;
pub use pods::PodWorkloadClient;
pub use traits::{WorkloadClient, WorkloadResult};
