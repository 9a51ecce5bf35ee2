//! Service-side coordination: named live pools and stored simulation runs.

pub mod registry;
pub mod runner;

pub use registry::{PoolRegistry, RegistryError};
pub use runner::{RunnerError, SimulationRunner};
