pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod simulation;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{Address, Decimal, PoolConfig, PositionId, Seq, Tier};
pub use engine::{EngineError, InvariantViolation, Pool};
pub use error::AppError;
pub use simulation::{run_simulation, EquilibriumReport, SimulationOptions};
