//! Domain types for the four-funds savings pool.
//!
//! This module provides:
//! - Lossless fixed-point amounts via the Decimal wrapper
//! - Domain primitives: PositionId, Seq, Address
//! - The Position record and its read-only view
//! - Pool configuration, validation, and tier presets

pub mod decimal;
pub mod pool_config;
pub mod position;
pub mod primitives;
pub mod tier;

pub use decimal::Decimal;
pub use pool_config::{ConfigurationError, ExcessPolicy, ExitRule, PoolConfig};
pub use position::{Position, PositionView};
pub use primitives::{Address, AddressParseError, PositionId, Seq};
pub use tier::Tier;
