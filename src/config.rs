use crate::domain::{Decimal, Tier};
use crate::simulation::EquilibriumThresholds;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Tier used when a request names neither a tier nor an explicit config.
    pub default_tier: Tier,
    pub max_simulation_deposits: u64,
    pub default_active_ceiling: usize,
    pub default_healthy_exit_rate: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let default_tier = env_map
            .get("DEFAULT_TIER")
            .map(|s| s.as_str())
            .unwrap_or("standard")
            .parse::<Tier>()
            .map_err(|e| ConfigError::InvalidValue("DEFAULT_TIER".to_string(), e))?;

        let max_simulation_deposits = env_map
            .get("MAX_SIMULATION_DEPOSITS")
            .map(|s| s.as_str())
            .unwrap_or("1000000")
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "MAX_SIMULATION_DEPOSITS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let default_active_ceiling = env_map
            .get("DEFAULT_ACTIVE_CEILING")
            .map(|s| s.as_str())
            .unwrap_or("100")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DEFAULT_ACTIVE_CEILING".to_string(),
                    "must be a non-negative integer".to_string(),
                )
            })?;

        let default_healthy_exit_rate = env_map
            .get("DEFAULT_HEALTHY_EXIT_RATE")
            .map(|s| s.as_str())
            .unwrap_or("55")
            .parse::<Decimal>()
            .ok()
            .filter(|rate| !rate.is_negative() && *rate <= Decimal::hundred())
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "DEFAULT_HEALTHY_EXIT_RATE".to_string(),
                    "must be a percentage within [0, 100]".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            default_tier,
            max_simulation_deposits,
            default_active_ceiling,
            default_healthy_exit_rate,
        })
    }

    pub fn default_thresholds(&self) -> EquilibriumThresholds {
        EquilibriumThresholds {
            active_ceiling: self.default_active_ceiling,
            healthy_exit_rate: self.default_healthy_exit_rate,
        }
    }
}
