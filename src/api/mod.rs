pub mod health;
pub mod pools;
pub mod simulations;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{PoolConfig, Tier};
use crate::error::AppError;
use crate::orchestration::{PoolRegistry, SimulationRunner};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub registry: Arc<PoolRegistry>,
    pub runner: Arc<SimulationRunner>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        let runner = SimulationRunner::new(repo.clone(), config.max_simulation_deposits);
        Self {
            repo,
            config,
            registry: Arc::new(PoolRegistry::new()),
            runner: Arc::new(runner),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/pools", get(pools::list_pools).post(pools::create_pool))
        .route("/v1/pools/:name", get(pools::get_pool))
        .route("/v1/pools/:name/deposits", post(pools::create_deposit))
        .route("/v1/pools/:name/queue", get(pools::get_queue))
        .route("/v1/pools/:name/positions/:id", get(pools::get_position))
        .route(
            "/v1/simulations",
            get(simulations::list_simulations).post(simulations::create_simulation),
        )
        .route("/v1/simulations/:run_id", get(simulations::get_simulation))
        .route(
            "/v1/simulations/:run_id/checkpoints.csv",
            get(simulations::get_checkpoints_csv),
        )
        .layer(cors)
        .with_state(state)
}

/// Pick the pool configuration for a request: an explicit config, a named
/// tier, or the service default tier. Naming both is ambiguous.
fn resolve_config(
    tier: Option<&str>,
    config: Option<PoolConfig>,
    default_tier: Tier,
) -> Result<PoolConfig, AppError> {
    match (tier, config) {
        (Some(_), Some(_)) => Err(AppError::BadRequest(
            "specify either tier or config, not both".into(),
        )),
        (None, Some(config)) => Ok(config),
        (Some(tier), None) => tier
            .parse::<Tier>()
            .map(|t| t.config())
            .map_err(AppError::BadRequest),
        (None, None) => Ok(default_tier.config()),
    }
}
