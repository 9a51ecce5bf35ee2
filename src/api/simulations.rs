use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{resolve_config, AppState};
use crate::db::StoredRun;
use crate::domain::{Decimal, PoolConfig};
use crate::error::AppError;
use crate::simulation::{checkpoints_to_csv, EquilibriumVerdict, SimulationOptions};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSimulationRequest {
    pub tier: Option<String>,
    pub config: Option<PoolConfig>,
    pub deposit_count: u64,
    pub checkpoint_interval: Option<u64>,
    pub verify_every: Option<u64>,
    pub active_ceiling: Option<usize>,
    pub healthy_exit_rate: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub fingerprint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRunDto {
    pub run_id: String,
    pub created_at: String,
    pub config_fingerprint: String,
    pub deposit_count: u64,
    pub active_positions: usize,
    pub peak_active_positions: usize,
    pub completed_cycles: u64,
    pub exit_rate: String,
    pub net_flow: String,
    pub net_flow_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_wait_time: Option<String>,
    pub stranded_positions: usize,
    pub total_deposited: String,
    pub total_withdrawn: String,
    pub global_pool: String,
    pub operational: String,
    pub keeper: String,
    pub admin: String,
    pub reserve: String,
    pub active_ceiling: usize,
    pub healthy_exit_rate: String,
    pub checkpoint_count: usize,
    pub verdict: EquilibriumVerdict,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunListingDto {
    pub run_id: String,
    pub deposit_count: u64,
    pub verdict: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunListResponse {
    pub runs: Vec<RunListingDto>,
}

pub async fn create_simulation(
    State(state): State<AppState>,
    Json(request): Json<CreateSimulationRequest>,
) -> Result<(StatusCode, Json<SimulationRunDto>), AppError> {
    let config = resolve_config(
        request.tier.as_deref(),
        request.config,
        state.config.default_tier,
    )?;

    let mut thresholds = state.config.default_thresholds();
    if let Some(ceiling) = request.active_ceiling {
        thresholds.active_ceiling = ceiling;
    }
    if let Some(rate) = request.healthy_exit_rate {
        thresholds.healthy_exit_rate = rate;
    }

    let options = SimulationOptions {
        deposit_count: request.deposit_count,
        checkpoint_interval: request.checkpoint_interval,
        thresholds,
        verify_every: request.verify_every,
    };

    let run = state.runner.run_and_store(config, options).await?;
    Ok((StatusCode::CREATED, Json(run_dto(&run))))
}

pub async fn get_simulation(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SimulationRunDto>, AppError> {
    let run = state
        .runner
        .get(&run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("simulation run {}", run_id)))?;
    Ok(Json(run_dto(&run)))
}

pub async fn list_simulations(
    Query(query): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<RunListResponse>, AppError> {
    let runs = state
        .repo
        .list_runs_by_fingerprint(&query.fingerprint)
        .await?
        .into_iter()
        .map(|r| RunListingDto {
            run_id: r.run_id,
            deposit_count: r.deposit_count,
            verdict: r.verdict,
            created_at: r.created_at,
        })
        .collect();
    Ok(Json(RunListResponse { runs }))
}

pub async fn get_checkpoints_csv(
    Path(run_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let checkpoints = state.repo.query_checkpoints(&run_id).await?;
    // Every stored run has at least its final checkpoint.
    if checkpoints.is_empty() {
        return Err(AppError::NotFound(format!("simulation run {}", run_id)));
    }
    let body = checkpoints_to_csv(&checkpoints)?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], body))
}

fn run_dto(run: &StoredRun) -> SimulationRunDto {
    let report = &run.report;
    SimulationRunDto {
        run_id: run.run_id.clone(),
        created_at: run.created_at.to_rfc3339(),
        config_fingerprint: run.config_fingerprint.clone(),
        deposit_count: report.deposit_count,
        active_positions: report.active_positions,
        peak_active_positions: report.peak_active_positions,
        completed_cycles: report.completed_cycles,
        exit_rate: report.exit_rate.to_canonical_string(),
        net_flow: report.net_flow.to_canonical_string(),
        net_flow_ratio: report.net_flow_ratio.to_canonical_string(),
        avg_wait_time: report.avg_wait_time.map(|w| w.to_canonical_string()),
        stranded_positions: report.stranded_positions,
        total_deposited: report.total_deposited.to_canonical_string(),
        total_withdrawn: report.total_withdrawn.to_canonical_string(),
        global_pool: report.funds.global_pool.to_canonical_string(),
        operational: report.funds.operational.to_canonical_string(),
        keeper: report.funds.keeper.to_canonical_string(),
        admin: report.funds.admin.to_canonical_string(),
        reserve: report.funds.reserve.to_canonical_string(),
        active_ceiling: report.thresholds.active_ceiling,
        healthy_exit_rate: report.thresholds.healthy_exit_rate.to_canonical_string(),
        checkpoint_count: report.checkpoints.len(),
        verdict: report.verdict.clone(),
    }
}
