use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{resolve_config, AppState};
use crate::domain::{Address, Decimal, PoolConfig, PositionId, PositionView};
use crate::engine::{DepositOutcome, ExitRecord, Pool, TurnPayout};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoolRequest {
    pub name: String,
    pub tier: Option<String>,
    pub config: Option<PoolConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub owner: String,
    /// Defaults to the pool's entry amount.
    pub amount: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolListResponse {
    pub pools: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummaryDto {
    pub name: String,
    pub config_fingerprint: String,
    pub entry_amount: String,
    pub exit_amount: String,
    pub deposit_count: u64,
    pub completed_cycles: u64,
    pub positions_created: usize,
    pub active_positions: usize,
    pub queue_head: Option<u64>,
    pub active_balance: String,
    pub stranded_positions: usize,
    pub global_pool: String,
    pub operational: String,
    pub keeper: String,
    pub admin: String,
    pub reserve: String,
    pub total_deposited: String,
    pub total_withdrawn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub id: u64,
    pub owner: String,
    pub balance: String,
    pub is_active: bool,
    pub has_exited: bool,
    pub joined_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exited_at: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub length: usize,
    pub positions: Vec<PositionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitDto {
    pub keeper: String,
    pub admin: String,
    pub turn: String,
    pub global: String,
    pub operational: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPayoutDto {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispersalDto {
    pub recipients: usize,
    pub per_position: String,
    pub remainder: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitDto {
    pub position: u64,
    pub owner: String,
    pub balance: String,
    pub payout: String,
    pub excess: String,
    pub wait_time: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub seq: u64,
    pub position: u64,
    pub split: SplitDto,
    pub turn_payout: TurnPayoutDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispersal: Option<DispersalDto>,
    pub exits: Vec<ExitDto>,
}

pub async fn list_pools(State(state): State<AppState>) -> Json<PoolListResponse> {
    Json(PoolListResponse {
        pools: state.registry.names().await,
    })
}

pub async fn create_pool(
    State(state): State<AppState>,
    Json(request): Json<CreatePoolRequest>,
) -> Result<(StatusCode, Json<PoolSummaryDto>), AppError> {
    let config = resolve_config(
        request.tier.as_deref(),
        request.config,
        state.config.default_tier,
    )?;
    let handle = state.registry.create(&request.name, config).await?;
    let pool = handle.lock().await;
    Ok((StatusCode::CREATED, Json(summary_dto(&request.name, &pool))))
}

pub async fn get_pool(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PoolSummaryDto>, AppError> {
    let handle = find_pool(&state, &name).await?;
    let pool = handle.lock().await;
    Ok(Json(summary_dto(&name, &pool)))
}

pub async fn create_deposit(
    Path(name): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, AppError> {
    let owner = Address::from_str(&request.owner)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let amount = request
        .amount
        .as_deref()
        .map(Decimal::from_str)
        .transpose()
        .map_err(|_| AppError::BadRequest("amount must be a decimal string".into()))?;

    let handle = find_pool(&state, &name).await?;
    let mut pool = handle.lock().await;
    let amount = amount.unwrap_or(pool.config().entry_amount);
    let outcome = pool.apply_deposit(owner, amount)?;
    Ok(Json(deposit_dto(outcome)))
}

pub async fn get_queue(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QueueResponse>, AppError> {
    let handle = find_pool(&state, &name).await?;
    let pool = handle.lock().await;
    let positions: Vec<PositionDto> = pool.active_positions().map(position_dto).collect();
    Ok(Json(QueueResponse {
        length: positions.len(),
        positions,
    }))
}

pub async fn get_position(
    Path((name, id)): Path<(String, u64)>,
    State(state): State<AppState>,
) -> Result<Json<PositionDto>, AppError> {
    let handle = find_pool(&state, &name).await?;
    let pool = handle.lock().await;
    pool.position(PositionId::new(id))
        .map(|view| Json(position_dto(view)))
        .ok_or_else(|| AppError::NotFound(format!("position {} in pool {}", id, name)))
}

async fn find_pool(state: &AppState, name: &str) -> Result<Arc<Mutex<Pool>>, AppError> {
    state
        .registry
        .get(name)
        .await
        .ok_or_else(|| AppError::NotFound(format!("pool {}", name)))
}

fn summary_dto(name: &str, pool: &Pool) -> PoolSummaryDto {
    let summary = pool.summary();
    PoolSummaryDto {
        name: name.to_string(),
        config_fingerprint: pool.config().fingerprint(),
        entry_amount: pool.config().entry_amount.to_canonical_string(),
        exit_amount: pool.config().exit_amount.to_canonical_string(),
        deposit_count: summary.totals.deposit_count(),
        completed_cycles: summary.totals.completed_cycles,
        positions_created: summary.positions_created,
        active_positions: summary.active_positions,
        queue_head: summary.queue_head.map(|id| id.as_u64()),
        active_balance: summary.active_balance.to_canonical_string(),
        stranded_positions: summary.stranded_positions,
        global_pool: summary.funds.global_pool.to_canonical_string(),
        operational: summary.funds.operational.to_canonical_string(),
        keeper: summary.funds.keeper.to_canonical_string(),
        admin: summary.funds.admin.to_canonical_string(),
        reserve: summary.funds.reserve.to_canonical_string(),
        total_deposited: summary.totals.total_deposited.to_canonical_string(),
        total_withdrawn: summary.totals.total_withdrawn.to_canonical_string(),
    }
}

fn position_dto(view: PositionView) -> PositionDto {
    PositionDto {
        id: view.id.as_u64(),
        owner: view.owner.as_str().to_string(),
        balance: view.balance.to_canonical_string(),
        is_active: view.is_active,
        has_exited: view.has_exited,
        joined_at: view.joined_at.as_u64(),
        exited_at: view.exited_at.map(|s| s.as_u64()),
    }
}

fn exit_dto(exit: ExitRecord) -> ExitDto {
    ExitDto {
        position: exit.position.as_u64(),
        owner: exit.owner.as_str().to_string(),
        balance: exit.balance.to_canonical_string(),
        payout: exit.payout.to_canonical_string(),
        excess: exit.excess.to_canonical_string(),
        wait_time: exit.wait_time,
    }
}

fn deposit_dto(outcome: DepositOutcome) -> DepositResponse {
    let turn_payout = match outcome.turn_payout {
        TurnPayout::Paid { position, amount } => TurnPayoutDto {
            kind: "paid",
            position: Some(position.as_u64()),
            amount: amount.to_canonical_string(),
        },
        TurnPayout::FoldedIntoPool { amount } => TurnPayoutDto {
            kind: "foldedIntoPool",
            position: None,
            amount: amount.to_canonical_string(),
        },
    };

    DepositResponse {
        seq: outcome.seq.as_u64(),
        position: outcome.position.as_u64(),
        split: SplitDto {
            keeper: outcome.split.keeper.to_canonical_string(),
            admin: outcome.split.admin.to_canonical_string(),
            turn: outcome.split.turn.to_canonical_string(),
            global: outcome.split.global.to_canonical_string(),
            operational: outcome.split.operational.to_canonical_string(),
        },
        turn_payout,
        dispersal: outcome.dispersal.map(|d| DispersalDto {
            recipients: d.recipients,
            per_position: d.per_position.to_canonical_string(),
            remainder: d.remainder.to_canonical_string(),
        }),
        exits: outcome.exits.into_iter().map(exit_dto).collect(),
    }
}
