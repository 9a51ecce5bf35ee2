use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::ConfigurationError;
use crate::engine::EngineError;
use crate::orchestration::{RegistryError, RunnerError};
use crate::simulation::{ExportError, SimulationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ConfigurationError> for AppError {
    fn from(err: ConfigurationError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Configuration(e) => e.into(),
            EngineError::UnexpectedAmount { .. } => AppError::BadRequest(err.to_string()),
            EngineError::UnknownPosition(_) => AppError::NotFound(err.to_string()),
            EngineError::Invariant(violation) => {
                error!(error = %violation, "invariant violation");
                AppError::Internal(violation.to_string())
            }
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists(_) => AppError::Conflict(err.to_string()),
            RegistryError::InvalidName(_) => AppError::BadRequest(err.to_string()),
            RegistryError::Configuration(e) => e.into(),
        }
    }
}

impl From<SimulationError> for AppError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::Configuration(e) => e.into(),
            SimulationError::ZeroInterval(_) => AppError::BadRequest(err.to_string()),
            SimulationError::Deposit { .. } | SimulationError::Audit { .. } => {
                error!(error = %err, "simulation aborted");
                AppError::Internal(err.to_string())
            }
        }
    }
}

impl From<RunnerError> for AppError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::TooManyDeposits { .. } => AppError::BadRequest(err.to_string()),
            RunnerError::Simulation(e) => e.into(),
            RunnerError::Task(_) => AppError::Internal(err.to_string()),
            RunnerError::Db(e) => e.into(),
        }
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
