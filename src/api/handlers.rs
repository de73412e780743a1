use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::{state::AppState, types::*};
use crate::domain::{
    PortfolioCreatedResponse, PortfolioDetailsResponse, PortfolioResponse, State as StateDocument,
    TransferRequest,
};
use crate::error::HodlError;
use crate::strategy::{transfer_funds, ExecuteStrategyRequest, ExecutionRecord};

/// Parse a JSON body ourselves so malformed input is a plain 400 with serde's message
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> std::result::Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(HodlError::Validation(format!("invalid request body: {}", e))))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_seconds(),
    })
}

/// GET /portfolios
pub async fn list_portfolios(State(state): State<AppState>) -> ApiResult<PortfolioResponse> {
    Ok(Json(state.gateway.list_portfolios().await?))
}

/// GET /portfolios/:uuid
pub async fn get_portfolio(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> ApiResult<PortfolioDetailsResponse> {
    Ok(Json(state.gateway.portfolio_details(&uuid).await?))
}

/// POST /portfolios
pub async fn create_portfolio(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<PortfolioCreatedResponse> {
    let req: CreatePortfolioRequest = parse_body(&body)?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(HodlError::Validation("portfolio name must not be empty".into()).into());
    }

    let created = state.gateway.create_portfolio(name).await?;
    info!(name, uuid = %created.portfolio.uuid, "portfolio created");
    Ok(Json(created))
}

/// POST /execute-strategy
pub async fn execute_strategy(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<ExecuteStrategyResponse> {
    let req: ExecuteStrategyRequest = parse_body(&body)?;
    debug!(portfolio = %req.portfolio, strategy = %req.strategy, currency = %req.currency, "execute-strategy");

    let execution_id = state.executor.accept(req).await?;
    Ok(Json(ExecuteStrategyResponse {
        status: "OK".to_string(),
        execution_id,
    }))
}

/// GET /executions/:id
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExecutionQuery>,
) -> ApiResult<ExecutionRecord> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| HodlError::Validation(format!("invalid execution id: {}", id)))?;

    if query.wait {
        match state.tracker().wait(&id, state.wait_timeout).await {
            Ok(record) => return Ok(Json(record)),
            // still running; report where it got to
            Err(HodlError::Timeout(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    state
        .tracker()
        .get(&id)
        .map(Json)
        .ok_or_else(|| HodlError::ExecutionNotFound(id.to_string()).into())
}

/// GET /state
pub async fn get_state(State(state): State<AppState>) -> ApiResult<StateDocument> {
    Ok(Json(state.executor.state().snapshot().await?))
}

/// POST /transfer-funds
pub async fn transfer(State(state): State<AppState>, body: Bytes) -> ApiResult<Value> {
    let req: TransferRequest = parse_body(&body)?;
    let resp = transfer_funds(state.gateway.as_ref(), &req, &state.fiat_currency).await?;
    Ok(Json(resp))
}
