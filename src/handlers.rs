// HTTP request handlers for the market endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::error::{LedgerError, LedgerResult};
use crate::models::*;

/// Unwrap a JSON body, turning unparsable input into a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> LedgerResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| LedgerError::Validation(format!("Invalid request body: {}", rejection.body_text())))
}

/// Same as [`json_body`] for query strings.
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> LedgerResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| LedgerError::Validation(format!("Invalid query string: {}", rejection.body_text())))
}

// ===== MARKET ENDPOINTS =====

/// GET /markets?category&visibility&creator&resolved&tag&viewer
pub async fn get_markets(
    State(state): State<SharedState>,
    query: Result<Query<MarketFilter>, QueryRejection>,
) -> LedgerResult<Json<Value>> {
    let markets = state.markets.list(&query_params(query)?)?;
    Ok(Json(json!({ "markets": markets })))
}

/// POST /markets
pub async fn create_market(
    State(state): State<SharedState>,
    payload: Result<Json<CreateMarketRequest>, JsonRejection>,
) -> LedgerResult<(StatusCode, Json<Value>)> {
    let market = state.markets.create(json_body(payload)?)?;
    Ok((StatusCode::CREATED, Json(json!({ "market": market }))))
}

/// GET /markets/:id
pub async fn get_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> LedgerResult<Json<Value>> {
    let market = state.markets.get(&id)?;
    let bets = state.bets.list(&BetFilter {
        market_id: Some(id),
        bettor: None,
    })?;
    Ok(Json(json!({
        "market": market,
        "bets": bets,
        "odds": market.odds(),
    })))
}

/// PUT /markets/:id - resolve a market
pub async fn resolve_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<ResolveMarketRequest>, JsonRejection>,
) -> LedgerResult<Json<Value>> {
    // 404 takes precedence over a bad body
    state.markets.get(&id)?;

    let request = json_body(payload)?;
    let outcome = match (request.resolved, request.outcome) {
        (Some(true), Some(outcome)) => outcome,
        (Some(false), Some(_)) => {
            return Err(LedgerError::Validation("A resolved market cannot be reopened".into()))
        }
        _ => return Err(LedgerError::Validation("Invalid update parameters".into())),
    };

    let market = state.markets.resolve(&id, outcome)?;
    Ok(Json(json!({ "market": market })))
}

/// DELETE /markets/:id
pub async fn delete_market(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> LedgerResult<Json<Value>> {
    state.markets.delete(&id)?;
    Ok(Json(json!({ "success": true })))
}

// ===== HEALTH CHECK =====

pub async fn health_check() -> &'static str {
    "Whisper Prediction Market - Online ✅"
}
