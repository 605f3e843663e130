// Betting routes: place bets and query the bet ledger

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::error::{LedgerError, LedgerResult};
use crate::handlers::{json_body, query_params};
use crate::models::{BetFilter, PlaceBetRequest};

// ===== ROUTE HANDLERS =====

/// GET /bets?marketId&bettor
pub async fn get_bets(
    State(state): State<SharedState>,
    query: Result<Query<BetFilter>, QueryRejection>,
) -> LedgerResult<Json<Value>> {
    let bets = state.bets.list(&query_params(query)?)?;
    Ok(Json(json!({ "bets": bets })))
}

/// POST /bets
/// Body: { marketId, bettor, outcome, amount } with amount as a decimal string
pub async fn place_bet(
    State(state): State<SharedState>,
    payload: Result<Json<PlaceBetRequest>, JsonRejection>,
) -> LedgerResult<(StatusCode, Json<Value>)> {
    let request = json_body(payload)?;

    let (Some(market_id), Some(bettor), Some(outcome), Some(amount)) = (
        request.market_id.filter(|m| !m.trim().is_empty()),
        request.bettor.filter(|b| !b.trim().is_empty()),
        request.outcome,
        request.amount.filter(|a| !a.is_blank()),
    ) else {
        return Err(LedgerError::Validation("Missing required fields".into()));
    };

    let bet = state
        .bets
        .place_bet(&market_id, &bettor, outcome, &amount.as_text())?;
    Ok((StatusCode::CREATED, Json(json!({ "bet": bet }))))
}
