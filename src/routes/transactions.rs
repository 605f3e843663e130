// Settlement routes: build (never send) contract transaction requests

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::Deserialize;

use crate::app_state::SharedState;
use crate::contract::TransactionRequest;
use crate::error::LedgerResult;
use crate::handlers::json_body;

// ===== REQUEST TYPES =====

/// POST /transactions body, tagged by `action`
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TransactionAction {
    #[serde(rename_all = "camelCase")]
    Bet {
        market_index: u64,
        outcome: bool,
        /// Ether, e.g. "0.05"
        amount: String,
    },
    /// Mirror a stored market on-chain
    #[serde(rename_all = "camelCase")]
    CreateMarket { market_id: String },
    #[serde(rename_all = "camelCase")]
    ResolveMarket { market_index: u64, outcome: bool },
    #[serde(rename_all = "camelCase")]
    ClaimWinnings { market_index: u64 },
}

// ===== ROUTE HANDLERS =====

/// POST /transactions
pub async fn build_transaction(
    State(state): State<SharedState>,
    payload: Result<Json<TransactionAction>, JsonRejection>,
) -> LedgerResult<Json<TransactionRequest>> {
    let contract = &state.contract;
    let request = match json_body(payload)? {
        TransactionAction::Bet { market_index, outcome, amount } => {
            contract.bet(market_index, outcome, &amount)?
        }
        TransactionAction::CreateMarket { market_id } => {
            let market = state.markets.get(&market_id)?;
            contract.create_market(
                &market.question,
                &market.description,
                market.expires_at,
                &market.category,
                market.visibility,
                market.access_list.as_deref().unwrap_or_default(),
            )
        }
        TransactionAction::ResolveMarket { market_index, outcome } => {
            contract.resolve_market(market_index, outcome)
        }
        TransactionAction::ClaimWinnings { market_index } => contract.claim_winnings(market_index),
    };
    Ok(Json(request))
}
