// Routes module - assembles every HTTP endpoint into one router
// Market endpoints live in `handlers`, the rest in the sub-modules below

pub mod bets;
pub mod transactions;

pub use bets::*;
pub use transactions::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app_state::SharedState;
use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::handlers::*;

/// Router with the default request timeout.
pub fn router(state: SharedState) -> Router {
    router_with_timeout(state, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
}

pub fn router_with_timeout(state: SharedState, request_timeout: Duration) -> Router {
    Router::new()
        // ===== MARKET ENDPOINTS =====
        .route("/markets", get(get_markets).post(create_market))
        .route(
            "/markets/:id",
            get(get_market).put(resolve_market).delete(delete_market),
        )
        // ===== BETTING ENDPOINTS =====
        .route("/bets", get(get_bets).post(place_bet))
        // ===== SETTLEMENT CONTRACT =====
        .route("/transactions", post(build_transaction))
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
