use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::amount::AmountError;
use crate::store::StoreError;

/// Failures of market and bet operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Market {0} is already resolved")]
    MarketClosed(String),

    #[error("Market {0} has expired")]
    MarketExpired(String),

    #[error("No access to private market {0}")]
    AccessDenied(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

impl LedgerError {
    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::Validation(_)
            | LedgerError::MarketClosed(_)
            | LedgerError::MarketExpired(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::AccessDenied(_) => StatusCode::FORBIDDEN,
            LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            LedgerError::Store(e) => {
                error!("❌ Store failure: {}", e);
                "Internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Startup and configuration failures.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
