use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::contract::{ContractConfig, DEFAULT_CHAIN_ID, DEFAULT_CONTRACT_ADDRESS, DEFAULT_PAYMASTER_URL};
use crate::error::{AppError, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_DATA_DIR: &str = "data/ledger";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Which Ledger Store backend to run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Sled { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub store: StoreBackend,
    /// Upper bound for handling a single request (REQUEST_TIMEOUT_SECS)
    pub request_timeout: Duration,
    pub contract: ContractConfig,
}

impl Config {
    /// Read configuration from the environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let bind_addr = var("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .map_err(|_| AppError::Config("BIND_ADDR must be a socket address like 0.0.0.0:1234".to_string()))?;

        let store = match var("STORE_BACKEND", "sled").as_str() {
            "memory" => StoreBackend::Memory,
            "sled" => StoreBackend::Sled {
                path: PathBuf::from(var("DATA_DIR", DEFAULT_DATA_DIR)),
            },
            other => {
                return Err(AppError::Config(format!(
                    "STORE_BACKEND must be 'sled' or 'memory', got {:?}",
                    other
                )))
            }
        };

        let request_timeout = var("REQUEST_TIMEOUT_SECS", &DEFAULT_REQUEST_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .ok_or_else(|| AppError::Config("REQUEST_TIMEOUT_SECS must be a positive integer".to_string()))?;

        let chain_id = var("CHAIN_ID", &DEFAULT_CHAIN_ID.to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Config("CHAIN_ID must be an integer".to_string()))?;

        Ok(Self {
            bind_addr,
            log_level: var("LOG_LEVEL", "info"),
            store,
            request_timeout,
            contract: ContractConfig {
                address: var("PREDICTION_CONTRACT_ADDRESS", DEFAULT_CONTRACT_ADDRESS),
                chain_id,
                paymaster_url: var("PAYMASTER_URL", DEFAULT_PAYMASTER_URL),
            },
        })
    }
}
