/// Whisper Prediction Market
/// Binary Yes/No markets with token-denominated pools, served over HTTP.
/// Exports all modules for use as a library crate

pub mod amount;
pub mod app_state;
pub mod config;
pub mod contract;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod store;

pub use amount::{parse_ether, AmountError, TokenAmount};
pub use app_state::{AppState, SharedState};
pub use config::{Config, StoreBackend};
pub use contract::{ContractCall, ContractConfig, TransactionRequest};
pub use error::{AppError, LedgerError, LedgerResult};
pub use ledger::{is_permitted, BetLedger, MarketLocks, MarketRegistry};
pub use models::{Bet, BetFilter, CreateMarketRequest, Market, MarketFilter, PoolOdds, Visibility};
pub use routes::{router, router_with_timeout};
pub use store::{LedgerStore, MemoryStore, Record, SledStore, StoreError, WriteBatch, WriteOp};
