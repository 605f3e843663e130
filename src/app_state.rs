// Application state shared by every handler

use std::sync::Arc;
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::contract::ContractConfig;
use crate::error::Result;
use crate::ledger::{BetLedger, MarketLocks, MarketRegistry};
use crate::store::{LedgerStore, MemoryStore, SledStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub markets: MarketRegistry,
    pub bets: BetLedger,
    pub contract: ContractConfig,
    store: Arc<dyn LedgerStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, contract: ContractConfig) -> Self {
        let markets = MarketRegistry::new(store.clone(), Arc::new(MarketLocks::new()));
        let bets = BetLedger::new(markets.clone());
        Self {
            markets,
            bets,
            contract,
            store,
        }
    }

    /// Fresh state on a volatile store.
    pub fn in_memory() -> SharedState {
        Arc::new(Self::new(Arc::new(MemoryStore::new()), ContractConfig::default()))
    }

    pub fn from_config(config: &Config) -> Result<SharedState> {
        let store: Arc<dyn LedgerStore> = match &config.store {
            StoreBackend::Memory => {
                info!("🧠 Using in-memory ledger store (nothing is persisted)");
                Arc::new(MemoryStore::new())
            }
            StoreBackend::Sled { path } => Arc::new(SledStore::open(path)?),
        };
        Ok(Arc::new(Self::new(store, config.contract.clone())))
    }

    /// Persist outstanding writes; called on shutdown.
    pub fn flush(&self) -> Result<()> {
        self.store.flush()?;
        Ok(())
    }
}
