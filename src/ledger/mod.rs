// ============================================================================
// Ledger Module - Market Registry, Bet Ledger and Access Policy
// ============================================================================
//
//   - markets: market creation, lookup, filtering, resolution and purge
//   - bets:    bet validation, pool accounting and bet lookup
//   - access:  who may see and bet on non-public markets
//
// Writes that touch one market (bet placement, resolution, deletion) are
// serialized through `MarketLocks`, and each of them lands in the store as a
// single atomic `WriteBatch`.
//
// ============================================================================

pub mod access;
pub mod bets;
pub mod markets;

pub use access::is_permitted;
pub use bets::BetLedger;
pub use markets::MarketRegistry;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Current time in Unix milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One mutex per market id.
#[derive(Debug, Default)]
pub struct MarketLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MarketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, market_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(market_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock of a purged market.
    pub fn forget(&self, market_id: &str) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(market_id);
    }

    /// Drop the entry taken for an id that turned out not to exist, unless
    /// another caller still holds a handle to it.
    pub fn release_unknown(&self, market_id: &str, handle: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = locks
            .get(market_id)
            .map_or(false, |entry| Arc::ptr_eq(entry, handle) && Arc::strong_count(entry) <= 2);
        if idle {
            locks.remove(market_id);
        }
    }

    /// Number of markets with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Take a market handle's guard. The mutex protects no data, so a panic in
/// another holder leaves nothing inconsistent behind.
pub(crate) fn serialize(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
