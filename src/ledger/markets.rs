use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::{access, now_millis, serialize, MarketLocks};
use crate::amount::TokenAmount;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    CreateMarketRequest, Market, MarketFilter, Visibility, FIELD_OUTCOME, FIELD_RESOLVED,
};
use crate::store::{keys, LedgerStore, WriteBatch};

/// Creates, reads, filters, resolves and purges markets.
#[derive(Clone)]
pub struct MarketRegistry {
    store: Arc<dyn LedgerStore>,
    locks: Arc<MarketLocks>,
}

impl MarketFilter {
    pub fn matches(&self, market: &Market) -> bool {
        self.category.as_ref().map_or(true, |c| &market.category == c)
            && self.visibility.map_or(true, |v| market.visibility == v)
            && self.creator.as_ref().map_or(true, |c| &market.creator == c)
            && self.resolved.map_or(true, |r| market.resolved == r)
            && self.tag.as_ref().map_or(true, |t| market.has_tag(t))
            && self.viewer.as_ref().map_or(true, |v| access::is_permitted(market, v))
    }
}

fn required(value: Option<String>, name: &str) -> LedgerResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LedgerError::Validation(format!("Missing required field: {}", name)))
}

impl MarketRegistry {
    pub fn new(store: Arc<dyn LedgerStore>, locks: Arc<MarketLocks>) -> Self {
        Self { store, locks }
    }

    pub(crate) fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub(crate) fn locks(&self) -> &Arc<MarketLocks> {
        &self.locks
    }

    /// Create a new open market with empty pools.
    pub fn create(&self, request: CreateMarketRequest) -> LedgerResult<Market> {
        let question = required(request.question, "question")?;
        let description = required(request.description, "description")?;
        let creator = required(request.creator, "creator")?;
        let expires_at = request
            .expires_at
            .filter(|at| *at > 0)
            .ok_or_else(|| LedgerError::Validation("Missing required field: expiresAt".into()))?;
        let category = required(request.category, "category")?;
        let visibility: Visibility = required(request.visibility, "visibility")?
            .parse()
            .map_err(LedgerError::Validation)?;

        let market = Market {
            id: format!("market_{}", uuid::Uuid::new_v4().simple()),
            question,
            description,
            creator,
            created_at: now_millis(),
            expires_at,
            total_yes_amount: TokenAmount::ZERO,
            total_no_amount: TokenAmount::ZERO,
            resolved: false,
            outcome: None,
            category,
            tags: request.tags.unwrap_or_default(),
            visibility,
            access_list: match visibility {
                Visibility::Private => Some(request.access_list.unwrap_or_default()),
                Visibility::Public | Visibility::Whisper => None,
            },
        };

        self.store.commit(
            WriteBatch::new()
                .set_fields(keys::market(&market.id), market.to_fields())
                .add_to_set(keys::MARKETS, market.id.as_str()),
        )?;

        info!(
            "📊 Market created: {} ({}, {}) by {}",
            market.id, market.category, market.visibility, market.creator
        );
        Ok(market)
    }

    /// `get` for a caller holding the market's lock handle. A miss releases the
    /// handle's entry so unknown ids do not pile up in `MarketLocks`.
    pub(crate) fn get_locked(&self, id: &str, handle: &Arc<Mutex<()>>) -> LedgerResult<Market> {
        let result = self.get(id);
        if let Err(LedgerError::NotFound(_)) = &result {
            self.locks.release_unknown(id, handle);
        }
        result
    }

    pub fn get(&self, id: &str) -> LedgerResult<Market> {
        let key = keys::market(id);
        let record = self
            .store
            .get_record(&key)?
            .ok_or_else(|| LedgerError::NotFound(format!("Market {}", id)))?;
        Ok(Market::from_fields(&key, &record)?)
    }

    /// Every market matching all supplied filters, in index order.
    pub fn list(&self, filter: &MarketFilter) -> LedgerResult<Vec<Market>> {
        let mut markets = Vec::new();
        for id in self.store.list_set_members(keys::MARKETS)? {
            let key = keys::market(&id);
            let Some(record) = self.store.get_record(&key)? else {
                warn!("⚠️  Market index points at missing record {}", id);
                continue;
            };
            let market = Market::from_fields(&key, &record)?;
            if filter.matches(&market) {
                markets.push(market);
            }
        }
        debug!("Listed {} markets", markets.len());
        Ok(markets)
    }

    /// Fix the outcome of a market. Resolution is final.
    pub fn resolve(&self, id: &str, outcome: bool) -> LedgerResult<Market> {
        let handle = self.locks.handle(id);
        let _serial = serialize(&handle);

        let mut market = self.get_locked(id, &handle)?;
        if market.resolved {
            debug!("Rejected re-resolution of {}", id);
            return Err(LedgerError::MarketClosed(id.to_string()));
        }

        market.resolved = true;
        market.outcome = Some(outcome);
        let fields = [
            (FIELD_RESOLVED.to_string(), "true".to_string()),
            (FIELD_OUTCOME.to_string(), outcome.to_string()),
        ];
        self.store
            .set_fields(&keys::market(id), fields.into_iter().collect())?;

        info!("✅ Market resolved: {} -> {}", id, if outcome { "YES" } else { "NO" });
        Ok(market)
    }

    /// Purge a market together with its bets and indices.
    pub fn delete(&self, id: &str) -> LedgerResult<()> {
        let handle = self.locks.handle(id);
        let _serial = serialize(&handle);

        // existence check
        self.get_locked(id, &handle)?;

        let market_bets = keys::market_bets(id);
        let bet_ids = self.store.list_set_members(&market_bets)?;
        let mut batch = WriteBatch::new()
            .delete_record(keys::market(id))
            .delete_from_set(keys::MARKETS, id);
        for bet_id in &bet_ids {
            batch = batch
                .delete_record(keys::bet(bet_id))
                .delete_from_set(market_bets.as_str(), bet_id.as_str())
                .delete_from_set(keys::BETS, bet_id.as_str());
        }
        self.store.commit(batch)?;
        self.locks.forget(id);

        info!("🗑️  Market deleted: {} ({} bets purged)", id, bet_ids.len());
        Ok(())
    }
}
