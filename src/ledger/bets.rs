use tracing::{debug, info, warn};

use super::{access, now_millis, serialize, MarketRegistry};
use crate::amount::TokenAmount;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Bet, BetFilter, Market};
use crate::store::{keys, WriteBatch};

/// Validates and records bets, keeping market pools in step.
#[derive(Clone)]
pub struct BetLedger {
    registry: MarketRegistry,
}

impl BetFilter {
    pub fn matches(&self, bet: &Bet) -> bool {
        self.market_id.as_ref().map_or(true, |m| &bet.market_id == m)
            && self.bettor.as_ref().map_or(true, |b| &bet.bettor == b)
    }
}

impl BetLedger {
    pub fn new(registry: MarketRegistry) -> Self {
        Self { registry }
    }

    /// Place a bet on an open, unexpired market the bettor may access.
    pub fn place_bet(
        &self,
        market_id: &str,
        bettor: &str,
        outcome: bool,
        amount: &str,
    ) -> LedgerResult<Bet> {
        self.place_bet_at(market_id, bettor, outcome, amount, now_millis())
    }

    pub(crate) fn place_bet_at(
        &self,
        market_id: &str,
        bettor: &str,
        outcome: bool,
        amount: &str,
        now: i64,
    ) -> LedgerResult<Bet> {
        // Held until the batch is committed: the checks below and the pool
        // increment must see the same market state.
        let handle = self.registry.locks().handle(market_id);
        let _serial = serialize(&handle);

        let market = self.registry.get_locked(market_id, &handle)?;
        check_open(&market, bettor, now)?;

        let amount = TokenAmount::parse_positive(amount)?;
        if market.pool(outcome).checked_add(amount).is_none() {
            return Err(LedgerError::Validation(format!(
                "Bet of {} would overflow the pool of market {}",
                amount, market_id
            )));
        }

        let bet = Bet {
            id: format!("bet_{}", uuid::Uuid::new_v4().simple()),
            market_id: market.id.clone(),
            bettor: bettor.to_string(),
            outcome,
            amount,
            timestamp: now,
        };

        self.registry.store().commit(
            WriteBatch::new()
                .increment_field(keys::market(&market.id), Market::pool_field(outcome), amount)
                .set_fields(keys::bet(&bet.id), bet.to_fields())
                .add_to_set(keys::market_bets(&market.id), bet.id.as_str())
                .add_to_set(keys::BETS, bet.id.as_str()),
        )?;

        info!(
            "🎯 Bet {}: {} staked {} on {} in {}",
            bet.id,
            bet.bettor,
            bet.amount,
            if outcome { "YES" } else { "NO" },
            bet.market_id
        );
        Ok(bet)
    }

    /// Every bet matching all supplied filters.
    pub fn list(&self, filter: &BetFilter) -> LedgerResult<Vec<Bet>> {
        let store = self.registry.store();
        let index = match &filter.market_id {
            Some(market_id) => keys::market_bets(market_id),
            None => keys::BETS.to_string(),
        };

        let mut bets = Vec::new();
        for id in store.list_set_members(&index)? {
            let key = keys::bet(&id);
            let Some(record) = store.get_record(&key)? else {
                warn!("⚠️  Bet index {} points at missing record {}", index, id);
                continue;
            };
            let bet = Bet::from_fields(&key, &record)?;
            if filter.matches(&bet) {
                bets.push(bet);
            }
        }
        debug!("Listed {} bets from {}", bets.len(), index);
        Ok(bets)
    }
}

fn check_open(market: &Market, bettor: &str, now: i64) -> LedgerResult<()> {
    if market.resolved {
        debug!("Rejected bet on resolved market {}", market.id);
        return Err(LedgerError::MarketClosed(market.id.clone()));
    }
    if market.is_expired_at(now) {
        debug!("Rejected bet on expired market {}", market.id);
        return Err(LedgerError::MarketExpired(market.id.clone()));
    }
    if !access::is_permitted(market, bettor) {
        debug!("Rejected bet by {} on private market {}", bettor, market.id);
        return Err(LedgerError::AccessDenied(market.id.clone()));
    }
    Ok(())
}
