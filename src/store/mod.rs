// ============================================================================
// Ledger Store - key/value + set persistence behind a trait
// ============================================================================
//
// Every market and bet lives in a flat hash record; relationships live in
// membership sets. The registry and the bet ledger only ever talk to
// `dyn LedgerStore`, so the backend can be swapped:
//   - memory: process-local, used by tests and throwaway runs
//   - sled:   embedded on-disk database
//
// Multi-key updates go through `WriteBatch`, which a backend must apply
// atomically. Pool totals are bumped with `WriteOp::IncrementField` inside the
// same batch that writes the bet, never by read-then-write from the caller.
//
// ============================================================================

pub mod memory;
pub mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::amount::TokenAmount;
use std::collections::BTreeMap;
use thiserror::Error;

/// A flat hash record: field name -> string value.
pub type Record = BTreeMap<String, String>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("malformed record {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("field {field} of {key} would overflow")]
    Overflow { key: String, field: String },

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn malformed(key: &str, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Key layout of the ledger store.
pub mod keys {
    /// Set of every market id.
    pub const MARKETS: &str = "markets";
    /// Set of every bet id.
    pub const BETS: &str = "bets";

    pub fn market(id: &str) -> String {
        format!("market:{}", id)
    }

    pub fn market_bets(id: &str) -> String {
        format!("market:{}:bets", id)
    }

    pub fn bet(id: &str) -> String {
        format!("bet:{}", id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Merge fields into a record, creating it if needed.
    SetFields { key: String, fields: Record },
    /// Add to a decimal integer field; a missing field counts as zero.
    IncrementField { key: String, field: String, by: TokenAmount },
    AddToSet { set: String, member: String },
    DeleteRecord { key: String },
    DeleteFromSet { set: String, member: String },
}

/// Ordered group of writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fields(mut self, key: impl Into<String>, fields: Record) -> Self {
        self.ops.push(WriteOp::SetFields { key: key.into(), fields });
        self
    }

    pub fn increment_field(
        mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        by: TokenAmount,
    ) -> Self {
        self.ops.push(WriteOp::IncrementField {
            key: key.into(),
            field: field.into(),
            by,
        });
        self
    }

    pub fn add_to_set(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(WriteOp::AddToSet { set: set.into(), member: member.into() });
        self
    }

    pub fn delete_record(mut self, key: impl Into<String>) -> Self {
        self.ops.push(WriteOp::DeleteRecord { key: key.into() });
        self
    }

    pub fn delete_from_set(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(WriteOp::DeleteFromSet { set: set.into(), member: member.into() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Add `by` to the decimal value stored under `field`, shared by every backend.
pub(crate) fn incremented(
    record: &Record,
    key: &str,
    field: &str,
    by: TokenAmount,
) -> StoreResult<String> {
    let current = match record.get(field) {
        Some(raw) => TokenAmount::parse(raw)
            .map_err(|e| StoreError::malformed(key, format!("{}: {}", field, e)))?,
        None => TokenAmount::ZERO,
    };
    current
        .checked_add(by)
        .map(|total| total.to_string())
        .ok_or_else(|| StoreError::Overflow {
            key: key.to_string(),
            field: field.to_string(),
        })
}

pub trait LedgerStore: Send + Sync {
    /// Fetch a record. An empty record is reported as absent.
    fn get_record(&self, key: &str) -> StoreResult<Option<Record>>;

    fn list_set_members(&self, set: &str) -> StoreResult<Vec<String>>;

    /// Apply every operation of the batch, or none of them.
    fn commit(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Make committed writes durable. No-op for volatile backends.
    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }

    fn set_fields(&self, key: &str, fields: Record) -> StoreResult<()> {
        self.commit(WriteBatch::new().set_fields(key, fields))
    }

    fn increment_field(&self, key: &str, field: &str, by: TokenAmount) -> StoreResult<()> {
        self.commit(WriteBatch::new().increment_field(key, field, by))
    }

    fn add_to_set(&self, set: &str, member: &str) -> StoreResult<()> {
        self.commit(WriteBatch::new().add_to_set(set, member))
    }

    fn delete_record(&self, key: &str) -> StoreResult<()> {
        self.commit(WriteBatch::new().delete_record(key))
    }

    fn delete_from_set(&self, set: &str, member: &str) -> StoreResult<()> {
        self.commit(WriteBatch::new().delete_from_set(set, member))
    }
}
