use super::{incremented, LedgerStore, Record, StoreError, StoreResult, WriteBatch, WriteOp};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use std::path::Path;
use tracing::info;

const RECORD_PREFIX: &str = "record:";
const MEMBER_PREFIX: &str = "member:";

/// Persistent store on a single sled tree.
///
/// Records are JSON-encoded field maps under `record:{key}`. Set membership is
/// one empty-valued entry per member under `member:{set}\0{member}`, so listing
/// a set is a prefix scan and every write is a point operation that fits in a
/// sled transaction.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        info!("💾 Opened sled ledger at {}", path.as_ref().display());
        Ok(Self { db })
    }

    /// Throwaway database removed on drop.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

fn record_key(key: &str) -> Vec<u8> {
    format!("{}{}", RECORD_PREFIX, key).into_bytes()
}

fn member_prefix(set: &str) -> Vec<u8> {
    format!("{}{}\0", MEMBER_PREFIX, set).into_bytes()
}

fn member_key(set: &str, member: &str) -> Vec<u8> {
    let mut key = member_prefix(set);
    key.extend_from_slice(member.as_bytes());
    key
}

fn decode(key: &str, bytes: &[u8]) -> StoreResult<Record> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::malformed(key, e.to_string()))
}

fn encode(key: &str, record: &Record) -> StoreResult<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| StoreError::malformed(key, e.to_string()))
}

fn abort<T>(err: StoreError) -> ConflictableTransactionResult<T, StoreError> {
    Err(ConflictableTransactionError::Abort(err))
}

fn read_in_tx(tx: &TransactionalTree, key: &str) -> ConflictableTransactionResult<Record, StoreError> {
    match tx.get(record_key(key))? {
        Some(bytes) => match decode(key, &bytes) {
            Ok(record) => Ok(record),
            Err(e) => abort(e),
        },
        None => Ok(Record::new()),
    }
}

fn write_in_tx(
    tx: &TransactionalTree,
    key: &str,
    record: &Record,
) -> ConflictableTransactionResult<(), StoreError> {
    let bytes = match encode(key, record) {
        Ok(bytes) => bytes,
        Err(e) => return abort(e),
    };
    tx.insert(record_key(key), bytes)?;
    Ok(())
}

impl LedgerStore for SledStore {
    fn get_record(&self, key: &str) -> StoreResult<Option<Record>> {
        match self.db.get(record_key(key))? {
            Some(bytes) => {
                let record = decode(key, &bytes)?;
                Ok(Some(record).filter(|r| !r.is_empty()))
            }
            None => Ok(None),
        }
    }

    fn list_set_members(&self, set: &str) -> StoreResult<Vec<String>> {
        let prefix = member_prefix(set);
        let mut members = Vec::new();
        for entry in self.db.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let member = String::from_utf8(key[prefix.len()..].to_vec())
                .map_err(|e| StoreError::malformed(set, e.to_string()))?;
            members.push(member);
        }
        Ok(members)
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        // sled may rerun the closure on conflict, so it only reads from `batch`
        let result: Result<(), TransactionError<StoreError>> = self.db.transaction(|tx| {
            for op in batch.ops() {
                match op {
                    WriteOp::SetFields { key, fields } => {
                        let mut record = read_in_tx(tx, key)?;
                        record.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                        write_in_tx(tx, key, &record)?;
                    }
                    WriteOp::IncrementField { key, field, by } => {
                        let mut record = read_in_tx(tx, key)?;
                        let total = match incremented(&record, key, field, *by) {
                            Ok(total) => total,
                            Err(e) => return abort(e),
                        };
                        record.insert(field.clone(), total);
                        write_in_tx(tx, key, &record)?;
                    }
                    WriteOp::DeleteRecord { key } => {
                        tx.remove(record_key(key))?;
                    }
                    WriteOp::AddToSet { set, member } => {
                        tx.insert(member_key(set, member), Vec::<u8>::new())?;
                    }
                    WriteOp::DeleteFromSet { set, member } => {
                        tx.remove(member_key(set, member))?;
                    }
                }
            }
            Ok(())
        });

        result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StoreError::Sled(e),
        })
    }

    fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::TokenAmount;

    fn fields(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_batch_is_visible_as_a_whole() {
        let store = SledStore::temporary().unwrap();
        store.set_fields("market:m1", fields(&[("totalYesAmount", "0")])).unwrap();

        let batch = WriteBatch::new()
            .increment_field("market:m1", "totalYesAmount", TokenAmount::from(100))
            .set_fields("bet:b1", fields(&[("bettor", "alice"), ("amount", "100")]))
            .add_to_set("market:m1:bets", "b1")
            .add_to_set("bets", "b1");
        store.commit(batch).unwrap();

        assert_eq!(store.get_record("market:m1").unwrap().unwrap()["totalYesAmount"], "100");
        assert_eq!(store.get_record("bet:b1").unwrap().unwrap()["bettor"], "alice");
        assert_eq!(store.list_set_members("market:m1:bets").unwrap(), vec!["b1"]);
        assert_eq!(store.list_set_members("bets").unwrap(), vec!["b1"]);
    }

    #[test]
    fn test_aborted_batch_writes_nothing() {
        let store = SledStore::temporary().unwrap();
        store.set_fields("market:m1", fields(&[("totalNoAmount", "abc")])).unwrap();

        let batch = WriteBatch::new()
            .add_to_set("bets", "b1")
            .increment_field("market:m1", "totalNoAmount", TokenAmount::from(1));
        assert!(matches!(store.commit(batch), Err(StoreError::Malformed { .. })));
        assert!(store.list_set_members("bets").unwrap().is_empty());
    }

    #[test]
    fn test_set_names_do_not_bleed_into_each_other() {
        let store = SledStore::temporary().unwrap();
        store.add_to_set("market:m1:bets", "b1").unwrap();
        store.add_to_set("market:m1:bets:extra", "x").unwrap();
        store.add_to_set("market:m10:bets", "b2").unwrap();

        assert_eq!(store.list_set_members("market:m1:bets").unwrap(), vec!["b1"]);
        store.delete_from_set("market:m1:bets", "b1").unwrap();
        assert!(store.list_set_members("market:m1:bets").unwrap().is_empty());
    }

    #[test]
    fn test_delete_record_and_flush() {
        let store = SledStore::temporary().unwrap();
        store.set_fields("bet:b1", fields(&[("bettor", "bob")])).unwrap();
        store.delete_record("bet:b1").unwrap();
        assert!(store.get_record("bet:b1").unwrap().is_none());
        store.flush().unwrap();
    }
}
