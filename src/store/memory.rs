use super::{incremented, LedgerStore, Record, StoreError, StoreResult, WriteBatch, WriteOp};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<String, Record>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-process store. One mutex guards everything, so a batch is trivially
/// atomic with respect to readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn get_record(&self, key: &str) -> StoreResult<Option<Record>> {
        let tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.records.get(key).filter(|r| !r.is_empty()).cloned())
    }

    fn list_set_members(&self, set: &str) -> StoreResult<Vec<String>> {
        let tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .sets
            .get(set)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tables = self.tables.lock().map_err(|_| StoreError::Poisoned)?;

        // Stage record changes first so a failing increment leaves nothing behind.
        let mut staged: HashMap<String, Option<Record>> = HashMap::new();
        for op in batch.ops() {
            match op {
                WriteOp::SetFields { key, fields } => {
                    let record = staged_record(&mut staged, &tables, key);
                    record.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                WriteOp::IncrementField { key, field, by } => {
                    let record = staged_record(&mut staged, &tables, key);
                    let total = incremented(record, key, field, *by)?;
                    record.insert(field.clone(), total);
                }
                WriteOp::DeleteRecord { key } => {
                    staged.insert(key.clone(), None);
                }
                WriteOp::AddToSet { .. } | WriteOp::DeleteFromSet { .. } => {}
            }
        }

        for (key, record) in staged {
            match record {
                Some(record) => {
                    tables.records.insert(key, record);
                }
                None => {
                    tables.records.remove(&key);
                }
            }
        }

        for op in batch.ops() {
            match op {
                WriteOp::AddToSet { set, member } => {
                    tables.sets.entry(set.clone()).or_default().insert(member.clone());
                }
                WriteOp::DeleteFromSet { set, member } => {
                    let emptied = match tables.sets.get_mut(set) {
                        Some(members) => {
                            members.remove(member);
                            members.is_empty()
                        }
                        None => false,
                    };
                    if emptied {
                        tables.sets.remove(set);
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn staged_record<'a>(
    staged: &'a mut HashMap<String, Option<Record>>,
    tables: &Tables,
    key: &str,
) -> &'a mut Record {
    let slot = staged
        .entry(key.to_string())
        .or_insert_with(|| Some(tables.records.get(key).cloned().unwrap_or_default()));
    // a record deleted earlier in the batch is recreated from scratch
    slot.get_or_insert_with(Record::new)
}
