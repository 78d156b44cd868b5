//! In-memory catalog store.
//!
//! Writers hold the exclusive lock for the whole unit of work and stage
//! their changes in an overlay; the overlay is folded into the tables only
//! when the closure succeeds.

use super::{CatalogStore, ReadTx, Table, WriteTx};
use crate::CatalogError;
use std::collections::BTreeMap;
use std::sync::RwLock;

type Rows = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Debug, Default)]
struct MemoryTables {
    rows: BTreeMap<Table, Rows>,
    sequences: BTreeMap<Table, u64>,
}

impl ReadTx for MemoryTables {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, CatalogError> {
        Ok(self.rows.get(&table).and_then(|t| t.get(key)).cloned())
    }

    fn scan(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CatalogError> {
        Ok(self
            .rows
            .get(&table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn sequence(&self, table: Table) -> Result<u64, CatalogError> {
        Ok(self.sequences.get(&table).copied().unwrap_or(0))
    }
}

/// Pending changes of one write. `None` marks a deletion.
struct Staged<'a> {
    base: &'a MemoryTables,
    rows: BTreeMap<(Table, Vec<u8>), Option<Vec<u8>>>,
    sequences: BTreeMap<Table, u64>,
}

impl ReadTx for Staged<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, CatalogError> {
        match self.rows.get(&(table, key.to_vec())) {
            Some(staged) => Ok(staged.clone()),
            None => self.base.get(table, key),
        }
    }

    fn scan(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CatalogError> {
        let mut merged: Rows = self.base.rows.get(&table).cloned().unwrap_or_default();
        for ((t, key), staged) in &self.rows {
            if *t != table {
                continue;
            }
            match staged {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    fn sequence(&self, table: Table) -> Result<u64, CatalogError> {
        match self.sequences.get(&table) {
            Some(value) => Ok(*value),
            None => self.base.sequence(table),
        }
    }
}

impl WriteTx for Staged<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: Vec<u8>) -> Result<(), CatalogError> {
        self.rows.insert((table, key.to_vec()), Some(value));
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, CatalogError> {
        let existed = self.get(table, key)?.is_some();
        self.rows.insert((table, key.to_vec()), None);
        Ok(existed)
    }

    fn set_sequence(&mut self, table: Table, value: u64) -> Result<(), CatalogError> {
        self.sequences.insert(table, value);
        Ok(())
    }
}

/// A volatile catalog store backed by ordered maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> CatalogError {
    CatalogError::Storage("memory store lock poisoned".to_string())
}

impl CatalogStore for MemoryStore {
    fn read<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&dyn ReadTx) -> Result<T, CatalogError>,
    {
        let tables = self.tables.read().map_err(poisoned)?;
        f(&*tables)
    }

    fn write<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn WriteTx) -> Result<T, CatalogError>,
    {
        let mut tables = self.tables.write().map_err(poisoned)?;

        let mut staged = Staged {
            base: &tables,
            rows: BTreeMap::new(),
            sequences: BTreeMap::new(),
        };
        let result = f(&mut staged)?;
        let Staged {
            rows, sequences, ..
        } = staged;

        for ((table, key), change) in rows {
            let target = tables.rows.entry(table).or_default();
            match change {
                Some(value) => {
                    target.insert(key, value);
                }
                None => {
                    target.remove(&key);
                }
            }
        }
        tables.sequences.extend(sequences);

        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn committed_writes_are_visible() {
        let store = MemoryStore::new();
        store
            .write(|tx| {
                let id = tx.next_id(Table::Colors)?;
                assert_eq!(id, 1);
                tx.put(Table::Colors, b"BLK", vec![1])
            })
            .expect("write");

        let value = store
            .read(|tx| tx.get(Table::Colors, b"BLK"))
            .expect("read");
        assert_eq!(value, Some(vec![1]));
        assert_eq!(store.read(|tx| tx.sequence(Table::Colors)).expect("seq"), 1);
    }

    #[test]
    fn failed_write_leaves_no_trace() {
        let store = MemoryStore::new();
        let result: Result<(), _> = store.write(|tx| {
            tx.next_id(Table::Parts)?;
            tx.put(Table::Parts, b"k", vec![9])?;
            Err(CatalogError::Storage("boom".to_string()))
        });
        assert!(result.is_err());

        let (rows, seq) = store
            .read(|tx| Ok((tx.scan(Table::Parts)?, tx.sequence(Table::Parts)?)))
            .expect("read");
        assert!(rows.is_empty());
        assert_eq!(seq, 0);
    }

    #[test]
    fn scan_merges_staged_changes_in_key_order() {
        let store = MemoryStore::new();
        store
            .write(|tx| {
                tx.put(Table::Colors, b"b", vec![2])?;
                tx.put(Table::Colors, b"d", vec![4])
            })
            .expect("seed");

        store
            .write(|tx| {
                tx.put(Table::Colors, b"a", vec![1])?;
                assert!(tx.delete(Table::Colors, b"d")?);
                assert!(!tx.delete(Table::Colors, b"zz")?);
                let keys: Vec<_> = tx
                    .scan(Table::Colors)?
                    .into_iter()
                    .map(|(k, _)| k)
                    .collect();
                assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
                Ok(())
            })
            .expect("write");
    }
}
