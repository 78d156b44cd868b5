//! # redb-backed Catalog Storage
//!
//! A disk-backed catalog store using the redb embedded database:
//! - ACID transactions (one redb write transaction per catalog write)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Every logical [`Table`] maps to one redb table of `bytes -> bytes`.
//! Identity sequences live in a separate metadata table.

use super::{CatalogStore, ReadTx, Table, WriteTx};
use crate::CatalogError;
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use std::fmt::Display;
use std::path::Path;

/// Table for identity sequences: table name -> last issued id
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

type RowTable = TableDefinition<'static, &'static [u8], &'static [u8]>;

const fn definition(table: Table) -> RowTable {
    TableDefinition::new(table.name())
}

fn io<E: Display>(e: E) -> CatalogError {
    CatalogError::Storage(e.to_string())
}

fn get_row<T>(table: &T, key: &[u8]) -> Result<Option<Vec<u8>>, CatalogError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    Ok(table.get(key).map_err(io)?.map(|v| v.value().to_vec()))
}

fn scan_rows<T>(table: &T) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CatalogError>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut rows = Vec::new();
    for entry in table.iter().map_err(io)? {
        let (key, value) = entry.map_err(io)?;
        rows.push((key.value().to_vec(), value.value().to_vec()));
    }
    Ok(rows)
}

fn get_sequence<T>(table: &T, name: &str) -> Result<u64, CatalogError>
where
    T: ReadableTable<&'static str, u64>,
{
    Ok(table.get(name).map_err(io)?.map(|v| v.value()).unwrap_or(0))
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

struct RedbRead {
    txn: ReadTransaction,
}

impl ReadTx for RedbRead {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, CatalogError> {
        let rows = self.txn.open_table(definition(table)).map_err(io)?;
        get_row(&rows, key)
    }

    fn scan(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CatalogError> {
        let rows = self.txn.open_table(definition(table)).map_err(io)?;
        scan_rows(&rows)
    }

    fn sequence(&self, table: Table) -> Result<u64, CatalogError> {
        let meta = self.txn.open_table(METADATA).map_err(io)?;
        get_sequence(&meta, table.name())
    }
}

struct RedbWrite<'a> {
    txn: &'a WriteTransaction,
}

impl ReadTx for RedbWrite<'_> {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, CatalogError> {
        let rows = self.txn.open_table(definition(table)).map_err(io)?;
        get_row(&rows, key)
    }

    fn scan(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CatalogError> {
        let rows = self.txn.open_table(definition(table)).map_err(io)?;
        scan_rows(&rows)
    }

    fn sequence(&self, table: Table) -> Result<u64, CatalogError> {
        let meta = self.txn.open_table(METADATA).map_err(io)?;
        get_sequence(&meta, table.name())
    }
}

impl WriteTx for RedbWrite<'_> {
    fn put(&mut self, table: Table, key: &[u8], value: Vec<u8>) -> Result<(), CatalogError> {
        let mut rows = self.txn.open_table(definition(table)).map_err(io)?;
        rows.insert(key, value.as_slice()).map_err(io)?;
        Ok(())
    }

    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, CatalogError> {
        let mut rows = self.txn.open_table(definition(table)).map_err(io)?;
        let removed = rows.remove(key).map_err(io)?.is_some();
        Ok(removed)
    }

    fn set_sequence(&mut self, table: Table, value: u64) -> Result<(), CatalogError> {
        let mut meta = self.txn.open_table(METADATA).map_err(io)?;
        meta.insert(table.name(), value).map_err(io)?;
        Ok(())
    }
}

// =============================================================================
// STORE
// =============================================================================

/// A persistent catalog store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a catalog database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            for table in Table::ALL {
                let _ = write_txn.open_table(definition(table)).map_err(io)?;
            }
            let _ = write_txn.open_table(METADATA).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        tracing::debug!(path = %path.as_ref().display(), "opened redb catalog");
        Ok(Self { db })
    }
}

impl CatalogStore for RedbStore {
    fn read<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&dyn ReadTx) -> Result<T, CatalogError>,
    {
        let txn = self.db.begin_read().map_err(io)?;
        f(&RedbRead { txn })
    }

    fn write<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn WriteTx) -> Result<T, CatalogError>,
    {
        let txn = self.db.begin_write().map_err(io)?;
        let result = f(&mut RedbWrite { txn: &txn });
        match result {
            Ok(value) => {
                txn.commit().map_err(io)?;
                Ok(value)
            }
            Err(e) => {
                txn.abort().map_err(io)?;
                Err(e)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_empty_tables() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        for table in Table::ALL {
            let rows = store.read(|tx| tx.scan(table)).expect("scan");
            assert!(rows.is_empty());
        }
    }

    #[test]
    fn data_survives_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let store = RedbStore::open(&db_path).expect("open db");
            store
                .write(|tx| {
                    let id = tx.next_id(Table::Components)?;
                    tx.put(Table::Components, &id.to_be_bytes(), vec![7, 7])
                })
                .expect("write");
        }

        let store = RedbStore::open(&db_path).expect("reopen db");
        let (row, seq) = store
            .read(|tx| {
                Ok((
                    tx.get(Table::Components, &1u64.to_be_bytes())?,
                    tx.sequence(Table::Components)?,
                ))
            })
            .expect("read");
        assert_eq!(row, Some(vec![7, 7]));
        assert_eq!(seq, 1);
    }

    #[test]
    fn failed_write_is_aborted() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let result: Result<(), _> = store.write(|tx| {
            tx.put(Table::Colors, b"RED", vec![1])?;
            Err(CatalogError::Storage("rejected".to_string()))
        });
        assert!(result.is_err());

        let row = store.read(|tx| tx.get(Table::Colors, b"RED")).expect("read");
        assert!(row.is_none());
    }

    #[test]
    fn delete_reports_presence() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        store
            .write(|tx| tx.put(Table::Reviews, b"k", vec![0]))
            .expect("put");
        let (first, second) = store
            .write(|tx| Ok((tx.delete(Table::Reviews, b"k")?, tx.delete(Table::Reviews, b"k")?)))
            .expect("delete");
        assert!(first);
        assert!(!second);
    }
}
