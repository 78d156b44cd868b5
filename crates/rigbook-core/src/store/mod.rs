//! # Entity Store Contract
//!
//! The catalog never touches storage structures directly. It runs every
//! operation inside one unit of work supplied by a [`CatalogStore`]:
//!
//! - [`CatalogStore::read`] gives a consistent snapshot view.
//! - [`CatalogStore::write`] gives an exclusive transaction that is
//!   committed only when the closure returns `Ok`. Any `Err` discards every
//!   staged change, so a rejected write leaves no partial mutation.
//!
//! Rows are opaque postcard bytes keyed by big-endian identities, which keeps
//! table scans in identity order on every backend.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::CatalogError;
use serde::Serialize;
use serde::de::DeserializeOwned;

// =============================================================================
// TABLES
// =============================================================================

/// Logical tables of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Components,
    SubComponents,
    Parts,
    Compatibilities,
    Colors,
    Variants,
    ColorVariants,
    Prices,
    Reviews,
}

impl Table {
    pub const ALL: [Self; 9] = [
        Self::Components,
        Self::SubComponents,
        Self::Parts,
        Self::Compatibilities,
        Self::Colors,
        Self::Variants,
        Self::ColorVariants,
        Self::Prices,
        Self::Reviews,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Components => "components",
            Self::SubComponents => "sub_components",
            Self::Parts => "parts",
            Self::Compatibilities => "compatibilities",
            Self::Colors => "colors",
            Self::Variants => "variants",
            Self::ColorVariants => "color_variants",
            Self::Prices => "prices",
            Self::Reviews => "reviews",
        }
    }
}

// =============================================================================
// TRANSACTION TRAITS
// =============================================================================

/// Read access inside a unit of work.
pub trait ReadTx {
    fn get(&self, table: Table, key: &[u8]) -> Result<Option<Vec<u8>>, CatalogError>;

    /// Every row of `table`, in ascending key order.
    fn scan(&self, table: Table) -> Result<Vec<(Vec<u8>, Vec<u8>)>, CatalogError>;

    /// Last identity handed out for `table` (0 when none).
    fn sequence(&self, table: Table) -> Result<u64, CatalogError>;
}

/// Write access inside a unit of work.
pub trait WriteTx: ReadTx {
    fn put(&mut self, table: Table, key: &[u8], value: Vec<u8>) -> Result<(), CatalogError>;

    /// Returns whether a row was removed.
    fn delete(&mut self, table: Table, key: &[u8]) -> Result<bool, CatalogError>;

    fn set_sequence(&mut self, table: Table, value: u64) -> Result<(), CatalogError>;

    /// Allocate the next identity for `table`, starting at 1.
    fn next_id(&mut self, table: Table) -> Result<u64, CatalogError> {
        let next = self
            .sequence(table)?
            .checked_add(1)
            .ok_or_else(|| CatalogError::Storage(format!("{} sequence exhausted", table.name())))?;
        self.set_sequence(table, next)?;
        Ok(next)
    }
}

/// A storage collaborator providing atomic units of work.
pub trait CatalogStore: Send + Sync {
    fn read<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&dyn ReadTx) -> Result<T, CatalogError>;

    fn write<T, F>(&self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&mut dyn WriteTx) -> Result<T, CatalogError>;
}

// =============================================================================
// TYPED ROW HELPERS
// =============================================================================

/// Storage key of a surrogate identity.
#[must_use]
pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Decode a surrogate identity key.
pub fn key_id(key: &[u8]) -> Result<u64, CatalogError> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| CatalogError::Deserialization(format!("bad key length {}", key.len())))?;
    Ok(u64::from_be_bytes(bytes))
}

pub fn encode<T: Serialize>(row: &T) -> Result<Vec<u8>, CatalogError> {
    postcard::to_allocvec(row).map_err(|e| CatalogError::Serialization(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CatalogError> {
    postcard::from_bytes(bytes).map_err(|e| CatalogError::Deserialization(e.to_string()))
}

/// Load and decode one row.
pub fn load<T, R>(tx: &R, table: Table, key: &[u8]) -> Result<Option<T>, CatalogError>
where
    T: DeserializeOwned,
    R: ReadTx + ?Sized,
{
    tx.get(table, key)?.map(|bytes| decode(&bytes)).transpose()
}

/// Load and decode every row of a table, in key order.
pub fn load_all<T, R>(tx: &R, table: Table) -> Result<Vec<T>, CatalogError>
where
    T: DeserializeOwned,
    R: ReadTx + ?Sized,
{
    tx.scan(table)?
        .iter()
        .map(|(_, bytes)| decode(bytes))
        .collect()
}

/// Encode and store one row.
pub fn save<T, W>(tx: &mut W, table: Table, key: &[u8], row: &T) -> Result<(), CatalogError>
where
    T: Serialize,
    W: WriteTx + ?Sized,
{
    tx.put(table, key, encode(row)?)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_keys_sort_numerically() {
        let mut keys = vec![id_key(256), id_key(2), id_key(1 << 40)];
        keys.sort();
        let ids: Vec<_> = keys.iter().map(|k| key_id(k).expect("key")).collect();
        assert_eq!(ids, vec![2, 256, 1 << 40]);
    }

    #[test]
    fn short_key_rejected() {
        assert!(matches!(
            key_id(&[1, 2, 3]),
            Err(CatalogError::Deserialization(_))
        ));
    }

    #[test]
    fn table_names_are_unique() {
        let names: std::collections::BTreeSet<_> = Table::ALL.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), Table::ALL.len());
    }
}
