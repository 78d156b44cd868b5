//! # Snapshot Format
//!
//! Whole-catalog export and import.
//!
//! Format: Header (5 bytes) + postcard-serialized [`Snapshot`].
//! - 4 bytes: Magic ("RBOK")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::catalog::Catalog;
use crate::compatibility::Compatibility;
use crate::composition::{PartEdge, PartGraph};
use crate::listing::{Price, Review};
use crate::record;
use crate::schema::Domain;
use crate::store::{self, CatalogStore, ReadTx, Table};
use crate::variant::{Color, ColorVariant, Variant};
use crate::{CatalogError, ColorCode, RecordId, Ref, VariantId, primitives};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Largest accepted snapshot, header included.
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024; // 500 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(CatalogError::Deserialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(CatalogError::Deserialization(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let [a, b, c, d] = self.magic;
        [a, b, c, d, self.version]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CatalogError> {
        match bytes {
            [a, b, c, d, version, ..] => Ok(Self {
                magic: [*a, *b, *c, *d],
                version: *version,
            }),
            _ => Err(CatalogError::Deserialization(
                "Header too short".to_string(),
            )),
        }
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Raw rows and id sequence of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDump {
    pub table: String,
    pub sequence: u64,
    pub rows: Vec<(Vec<u8>, Vec<u8>)>,
}

/// Every table of a catalog, in [`Table::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tables: Vec<TableDump>,
}

impl Snapshot {
    fn capture<R: ReadTx + ?Sized>(tx: &R) -> Result<Self, CatalogError> {
        let tables = Table::ALL
            .iter()
            .map(|&table| {
                Ok(TableDump {
                    table: table.name().to_string(),
                    sequence: tx.sequence(table)?,
                    rows: tx.scan(table)?,
                })
            })
            .collect::<Result<_, CatalogError>>()?;
        Ok(Self { tables })
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|dump| dump.rows.len()).sum()
    }
}

fn table_named(name: &str) -> Result<Table, CatalogError> {
    Table::ALL
        .iter()
        .copied()
        .find(|table| table.name() == name)
        .ok_or_else(|| CatalogError::Deserialization(format!("unknown table {name}")))
}

// =============================================================================
// REFERENCE CHECKS
// =============================================================================

/// Decode every table and fail with `NotFound` on the first row whose
/// reference does not resolve. Tables are checked parents first.
fn check_references<R: ReadTx + ?Sized>(tx: &R) -> Result<(), CatalogError> {
    let mut records = BTreeSet::new();
    for domain in [Domain::Component, Domain::SubComponent] {
        records.extend(record::load_records(tx, domain)?.into_iter().map(|r| r.id));
    }
    let require = |id: RecordId| {
        if records.contains(&id) {
            Ok(())
        } else {
            Err(CatalogError::NotFound(Ref::Record(id)))
        }
    };

    for edge in store::load_all::<PartEdge, R>(tx, Table::Parts)? {
        require(edge.parent)?;
        require(edge.child.into())?;
    }
    for edge in store::load_all::<Compatibility, R>(tx, Table::Compatibilities)? {
        require(edge.source.into())?;
        require(edge.target.into())?;
    }

    let colors: BTreeSet<ColorCode> = store::load_all::<Color, R>(tx, Table::Colors)?
        .into_iter()
        .map(|color| color.code)
        .collect();
    let mut variants: BTreeSet<VariantId> = BTreeSet::new();
    for variant in store::load_all::<Variant, R>(tx, Table::Variants)? {
        require(variant.component.into())?;
        variants.insert(variant.id);
    }
    for bridge in store::load_all::<ColorVariant, R>(tx, Table::ColorVariants)? {
        if !variants.contains(&bridge.variant) {
            return Err(CatalogError::NotFound(Ref::Variant(bridge.variant)));
        }
        if !colors.contains(&bridge.color) {
            return Err(CatalogError::NotFound(Ref::Color(bridge.color)));
        }
    }

    for price in store::load_all::<Price, R>(tx, Table::Prices)? {
        require(price.component.into())?;
    }
    for review in store::load_all::<Review, R>(tx, Table::Reviews)? {
        require(review.component.into())?;
    }
    Ok(())
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Encode a snapshot (header + payload).
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, CatalogError> {
    let payload =
        postcard::to_stdvec(snapshot).map_err(|e| CatalogError::Serialization(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode a snapshot after checking its size and header.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, CatalogError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CatalogError::Deserialization(format!(
            "Data too short: minimum {HEADER_SIZE} bytes required"
        )));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(CatalogError::Deserialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    postcard::from_bytes(payload)
        .map_err(|e| CatalogError::Deserialization(format!("Failed to decode snapshot: {e}")))
}

// =============================================================================
// CATALOG API
// =============================================================================

impl<S: CatalogStore> Catalog<S> {
    /// Export every table within one read transaction.
    pub fn export_snapshot(&self) -> Result<Vec<u8>, CatalogError> {
        let snapshot = self.store.read(|tx| Snapshot::capture(tx))?;
        let bytes = snapshot_to_bytes(&snapshot)?;
        tracing::info!(rows = snapshot.row_count(), bytes = bytes.len(), "exported snapshot");
        Ok(bytes)
    }

    /// Load a snapshot into an empty catalog.
    ///
    /// Every row is decoded, every reference resolved and the composition
    /// graph checked for cycles before the transaction commits. Any failure
    /// leaves the catalog empty.
    pub fn import_snapshot(&self, bytes: &[u8]) -> Result<usize, CatalogError> {
        let snapshot = snapshot_from_bytes(bytes)?;

        self.store.write(|tx| {
            for table in Table::ALL {
                if !tx.scan(table)?.is_empty() {
                    return Err(CatalogError::Storage(format!(
                        "cannot import into non-empty table {}",
                        table.name()
                    )));
                }
            }

            for dump in &snapshot.tables {
                let table = table_named(&dump.table)?;
                for (key, value) in &dump.rows {
                    tx.put(table, key, value.clone())?;
                }
                tx.set_sequence(table, dump.sequence)?;
            }

            if let Err(err) = check_references(&*tx) {
                tracing::warn!(%err, "snapshot rejected: dangling reference");
                return Err(err);
            }
            if let Some(path) = PartGraph::load(tx)?.find_cycle() {
                tracing::warn!(?path, "snapshot rejected: composition cycle");
                return Err(CatalogError::CycleDetected { path });
            }
            Ok(())
        })?;

        let rows = snapshot.row_count();
        tracing::info!(rows, "imported snapshot");
        Ok(rows)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::schema::{ComponentKind, Kind, SubComponentKind};
    use crate::store::{MemoryStore, WriteTx};
    use crate::{
        CatalogConfig, ColorVariantId, CompatibilityId, ComponentId, Decimal, PartId, PriceId,
        RawAttributes, ReviewId, SubComponentId,
    };
    use chrono::{TimeZone, Utc};

    fn catalog() -> Catalog<MemoryStore> {
        Catalog::new(MemoryStore::new(), CatalogConfig::default()).expect("catalog")
    }

    fn socket(catalog: &Catalog<MemoryStore>, name: &str) -> SubComponentId {
        let raw: RawAttributes = [("Name", name.into()), ("Socket", "AM5".into())]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        match catalog
            .create(Kind::SubComponent(SubComponentKind::CoolerSocket), &raw)
            .expect("create")
        {
            RecordId::SubComponent(id) => id,
            RecordId::Component(_) => unreachable!("socket is a sub-component"),
        }
    }

    fn cooler(catalog: &Catalog<MemoryStore>) -> ComponentId {
        let raw: RawAttributes = [
            ("Name", "NH-D15".into()),
            ("Manufacturer", "Noctua".into()),
            ("CoolerType", "Air".into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        match catalog
            .create(Kind::Component(ComponentKind::Cooler), &raw)
            .expect("create")
        {
            RecordId::Component(id) => id,
            RecordId::SubComponent(_) => unreachable!("cooler is a component"),
        }
    }

    /// Write a row straight into the store, bypassing every check.
    fn forge<T: Serialize>(catalog: &Catalog<MemoryStore>, table: Table, key: &[u8], row: &T) {
        catalog
            .store()
            .write(|tx| store::save(tx, table, key, row))
            .expect("forge");
    }

    /// Import `source` into a fresh catalog and check nothing was committed.
    fn import_into_empty(source: &Catalog<MemoryStore>) -> Result<usize, CatalogError> {
        let bytes = source.export_snapshot().expect("export");
        let target = catalog();
        let result = target.import_snapshot(&bytes);
        if result.is_err() {
            let stats = target.stats().expect("stats");
            assert!(stats.tables.values().all(|&rows| rows == 0), "{stats:?}");
        }
        result
    }

    fn assert_missing(result: Result<usize, CatalogError>, expected: Ref) {
        match result {
            Err(CatalogError::NotFound(found)) => assert_eq!(found, expected),
            other => panic!("expected NotFound({expected}), got {other:?}"),
        }
    }

    fn record_ref(id: impl Into<RecordId>) -> Ref {
        Ref::Record(id.into())
    }

    #[test]
    fn header_roundtrip() {
        let restored =
            SnapshotHeader::from_bytes(&SnapshotHeader::new().to_bytes()).expect("parse header");
        assert_eq!(restored, SnapshotHeader::new());
        restored.validate().expect("valid");
    }

    #[test]
    fn rejects_short_and_foreign_data() {
        assert!(snapshot_from_bytes(b"RBO").is_err());
        assert!(snapshot_from_bytes(b"KREM\x01\x00").is_err());
        assert!(snapshot_from_bytes(b"RBOK\x09\x00").is_err());
    }

    #[test]
    fn export_import_preserves_rows_and_sequences() {
        let source = catalog();
        let a = socket(&source, "A");
        let b = socket(&source, "B");
        source.add_part(a.into(), b, 2).expect("part");
        let bytes = source.export_snapshot().expect("export");

        let target = catalog();
        let rows = target.import_snapshot(&bytes).expect("import");
        assert_eq!(rows, 3);
        assert_eq!(target.expand(a.into()).expect("expand")[&b], 2);

        let c = socket(&target, "C");
        assert_eq!(c, SubComponentId(3));
    }

    #[test]
    fn import_requires_empty_catalog() {
        let source = catalog();
        socket(&source, "A");
        let bytes = source.export_snapshot().expect("export");
        assert!(matches!(
            source.import_snapshot(&bytes),
            Err(CatalogError::Storage(_))
        ));
    }

    #[test]
    fn cyclic_snapshot_rejected() {
        let source = catalog();
        let a = socket(&source, "A");
        let b = socket(&source, "B");
        source.add_part(a.into(), b, 1).expect("part");
        // Forge the back edge directly in the store.
        source
            .store()
            .write(|tx| {
                let id = PartId(tx.next_id(Table::Parts)?);
                let edge = PartEdge {
                    id,
                    parent: b.into(),
                    child: a,
                    quantity: 1,
                    revision: 1,
                };
                store::save(tx, Table::Parts, &store::id_key(id.0), &edge)
            })
            .expect("forge");
        let bytes = source.export_snapshot().expect("export");

        let target = catalog();
        assert!(matches!(
            target.import_snapshot(&bytes),
            Err(CatalogError::CycleDetected { .. })
        ));
        assert_eq!(target.stats().expect("stats").tables["sub_components"], 0);
    }

    #[test]
    fn part_edge_to_missing_child_rejected() {
        let source = catalog();
        let a = socket(&source, "A");
        let edge = PartEdge {
            id: PartId(1),
            parent: a.into(),
            child: SubComponentId(999),
            quantity: 1,
            revision: 1,
        };
        forge(&source, Table::Parts, &store::id_key(1), &edge);

        assert_missing(import_into_empty(&source), record_ref(SubComponentId(999)));
    }

    #[test]
    fn part_edge_from_missing_parent_rejected() {
        let source = catalog();
        let a = socket(&source, "A");
        let edge = PartEdge {
            id: PartId(1),
            parent: ComponentId(42).into(),
            child: a,
            quantity: 3,
            revision: 1,
        };
        forge(&source, Table::Parts, &store::id_key(1), &edge);

        assert_missing(import_into_empty(&source), record_ref(ComponentId(42)));
    }

    #[test]
    fn compatibility_to_missing_component_rejected() {
        let source = catalog();
        let fan = cooler(&source);
        let edge = Compatibility {
            id: CompatibilityId(1),
            source: fan,
            target: ComponentId(77),
        };
        forge(&source, Table::Compatibilities, &store::id_key(1), &edge);

        assert_missing(import_into_empty(&source), record_ref(ComponentId(77)));
    }

    #[test]
    fn variant_of_missing_component_rejected() {
        let source = catalog();
        let variant = Variant {
            id: VariantId(1),
            component: ComponentId(5),
            available: true,
            price_delta: None,
        };
        forge(&source, Table::Variants, &store::id_key(1), &variant);

        assert_missing(import_into_empty(&source), record_ref(ComponentId(5)));
    }

    #[test]
    fn color_variant_of_missing_variant_rejected() {
        let source = catalog();
        source.add_color(&ColorCode::new("BLK"), "Black").expect("color");
        let bridge = ColorVariant {
            id: ColorVariantId(1),
            variant: VariantId(9),
            color: ColorCode::new("BLK"),
        };
        forge(&source, Table::ColorVariants, &store::id_key(1), &bridge);

        assert_missing(import_into_empty(&source), Ref::Variant(VariantId(9)));
    }

    #[test]
    fn color_variant_with_missing_color_rejected() {
        let source = catalog();
        let fan = cooler(&source);
        let variant = source.add_variant(fan, true, None).expect("variant");
        let bridge = ColorVariant {
            id: ColorVariantId(1),
            variant,
            color: ColorCode::new("RED"),
        };
        forge(&source, Table::ColorVariants, &store::id_key(1), &bridge);

        assert_missing(import_into_empty(&source), Ref::Color(ColorCode::new("RED")));
    }

    #[test]
    fn price_of_missing_component_rejected() {
        let source = catalog();
        let price = Price {
            id: PriceId(1),
            component: ComponentId(3),
            retailer: "Newegg".to_string(),
            amount: Decimal::from_int(99),
            recorded_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("timestamp"),
        };
        forge(&source, Table::Prices, &store::id_key(1), &price);

        assert_missing(import_into_empty(&source), record_ref(ComponentId(3)));
    }

    #[test]
    fn review_of_missing_component_rejected() {
        let source = catalog();
        let review = Review {
            id: ReviewId(1),
            component: ComponentId(8),
            rating: 4,
            body: "quiet".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("timestamp"),
        };
        forge(&source, Table::Reviews, &store::id_key(1), &review);

        assert_missing(import_into_empty(&source), record_ref(ComponentId(8)));
    }

    #[test]
    fn undecodable_color_row_rejected() {
        let source = catalog();
        source
            .store()
            .write(|tx| tx.put(Table::Colors, b"BLK", vec![0xff, 0xff, 0xff]))
            .expect("forge");

        assert!(matches!(
            import_into_empty(&source),
            Err(CatalogError::Deserialization(_))
        ));
    }

    #[test]
    fn fully_linked_catalog_imports() {
        let source = catalog();
        let fan = cooler(&source);
        let a = socket(&source, "A");
        source.add_part(fan.into(), a, 2).expect("part");
        source.add_color(&ColorCode::new("BLK"), "Black").expect("color");
        let variant = source.add_variant(fan, true, None).expect("variant");
        source
            .add_color_variant(variant, &ColorCode::new("BLK"))
            .expect("bridge");
        source
            .add_price(fan, "Newegg", Decimal::from_int(99))
            .expect("price");
        source.add_review(fan, 5, "quiet").expect("review");

        assert_eq!(import_into_empty(&source).expect("import"), 8);
    }
}
