//! # Records
//!
//! One stored row per component or sub-component. The discriminator
//! ([`Kind`]) travels with the row and selects its schema; the identity
//! variant selects its table.

use crate::schema::{Domain, FieldDef, Kind, KindSchema, SchemaRegistry, Slot};
use crate::store::{self, ReadTx, Table, WriteTx};
use crate::{CatalogError, ComponentId, Privilege, RecordId, Ref, SubComponentId, Value};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A stored component or sub-component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: Kind,
    /// Bumped on every successful update.
    pub revision: u64,
    /// Stored fields only; `Id` and `Type` are derived.
    pub values: BTreeMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn schema(&self) -> &'static KindSchema {
        SchemaRegistry::schema(self.kind)
    }

    /// The value of a resolved field, if present.
    #[must_use]
    pub fn value(&self, def: &FieldDef) -> Option<Cow<'_, Value>> {
        match def.slot {
            Slot::Id => Some(Cow::Owned(Value::Int(
                i64::try_from(self.id.raw()).unwrap_or(i64::MAX),
            ))),
            Slot::Kind => Some(Cow::Owned(Value::Text(self.kind.tag().to_string()))),
            Slot::Stored => self.values.get(def.name).map(Cow::Borrowed),
        }
    }

    /// Project the record for a caller, masking privileged fields.
    #[must_use]
    pub fn project(&self, privilege: Privilege) -> RecordView {
        let fields = self
            .schema()
            .fields()
            .filter(|def| privilege.is_privileged() || !def.privileged)
            .filter_map(|def| {
                self.value(def)
                    .map(|value| (def.name.to_string(), value.into_owned()))
            })
            .collect();
        RecordView {
            id: self.id,
            kind: self.kind,
            revision: self.revision,
            fields,
        }
    }
}

/// A caller-facing projection of a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: RecordId,
    pub kind: Kind,
    pub revision: u64,
    pub fields: BTreeMap<String, Value>,
}

impl RecordView {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

// =============================================================================
// STORAGE HELPERS
// =============================================================================

pub(crate) const fn table_of(domain: Domain) -> Table {
    match domain {
        Domain::Component => Table::Components,
        Domain::SubComponent => Table::SubComponents,
    }
}

fn id_domain(id: RecordId) -> Domain {
    match id {
        RecordId::Component(_) => Domain::Component,
        RecordId::SubComponent(_) => Domain::SubComponent,
    }
}

fn check_row(record: Record, domain: Domain) -> Result<Record, CatalogError> {
    if record.kind.domain() != domain || id_domain(record.id) != domain {
        return Err(CatalogError::Deserialization(format!(
            "{} row tagged {} in {} table",
            record.id,
            record.kind,
            domain.name()
        )));
    }
    Ok(record)
}

/// Load a record or fail with `NotFound`.
pub(crate) fn load_record<R: ReadTx + ?Sized>(tx: &R, id: RecordId) -> Result<Record, CatalogError> {
    let domain = id_domain(id);
    let record: Record = store::load(tx, table_of(domain), &store::id_key(id.raw()))?
        .ok_or(CatalogError::NotFound(Ref::Record(id)))?;
    check_row(record, domain)
}

/// Every record of a domain, in identity order.
pub(crate) fn load_records<R: ReadTx + ?Sized>(
    tx: &R,
    domain: Domain,
) -> Result<Vec<Record>, CatalogError> {
    store::load_all::<Record, R>(tx, table_of(domain))?
        .into_iter()
        .map(|record| check_row(record, domain))
        .collect()
}

pub(crate) fn save_record<W: WriteTx + ?Sized>(tx: &mut W, record: &Record) -> Result<(), CatalogError> {
    let table = table_of(id_domain(record.id));
    store::save(tx, table, &store::id_key(record.id.raw()), record)
}

pub(crate) fn delete_record<W: WriteTx + ?Sized>(tx: &mut W, id: RecordId) -> Result<(), CatalogError> {
    tx.delete(table_of(id_domain(id)), &store::id_key(id.raw()))?;
    Ok(())
}

/// Fail with `NotFound` unless the component exists.
pub(crate) fn require_component<R: ReadTx + ?Sized>(
    tx: &R,
    id: ComponentId,
) -> Result<Record, CatalogError> {
    load_record(tx, RecordId::Component(id))
}

pub(crate) fn require_sub_component<R: ReadTx + ?Sized>(
    tx: &R,
    id: SubComponentId,
) -> Result<Record, CatalogError> {
    load_record(tx, RecordId::SubComponent(id))
}

// =============================================================================
// TESTS
// =============================================================================
