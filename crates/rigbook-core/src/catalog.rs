//! # Catalog
//!
//! The facade tying the schema registry to a [`CatalogStore`].
//!
//! Every public operation runs inside exactly one store unit of work. Input
//! validation that needs no data (schema checks, quantities, paging) happens
//! before the unit of work opens. Graph operations live in their own modules
//! as further `impl` blocks on [`Catalog`].

use crate::clock::{Clock, SystemClock};
use crate::record::{self, Record, RecordView};
use crate::schema::{Domain, Kind, SchemaRegistry};
use crate::store::{CatalogStore, Table, WriteTx};
use crate::{
    CatalogConfig, CatalogError, ComponentId, Privilege, RawAttributes, RecordId, Ref,
    SubComponentId, Value, compatibility, composition, listing, variant,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Audit fields maintained on every component.
pub(crate) const CREATED_AT: &str = "CreatedAt";
pub(crate) const LAST_EDITED: &str = "LastEdited";

/// A hardware component catalog over a storage collaborator.
pub struct Catalog<S: CatalogStore> {
    pub(crate) store: S,
    pub(crate) config: CatalogConfig,
    pub(crate) clock: Box<dyn Clock>,
}

impl<S: CatalogStore> std::fmt::Debug for Catalog<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: CatalogStore> Catalog<S> {
    /// Create a catalog with the wall clock.
    pub fn new(store: S, config: CatalogConfig) -> Result<Self, CatalogError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            clock: Box::new(SystemClock),
        })
    }

    /// Replace the timestamp source.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // WRITE API
    // =========================================================================

    /// Validate and store a new record of `kind`.
    pub fn create(&self, kind: Kind, attrs: &RawAttributes) -> Result<RecordId, CatalogError> {
        let typed = SchemaRegistry::validate(kind, attrs)?;
        let now = self.clock.now();

        let id = self.store.write(|tx| {
            let domain = kind.domain();
            let raw = tx.next_id(record::table_of(domain))?;
            let id = match domain {
                Domain::Component => RecordId::Component(ComponentId(raw)),
                Domain::SubComponent => RecordId::SubComponent(SubComponentId(raw)),
            };

            let mut values = typed.values;
            if domain == Domain::Component {
                values.insert(CREATED_AT.to_string(), Value::Timestamp(now));
                values.insert(LAST_EDITED.to_string(), Value::Timestamp(now));
            }

            record::save_record(
                tx,
                &Record {
                    id,
                    kind,
                    revision: 1,
                    values,
                },
            )?;
            Ok(id)
        })?;

        tracing::debug!(%id, kind = %kind, "created record");
        Ok(id)
    }

    /// Apply a partial update. Absent fields are unchanged, `null` clears.
    ///
    /// With `expected_revision`, the update fails with `ConcurrencyConflict`
    /// unless the stored revision matches. Returns the new revision.
    pub fn update(
        &self,
        id: RecordId,
        patch: &RawAttributes,
        expected_revision: Option<u64>,
    ) -> Result<u64, CatalogError> {
        let now = self.clock.now();

        let revision = self.store.write(|tx| {
            let mut record = record::load_record(tx, id)?;
            if let Some(expected) = expected_revision {
                if expected != record.revision {
                    return Err(CatalogError::ConcurrencyConflict {
                        target: Ref::Record(id),
                        expected,
                        actual: record.revision,
                    });
                }
            }

            let patch = SchemaRegistry::validate_patch(record.kind, patch)?;
            if patch.is_empty() {
                return Ok(record.revision);
            }

            patch.apply(&mut record.values);
            if record.kind.domain() == Domain::Component {
                record
                    .values
                    .insert(LAST_EDITED.to_string(), Value::Timestamp(now));
            }
            record.revision = record.revision.saturating_add(1);
            record::save_record(tx, &record)?;
            Ok(record.revision)
        })?;

        tracing::debug!(%id, revision, "updated record");
        Ok(revision)
    }

    /// Delete a record, applying the cascade/restrict rules.
    ///
    /// Components: restricted by compatibility edges on either side;
    /// cascades their parts, variants (with color variants), prices and
    /// reviews. Sub-components: restricted while used as a part child;
    /// cascades the parts they contain.
    pub fn delete(&self, id: RecordId) -> Result<(), CatalogError> {
        let cascaded = self.store.write(|tx| {
            record::load_record(tx, id)?;
            match id {
                RecordId::Component(component) => delete_component(tx, component),
                RecordId::SubComponent(sub) => delete_sub_component(tx, sub),
            }
        });

        match &cascaded {
            Ok(rows) => tracing::info!(%id, cascaded = rows, "deleted record"),
            Err(CatalogError::ReferentialIntegrity { blocking_refs }) => {
                tracing::warn!(%id, blocking = blocking_refs.len(), "delete restricted");
            }
            Err(_) => {}
        }
        cascaded.map(|_| ())
    }

    /// Fetch one record, masked for `privilege`.
    pub fn get(&self, id: RecordId, privilege: Privilege) -> Result<RecordView, CatalogError> {
        self.store
            .read(|tx| record::load_record(tx, id))
            .map(|record| record.project(privilege))
    }

    // =========================================================================
    // STATISTICS
    // =========================================================================

    /// Row counts per table and components per kind.
    pub fn stats(&self) -> Result<CatalogStats, CatalogError> {
        self.store.read(|tx| {
            let mut tables = BTreeMap::new();
            for table in Table::ALL {
                tables.insert(table.name().to_string(), tx.scan(table)?.len());
            }

            let mut kinds = BTreeMap::new();
            for domain in [Domain::Component, Domain::SubComponent] {
                for kind in domain.kinds() {
                    kinds.insert(kind.tag().to_string(), 0);
                }
                for record in record::load_records(tx, domain)? {
                    *kinds.entry(record.kind.tag().to_string()).or_insert(0) += 1;
                }
            }

            Ok(CatalogStats {
                tables,
                kinds,
                part_depth: composition::PartGraph::load(tx)?.depth(),
            })
        })
    }
}

fn delete_component(tx: &mut dyn WriteTx, id: ComponentId) -> Result<usize, CatalogError> {
    let blocking: Vec<Ref> = compatibility::edges_touching(tx, id)?
        .into_iter()
        .map(Ref::Compatibility)
        .collect();
    if !blocking.is_empty() {
        return Err(CatalogError::ReferentialIntegrity {
            blocking_refs: blocking,
        });
    }

    let mut cascaded = composition::delete_parts_of(tx, RecordId::Component(id))?;
    cascaded += variant::delete_variants_of(tx, id)?;
    cascaded += listing::delete_listings_of(tx, id)?;
    record::delete_record(tx, RecordId::Component(id))?;
    Ok(cascaded)
}

fn delete_sub_component(tx: &mut dyn WriteTx, id: SubComponentId) -> Result<usize, CatalogError> {
    let blocking: Vec<Ref> = composition::parts_using(tx, id)?
        .into_iter()
        .map(Ref::Part)
        .collect();
    if !blocking.is_empty() {
        return Err(CatalogError::ReferentialIntegrity {
            blocking_refs: blocking,
        });
    }

    let cascaded = composition::delete_parts_of(tx, RecordId::SubComponent(id))?;
    record::delete_record(tx, RecordId::SubComponent(id))?;
    Ok(cascaded)
}

/// Catalog-wide counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    /// Rows per logical table.
    pub tables: BTreeMap<String, usize>,
    /// Records per kind tag, zero counts included.
    pub kinds: BTreeMap<String, usize>,
    /// Longest part-of chain, in edges.
    pub part_depth: usize,
}

// =============================================================================
// TESTS
// =============================================================================
