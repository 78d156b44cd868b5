//! # Compatibility Graph
//!
//! Directed "works with" edges between components. Adding `A -> B` never
//! implies `B -> A`; both views are served by scanning the edge arena.

use crate::catalog::Catalog;
use crate::record;
use crate::store::{self, CatalogStore, ReadTx, Table};
use crate::{CatalogError, CompatibilityId, ComponentId, Constraint, Ref};
use serde::{Deserialize, Serialize};

/// One directed compatibility edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    pub id: CompatibilityId,
    pub source: ComponentId,
    pub target: ComponentId,
}

fn all_edges<R: ReadTx + ?Sized>(tx: &R) -> Result<Vec<Compatibility>, CatalogError> {
    store::load_all(tx, Table::Compatibilities)
}

/// Edges with `component` on either side.
pub(crate) fn edges_touching<R: ReadTx + ?Sized>(
    tx: &R,
    component: ComponentId,
) -> Result<Vec<CompatibilityId>, CatalogError> {
    Ok(all_edges(tx)?
        .into_iter()
        .filter(|edge| edge.source == component || edge.target == component)
        .map(|edge| edge.id)
        .collect())
}

impl<S: CatalogStore> Catalog<S> {
    /// Record that `source` works with `target`.
    ///
    /// Adding an existing pair returns the existing edge.
    pub fn add_compatibility(
        &self,
        source: ComponentId,
        target: ComponentId,
    ) -> Result<CompatibilityId, CatalogError> {
        if source == target && !self.config.allow_self_compatibility {
            return Err(CatalogError::invalid("target", Constraint::SelfReference));
        }

        let id = self.store.write(|tx| {
            record::require_component(tx, source)?;
            record::require_component(tx, target)?;

            if let Some(existing) = all_edges(tx)?
                .into_iter()
                .find(|edge| edge.source == source && edge.target == target)
            {
                return Ok(existing.id);
            }

            let id = CompatibilityId(tx.next_id(Table::Compatibilities)?);
            store::save(
                tx,
                Table::Compatibilities,
                &store::id_key(id.0),
                &Compatibility { id, source, target },
            )?;
            Ok(id)
        })?;

        tracing::debug!(%id, %source, %target, "added compatibility");
        Ok(id)
    }

    pub fn remove_compatibility(&self, id: CompatibilityId) -> Result<(), CatalogError> {
        self.store.write(|tx| {
            if !tx.delete(Table::Compatibilities, &store::id_key(id.0))? {
                return Err(CatalogError::NotFound(Ref::Compatibility(id)));
            }
            Ok(())
        })?;
        tracing::info!(%id, "removed compatibility");
        Ok(())
    }

    /// Outgoing edges of `component`, in edge-id order.
    pub fn compatible_from(&self, component: ComponentId) -> Result<Vec<Compatibility>, CatalogError> {
        self.store.read(|tx| {
            record::require_component(tx, component)?;
            Ok(all_edges(tx)?
                .into_iter()
                .filter(|edge| edge.source == component)
                .collect())
        })
    }

    /// Incoming edges of `component`, in edge-id order.
    pub fn compatible_to(&self, component: ComponentId) -> Result<Vec<Compatibility>, CatalogError> {
        self.store.read(|tx| {
            record::require_component(tx, component)?;
            Ok(all_edges(tx)?
                .into_iter()
                .filter(|edge| edge.target == component)
                .collect())
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
