//! # Composition Graph
//!
//! Part-of edges from a component or sub-component to a child
//! sub-component, each with a quantity of at least one.
//!
//! All edges live in one arena (the `parts` table) keyed by edge identity;
//! adjacency is rebuilt from the arena inside the unit of work that needs
//! it, so the cycle check and the commit of `add_part` see the same state.
//!
//! ## Invariants
//!
//! - The graph over both relation kinds is acyclic.
//! - Distinct edges are never merged, even between the same endpoints.

use crate::catalog::Catalog;
use crate::primitives::MIN_PART_QUANTITY;
use crate::record;
use crate::store::{self, CatalogStore, ReadTx, Table, WriteTx};
use crate::{CatalogError, Constraint, PartId, RecordId, Ref, SubComponentId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One part-of edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartEdge {
    pub id: PartId,
    pub parent: RecordId,
    pub child: SubComponentId,
    pub quantity: u32,
    /// Bumped on every quantity change.
    pub revision: u64,
}

/// Adjacency lists over the part arena, children in edge-id order.
#[derive(Debug, Default)]
pub(crate) struct PartGraph {
    children: BTreeMap<RecordId, Vec<(SubComponentId, u32)>>,
}

impl PartGraph {
    pub(crate) fn from_edges<'a>(edges: impl IntoIterator<Item = &'a PartEdge>) -> Self {
        let mut children: BTreeMap<RecordId, Vec<(SubComponentId, u32)>> = BTreeMap::new();
        for edge in edges {
            children
                .entry(edge.parent)
                .or_default()
                .push((edge.child, edge.quantity));
        }
        Self { children }
    }

    pub(crate) fn load<R: ReadTx + ?Sized>(tx: &R) -> Result<Self, CatalogError> {
        let edges: Vec<PartEdge> = store::load_all(tx, Table::Parts)?;
        Ok(Self::from_edges(&edges))
    }

    fn children_of(&self, node: RecordId) -> &[(SubComponentId, u32)] {
        self.children.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Depth-first search for a path `from -> ... -> to`.
    fn path_between(&self, from: SubComponentId, to: SubComponentId) -> Option<Vec<SubComponentId>> {
        let mut came_from: BTreeMap<SubComponentId, SubComponentId> = BTreeMap::new();
        let mut visited = BTreeSet::from([from]);
        let mut stack = vec![from];

        while let Some(node) = stack.pop() {
            if node == to {
                let mut path = vec![to];
                let mut current = to;
                while let Some(previous) = came_from.get(&current) {
                    path.push(*previous);
                    current = *previous;
                }
                path.reverse();
                return Some(path);
            }
            for (child, _) in self.children_of(node.into()) {
                if visited.insert(*child) {
                    came_from.insert(*child, node);
                    stack.push(*child);
                }
            }
        }
        None
    }

    /// The cycle an edge `parent -> child` would close, if any.
    pub(crate) fn cycle_through(
        &self,
        parent: RecordId,
        child: SubComponentId,
    ) -> Option<Vec<SubComponentId>> {
        // Components are never children, so only sub-component parents can
        // close a cycle.
        let RecordId::SubComponent(parent) = parent else {
            return None;
        };
        if parent == child {
            return Some(vec![parent, parent]);
        }
        self.path_between(child, parent).map(|path| {
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(parent);
            cycle.extend(path);
            cycle
        })
    }

    /// Any cycle present in the graph.
    pub(crate) fn find_cycle(&self) -> Option<Vec<SubComponentId>> {
        let mut done = BTreeSet::new();
        let mut stack = Vec::new();
        self.children
            .keys()
            .filter_map(|parent| match parent {
                RecordId::SubComponent(id) => Some(*id),
                RecordId::Component(_) => None,
            })
            .find_map(|start| self.cycle_from(start, &mut done, &mut stack))
    }

    fn cycle_from(
        &self,
        node: SubComponentId,
        done: &mut BTreeSet<SubComponentId>,
        stack: &mut Vec<SubComponentId>,
    ) -> Option<Vec<SubComponentId>> {
        if done.contains(&node) {
            return None;
        }
        if let Some(position) = stack.iter().position(|n| *n == node) {
            let mut cycle = stack[position..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }

        stack.push(node);
        for (child, _) in self.children_of(node.into()) {
            if let Some(cycle) = self.cycle_from(*child, done, stack) {
                return Some(cycle);
            }
        }
        stack.pop();
        done.insert(node);
        None
    }

    /// Leaf sub-components reachable from `root` with aggregated quantity.
    ///
    /// Quantities multiply along a path and sum across paths.
    pub(crate) fn expand(&self, root: RecordId) -> Result<BTreeMap<SubComponentId, u64>, CatalogError> {
        let mut memo = BTreeMap::new();
        let mut active = Vec::new();
        self.leaf_totals(root, &mut memo, &mut active)
    }

    fn leaf_totals(
        &self,
        node: RecordId,
        memo: &mut BTreeMap<SubComponentId, BTreeMap<SubComponentId, u64>>,
        active: &mut Vec<SubComponentId>,
    ) -> Result<BTreeMap<SubComponentId, u64>, CatalogError> {
        let mut totals: BTreeMap<SubComponentId, u64> = BTreeMap::new();

        for (child, quantity) in self.children_of(node) {
            let quantity = u64::from(*quantity);
            if self.children_of((*child).into()).is_empty() {
                let slot = totals.entry(*child).or_insert(0);
                *slot = slot.saturating_add(quantity);
                continue;
            }

            if let Some(position) = active.iter().position(|n| n == child) {
                let mut path = active[position..].to_vec();
                path.push(*child);
                return Err(CatalogError::CycleDetected { path });
            }

            let below = match memo.get(child) {
                Some(cached) => cached.clone(),
                None => {
                    active.push(*child);
                    let computed = self.leaf_totals((*child).into(), memo, active)?;
                    active.pop();
                    memo.insert(*child, computed.clone());
                    computed
                }
            };
            for (leaf, count) in below {
                let slot = totals.entry(leaf).or_insert(0);
                *slot = slot.saturating_add(count.saturating_mul(quantity));
            }
        }

        Ok(totals)
    }

    /// Longest chain of part edges, counted in edges.
    pub(crate) fn depth(&self) -> usize {
        let mut memo = BTreeMap::new();
        self.children
            .keys()
            .map(|node| self.depth_from(*node, &mut memo, &mut BTreeSet::new()))
            .max()
            .unwrap_or(0)
    }

    fn depth_from(
        &self,
        node: RecordId,
        memo: &mut BTreeMap<RecordId, usize>,
        active: &mut BTreeSet<RecordId>,
    ) -> usize {
        if let Some(depth) = memo.get(&node) {
            return *depth;
        }
        if !active.insert(node) {
            return 0;
        }
        let depth = self
            .children_of(node)
            .iter()
            .map(|(child, _)| 1 + self.depth_from((*child).into(), memo, active))
            .max()
            .unwrap_or(0);
        active.remove(&node);
        memo.insert(node, depth);
        depth
    }
}

fn load_edge<R: ReadTx + ?Sized>(tx: &R, id: PartId) -> Result<PartEdge, CatalogError> {
    store::load(tx, Table::Parts, &store::id_key(id.0))?.ok_or(CatalogError::NotFound(Ref::Part(id)))
}

fn check_quantity(quantity: u32) -> Result<(), CatalogError> {
    if quantity < MIN_PART_QUANTITY {
        return Err(CatalogError::invalid(
            "Quantity",
            Constraint::MinQuantity(MIN_PART_QUANTITY),
        ));
    }
    Ok(())
}

fn all_edges<R: ReadTx + ?Sized>(tx: &R) -> Result<Vec<PartEdge>, CatalogError> {
    store::load_all(tx, Table::Parts)
}

/// Edges that use `child` as their child, in edge-id order.
pub(crate) fn parts_using<R: ReadTx + ?Sized>(
    tx: &R,
    child: SubComponentId,
) -> Result<Vec<PartId>, CatalogError> {
    Ok(all_edges(tx)?
        .into_iter()
        .filter(|edge| edge.child == child)
        .map(|edge| edge.id)
        .collect())
}

/// Remove every edge owned by `parent`; returns how many were removed.
pub(crate) fn delete_parts_of(tx: &mut dyn WriteTx, parent: RecordId) -> Result<usize, CatalogError> {
    let owned: Vec<PartId> = all_edges(tx)?
        .into_iter()
        .filter(|edge| edge.parent == parent)
        .map(|edge| edge.id)
        .collect();
    for id in &owned {
        tx.delete(Table::Parts, &store::id_key(id.0))?;
    }
    Ok(owned.len())
}

// =============================================================================
// GRAPH API
// =============================================================================

impl<S: CatalogStore> Catalog<S> {
    /// Attach `quantity` units of `child` to `parent`.
    ///
    /// Rejected with `CycleDetected` (and no mutation) when `parent` is
    /// reachable from `child`. The check and the insert run in one unit of
    /// work.
    pub fn add_part(
        &self,
        parent: RecordId,
        child: SubComponentId,
        quantity: u32,
    ) -> Result<PartId, CatalogError> {
        check_quantity(quantity)?;

        let result = self.store.write(|tx| {
            record::load_record(tx, parent)?;
            record::require_sub_component(tx, child)?;

            let edges = all_edges(tx)?;
            if let Some(path) = PartGraph::from_edges(&edges).cycle_through(parent, child) {
                return Err(CatalogError::CycleDetected { path });
            }

            let id = PartId(tx.next_id(Table::Parts)?);
            store::save(
                tx,
                Table::Parts,
                &store::id_key(id.0),
                &PartEdge {
                    id,
                    parent,
                    child,
                    quantity,
                    revision: 1,
                },
            )?;
            Ok(id)
        });

        match &result {
            Ok(id) => tracing::debug!(%id, %parent, %child, quantity, "added part"),
            Err(CatalogError::CycleDetected { path }) => {
                tracing::warn!(%parent, %child, length = path.len(), "part rejected: cycle");
            }
            Err(_) => {}
        }
        result
    }

    pub fn remove_part(&self, id: PartId) -> Result<(), CatalogError> {
        self.store.write(|tx| {
            if !tx.delete(Table::Parts, &store::id_key(id.0))? {
                return Err(CatalogError::NotFound(Ref::Part(id)));
            }
            Ok(())
        })?;
        tracing::info!(%id, "removed part");
        Ok(())
    }

    /// Change an edge's quantity if it is still at `expected_revision`.
    ///
    /// Returns the new revision.
    pub fn set_part_quantity(
        &self,
        id: PartId,
        quantity: u32,
        expected_revision: u64,
    ) -> Result<u64, CatalogError> {
        check_quantity(quantity)?;

        let revision = self.store.write(|tx| {
            let mut edge = load_edge(tx, id)?;
            if edge.revision != expected_revision {
                return Err(CatalogError::ConcurrencyConflict {
                    target: Ref::Part(id),
                    expected: expected_revision,
                    actual: edge.revision,
                });
            }
            edge.quantity = quantity;
            edge.revision = edge.revision.saturating_add(1);
            store::save(tx, Table::Parts, &store::id_key(id.0), &edge)?;
            Ok(edge.revision)
        })?;

        tracing::debug!(%id, quantity, revision, "changed part quantity");
        Ok(revision)
    }

    /// Direct parts of `parent`, in insertion order.
    pub fn list_parts(&self, parent: RecordId) -> Result<Vec<PartEdge>, CatalogError> {
        self.store.read(|tx| {
            record::load_record(tx, parent)?;
            Ok(all_edges(tx)?
                .into_iter()
                .filter(|edge| edge.parent == parent)
                .collect())
        })
    }

    pub fn get_part(&self, id: PartId) -> Result<PartEdge, CatalogError> {
        self.store.read(|tx| load_edge(tx, id))
    }

    /// Flatten `parent` into leaf sub-components with aggregated quantity.
    pub fn expand(&self, parent: RecordId) -> Result<BTreeMap<SubComponentId, u64>, CatalogError> {
        self.store.read(|tx| {
            record::load_record(tx, parent)?;
            PartGraph::load(tx)?.expand(parent)
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
