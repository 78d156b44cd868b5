//! # rigbook-core
//!
//! The deterministic catalog engine for rigbook - THE LOGIC.
//!
//! Hardware components (CPU, GPU, memory, ...) and their sub-components are
//! stored as typed records validated against a compile-time schema registry.
//! On top of the records sit an acyclic part-of graph with quantities, a
//! directed compatibility graph, purchasable variants with colors, and a
//! generic filter/sort/page query engine that works across every kind.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Owns no I/O beyond its storage collaborator ([`store::CatalogStore`])
//! - Runs every check-then-commit sequence inside one store transaction
//! - Is deterministic: BTreeMap only, no floats, identity as final tiebreak
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod clock;
pub mod compatibility;
pub mod composition;
pub mod config;
pub mod formats;
pub mod listing;
pub mod primitives;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod types;
pub mod variant;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CatalogError, ColorCode, ColorVariantId, CompatibilityId, ComponentId, Constraint, Decimal,
    FieldViolation, PartId, PriceId, Privilege, RawAttributes, RawValue, RecordId, Ref, ReviewId,
    SubComponentId, Value, VariantId,
};

// =============================================================================
// RE-EXPORTS: Catalog Engine
// =============================================================================

pub use catalog::{Catalog, CatalogStats};
pub use clock::{Clock, FixedClock, SystemClock};
pub use compatibility::Compatibility;
pub use composition::PartEdge;
pub use config::CatalogConfig;
pub use listing::{Price, Review};
pub use query::{
    Direction, FieldFilter, OrderBy, Paging, QueryPage, QuerySpec, QueryTarget, RangeFilter,
};
pub use record::{Record, RecordView};
pub use schema::{ComponentKind, Domain, FieldType, Kind, SchemaRegistry, SubComponentKind};
pub use store::{CatalogStore, MemoryStore, RedbStore};
pub use variant::{Color, ColorVariant, Variant, VariantView};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{Snapshot, SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
