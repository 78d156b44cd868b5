//! # Attribute Schema Registry
//!
//! Declares, per component and sub-component kind, the typed attribute set
//! and its validation constraints.
//!
//! Kinds form a closed sum ([`Kind`]); each variant maps to exactly one
//! static [`KindSchema`]. Adding a kind means adding one enum variant, one
//! tag, and one schema table in [`tables`].
//!
//! Field names are resolved against these tables once, at the API boundary.
//! Past that point the engine works with `&'static FieldDef` handles.

mod tables;
mod validate;

pub use validate::{Patch, TypedRecord};

use crate::{Decimal, RawAttributes};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// KINDS
// =============================================================================

/// Top-level catalogable hardware kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Cpu,
    Gpu,
    Memory,
    Motherboard,
    Psu,
    Case,
    CaseFan,
    Cooler,
    Storage,
    Monitor,
}

impl ComponentKind {
    pub const ALL: [Self; 10] = [
        Self::Cpu,
        Self::Gpu,
        Self::Memory,
        Self::Motherboard,
        Self::Psu,
        Self::Case,
        Self::CaseFan,
        Self::Cooler,
        Self::Storage,
        Self::Monitor,
    ];

    /// The discriminator tag stored with every record of this kind.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
            Self::Memory => "Memory",
            Self::Motherboard => "Motherboard",
            Self::Psu => "PSU",
            Self::Case => "Case",
            Self::CaseFan => "CaseFan",
            Self::Cooler => "Cooler",
            Self::Storage => "Storage",
            Self::Monitor => "Monitor",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

/// Reusable parts attachable to components or other sub-components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubComponentKind {
    PcieSlot,
    M2Slot,
    OnboardEthernet,
    IntegratedGraphics,
    Port,
    CoolerSocket,
}

impl SubComponentKind {
    pub const ALL: [Self; 6] = [
        Self::PcieSlot,
        Self::M2Slot,
        Self::OnboardEthernet,
        Self::IntegratedGraphics,
        Self::Port,
        Self::CoolerSocket,
    ];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::PcieSlot => "PCIeSlot",
            Self::M2Slot => "M2Slot",
            Self::OnboardEthernet => "OnboardEthernet",
            Self::IntegratedGraphics => "IntegratedGraphics",
            Self::Port => "Port",
            Self::CoolerSocket => "CoolerSocket",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

/// Which record table a kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Domain {
    Component,
    SubComponent,
}

impl Domain {
    /// Every leaf kind of this domain, in declaration order.
    #[must_use]
    pub fn kinds(self) -> Vec<Kind> {
        match self {
            Self::Component => ComponentKind::ALL.into_iter().map(Kind::Component).collect(),
            Self::SubComponent => SubComponentKind::ALL
                .into_iter()
                .map(Kind::SubComponent)
                .collect(),
        }
    }

    /// Fields shared by every kind of this domain.
    #[must_use]
    pub fn base_fields(self) -> &'static [FieldDef] {
        match self {
            Self::Component => tables::COMPONENT_BASE,
            Self::SubComponent => tables::SUB_COMPONENT_BASE,
        }
    }

    /// Name of the abstract base kind (`"Component"` / `"SubComponent"`).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Component => "Component",
            Self::SubComponent => "SubComponent",
        }
    }
}

/// A concrete leaf kind: the discriminator of every stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    Component(ComponentKind),
    SubComponent(SubComponentKind),
}

impl Kind {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Component(k) => k.tag(),
            Self::SubComponent(k) => k.tag(),
        }
    }

    #[must_use]
    pub const fn domain(self) -> Domain {
        match self {
            Self::Component(_) => Domain::Component,
            Self::SubComponent(_) => Domain::SubComponent,
        }
    }

    /// Resolve a discriminator tag in either domain.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        ComponentKind::from_tag(tag)
            .map(Self::Component)
            .or_else(|| SubComponentKind::from_tag(tag).map(Self::SubComponent))
    }

    /// Every leaf kind across both domains.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut kinds = Domain::Component.kinds();
        kinds.extend(Domain::SubComponent.kinds());
        kinds
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// FIELD DEFINITIONS
// =============================================================================

/// Declared type and bounds of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int { min: i64, max: i64 },
    Decimal { min: Decimal, max: Decimal },
    /// Length measured in characters.
    Text { min_len: usize, max_len: usize },
    Bool,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// UTC instant; only produced by the catalog itself.
    Timestamp,
    Enum(&'static [&'static str]),
}

impl FieldType {
    /// Whether range filters apply to this type.
    #[must_use]
    pub const fn is_rangeable(&self) -> bool {
        matches!(
            self,
            Self::Int { .. } | Self::Decimal { .. } | Self::Date | Self::Timestamp
        )
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int { .. } => "integer",
            Self::Decimal { .. } => "decimal",
            Self::Text { .. } => "text",
            Self::Bool => "bool",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::Enum(_) => "enum",
        }
    }
}

/// Where a field's value lives on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The record identity.
    Id,
    /// The discriminator tag.
    Kind,
    /// An entry of the record's value map.
    Stored,
}

/// One declared field of a kind schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub slot: Slot,
    /// Callers may supply this field on create/update.
    pub writable: bool,
    /// Masked from public projections.
    pub privileged: bool,
    /// Participates in free-text matching.
    pub text_indexed: bool,
}

impl FieldDef {
    /// A required, writable attribute.
    #[must_use]
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
            slot: Slot::Stored,
            writable: true,
            privileged: false,
            text_indexed: false,
        }
    }

    /// An optional, nullable, writable attribute.
    #[must_use]
    pub const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// A field maintained by the catalog itself.
    #[must_use]
    pub const fn system(name: &'static str, ty: FieldType, slot: Slot) -> Self {
        Self {
            name,
            ty,
            required: false,
            slot,
            writable: false,
            privileged: false,
            text_indexed: false,
        }
    }

    #[must_use]
    pub const fn text_indexed(mut self) -> Self {
        self.text_indexed = true;
        self
    }

    #[must_use]
    pub const fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }
}

/// The full field set of one leaf kind.
#[derive(Debug)]
pub struct KindSchema {
    pub kind: Kind,
    /// Fields shared with every kind of the same domain.
    pub base: &'static [FieldDef],
    /// Kind-specific attributes.
    pub own: &'static [FieldDef],
}

impl KindSchema {
    /// All fields, base first, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldDef> + use<> {
        let base: &'static [FieldDef] = self.base;
        let own: &'static [FieldDef] = self.own;
        base.iter().chain(own.iter())
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields().find(|f| f.name == name)
    }

    /// Fields matched by free-text queries.
    pub fn text_fields(&self) -> impl Iterator<Item = &'static FieldDef> + use<> {
        self.fields().filter(|f| f.text_indexed)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Entry point to the compile-time schema tables.
pub struct SchemaRegistry;

impl SchemaRegistry {
    /// The schema of a leaf kind.
    #[must_use]
    pub fn schema(kind: Kind) -> &'static KindSchema {
        tables::schema_for(kind)
    }

    /// Validate a full attribute set for a new record of `kind`.
    ///
    /// Unknown, read-only, and missing required fields are rejected; every
    /// present value is checked against its declared constraint. All
    /// violations are returned together.
    pub fn validate(kind: Kind, raw: &RawAttributes) -> Result<TypedRecord, crate::CatalogError> {
        validate::validate_full(Self::schema(kind), raw)
    }

    /// Validate a partial update for an existing record of `kind`.
    ///
    /// Absent fields are left untouched, `null` clears an optional field.
    pub fn validate_patch(kind: Kind, raw: &RawAttributes) -> Result<Patch, crate::CatalogError> {
        validate::validate_partial(Self::schema(kind), raw)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn tags_round_trip() {
        for kind in Kind::all() {
            assert_eq!(Kind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(Kind::from_tag("Component"), None);
        assert_eq!(Kind::from_tag("cpu"), None);
    }

    #[test]
    fn every_kind_has_matching_schema() {
        for kind in Kind::all() {
            let schema = SchemaRegistry::schema(kind);
            assert_eq!(schema.kind, kind);
            assert_eq!(schema.base, kind.domain().base_fields());
        }
    }

    #[test]
    fn field_names_are_unique_per_kind() {
        for kind in Kind::all() {
            let schema = SchemaRegistry::schema(kind);
            let names: BTreeSet<_> = schema.fields().map(|f| f.name).collect();
            assert_eq!(names.len(), schema.fields().count(), "{kind}");
        }
    }

    #[test]
    fn component_kinds_declare_rich_attribute_sets() {
        for kind in Domain::Component.kinds() {
            let own = SchemaRegistry::schema(kind).own.len();
            assert!(own >= 6, "{kind} declares only {own} attributes");
        }
    }

    #[test]
    fn documented_constraints_are_declared() {
        let expect_int = |tag: &str, field: &str, min: i64, max: i64| {
            let kind = Kind::from_tag(tag).expect("kind");
            let def = SchemaRegistry::schema(kind).field(field).expect("field");
            assert_eq!(def.ty, FieldType::Int { min, max }, "{tag}.{field}");
        };
        let expect_dec = |tag: &str, field: &str, min: i64, max: i64| {
            let kind = Kind::from_tag(tag).expect("kind");
            let def = SchemaRegistry::schema(kind).field(field).expect("field");
            assert_eq!(
                def.ty,
                FieldType::Decimal {
                    min: Decimal::from_int(min),
                    max: Decimal::from_int(max)
                },
                "{tag}.{field}"
            );
        };

        expect_int("CPU", "CoreTotal", 1, 512);
        expect_int("CPU", "ThreadsAmount", 1, 256);
        expect_dec("CPU", "ThermalDesignPower", 1, 600);
        expect_int("GPU", "VideoMemoryAmount", 256, 262_144);
        expect_int("GPU", "MemoryBusWidth", 32, 4096);
        expect_dec("Memory", "Speed", 100, 20_000);
        expect_int("Memory", "ModuleQuantity", 1, 16);
        expect_dec("Case", "MaxVideoCardLength", 10, 600);
        expect_int("Monitor", "HorizontalResolution", 160, 32_000);
    }

    #[test]
    fn audit_fields_are_privileged_and_read_only() {
        let schema = SchemaRegistry::schema(Kind::Component(ComponentKind::Gpu));
        for name in ["CreatedAt", "LastEdited"] {
            let def = schema.field(name).expect("field");
            assert!(def.privileged);
            assert!(!def.writable);
        }
        let note = schema.field("Note").expect("note");
        assert!(note.privileged);
        assert!(note.writable);
    }

    #[test]
    fn text_indexed_fields_include_name() {
        for kind in Kind::all() {
            let names: Vec<_> = SchemaRegistry::schema(kind)
                .text_fields()
                .map(|f| f.name)
                .collect();
            assert!(names.contains(&"Name"), "{kind}");
        }
    }
}
