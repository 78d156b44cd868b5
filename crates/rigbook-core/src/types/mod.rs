//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the rigbook CORE:
//! - Record and edge identifiers (`ComponentId`, `PartId`, ...)
//! - Attribute values (`Value`, `RawValue`, `Decimal`)
//! - Caller privilege tiers
//! - Error types (`CatalogError`, `FieldViolation`, `Constraint`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

mod decimal;

pub use decimal::{DECIMAL_PLACES, Decimal, DecimalError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

surrogate_id!(
    /// Identity of a top-level component record.
    ComponentId,
    "component"
);
surrogate_id!(
    /// Identity of a sub-component record.
    SubComponentId,
    "sub-component"
);
surrogate_id!(
    /// Identity of a part-of edge (component or sub-component parent).
    PartId,
    "part"
);
surrogate_id!(
    /// Identity of a directed compatibility edge.
    CompatibilityId,
    "compatibility"
);
surrogate_id!(
    /// Identity of a purchasable component variant.
    VariantId,
    "variant"
);
surrogate_id!(
    /// Identity of a variant-to-color association.
    ColorVariantId,
    "color-variant"
);
surrogate_id!(PriceId, "price");
surrogate_id!(ReviewId, "review");

/// Natural key of a color (e.g. `"BLK"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColorCode(pub String);

impl ColorCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "color#{}", self.0)
    }
}

/// Identity of any schema-backed record.
///
/// The variant carries the record's table, so a `RecordId` can never point
/// at a component and a sub-component at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordId {
    Component(ComponentId),
    SubComponent(SubComponentId),
}

impl RecordId {
    /// Raw identity within the record's own table.
    #[must_use]
    pub const fn raw(self) -> u64 {
        match self {
            Self::Component(id) => id.0,
            Self::SubComponent(id) => id.0,
        }
    }
}

impl From<ComponentId> for RecordId {
    fn from(id: ComponentId) -> Self {
        Self::Component(id)
    }
}

impl From<SubComponentId> for RecordId {
    fn from(id: SubComponentId) -> Self {
        Self::SubComponent(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(id) => id.fmt(f),
            Self::SubComponent(id) => id.fmt(f),
        }
    }
}

/// A reference to any stored row, used by error reporting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ref {
    Record(RecordId),
    Part(PartId),
    Compatibility(CompatibilityId),
    Variant(VariantId),
    ColorVariant(ColorVariantId),
    Color(ColorCode),
    Price(PriceId),
    Review(ReviewId),
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(id) => id.fmt(f),
            Self::Part(id) => id.fmt(f),
            Self::Compatibility(id) => id.fmt(f),
            Self::Variant(id) => id.fmt(f),
            Self::ColorVariant(id) => id.fmt(f),
            Self::Color(code) => code.fmt(f),
            Self::Price(id) => id.fmt(f),
            Self::Review(id) => id.fmt(f),
        }
    }
}

// =============================================================================
// VALUES
// =============================================================================

/// A validated, strongly-typed attribute value.
///
/// The variant is fixed by the field's declared type, so two values of the
/// same field always compare within one variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl Value {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// An unvalidated input value, as supplied by callers of the Write API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
}

impl RawValue {
    /// Short name of the input type, used in violation messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Decimal> for RawValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

/// Raw attribute map keyed by field name.
pub type RawAttributes = BTreeMap<String, RawValue>;

// Self-describing formats only (JSON, TOML). Floating point input is carried
// over through its shortest textual form, never through arithmetic.
impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawValueVisitor)
    }
}

struct RawValueVisitor;

impl<'de> Visitor<'de> for RawValueVisitor {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, a number or a string")
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<RawValue, D::Error> {
        RawValue::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawValue, E> {
        Ok(RawValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawValue, E> {
        Ok(RawValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawValue, E> {
        i64::try_from(v)
            .map(RawValue::Int)
            .map_err(|_| E::custom("integer out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawValue, E> {
        v.to_string()
            .parse()
            .map(RawValue::Decimal)
            .map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawValue, E> {
        Ok(RawValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawValue, E> {
        Ok(RawValue::Text(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _seq: A) -> Result<RawValue, A::Error> {
        Err(de::Error::custom("lists are not attribute values"))
    }

    fn visit_map<A: MapAccess<'de>>(self, _map: A) -> Result<RawValue, A::Error> {
        Err(de::Error::custom("objects are not attribute values"))
    }
}

// =============================================================================
// PRIVILEGE
// =============================================================================

/// Caller masking level for projections.
///
/// Privileged callers see audit timestamps and internal notes; public callers
/// receive those fields as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Privilege {
    #[default]
    Public,
    Privileged,
}

impl Privilege {
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Privileged)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// The constraint a field value failed to satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The field is not declared by the kind's schema.
    Unknown,
    /// A required field was not supplied.
    Missing,
    /// The field is maintained by the catalog and cannot be written.
    ReadOnly,
    /// `null` was supplied for a required field.
    NotNullable,
    /// The supplied value has the wrong type.
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    IntRange { min: i64, max: i64 },
    DecimalRange { min: Decimal, max: Decimal },
    /// Text length in characters.
    Length { min: usize, max: usize },
    OneOf(&'static [&'static str]),
    /// Dates are `YYYY-MM-DD`.
    InvalidDate,
    /// Edge quantities start at 1.
    MinQuantity(u32),
    /// An edge from a record to itself.
    SelfReference,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown field"),
            Self::Missing => write!(f, "required field missing"),
            Self::ReadOnly => write!(f, "field is read-only"),
            Self::NotNullable => write!(f, "field cannot be null"),
            Self::WrongType { expected, found } => write!(f, "expected {expected}, found {found}"),
            Self::IntRange { min, max } => write!(f, "integer in {min}..={max}"),
            Self::DecimalRange { min, max } => write!(f, "decimal in {min}..={max}"),
            Self::Length { min, max } => write!(f, "length in {min}..={max} characters"),
            Self::OneOf(options) => write!(f, "one of [{}]", options.join(", ")),
            Self::InvalidDate => write!(f, "date formatted as YYYY-MM-DD"),
            Self::MinQuantity(min) => write!(f, "quantity of at least {min}"),
            Self::SelfReference => write!(f, "edge cannot point at its own source"),
        }
    }
}

/// One violated field of a rejected write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub constraint: Constraint,
}

impl FieldViolation {
    #[must_use]
    pub fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_path(path: &[SubComponentId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn join_refs(refs: &[Ref]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur in the rigbook catalog.
///
/// - No silent failures
/// - Every write that returns an error has left the store unchanged
/// - Read-side errors are raised before any data access
#[derive(Debug, Error)]
pub enum CatalogError {
    /// One entry per violated field, all collected in a single pass.
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("Not found: {0}")]
    NotFound(Ref),

    /// The proposed part-of edge would close a cycle along `path`.
    #[error("Cycle detected: {}", join_path(.path))]
    CycleDetected { path: Vec<SubComponentId> },

    #[error("Referential integrity violated by: {}", join_refs(.blocking_refs))]
    ReferentialIntegrity { blocking_refs: Vec<Ref> },

    #[error("Unknown filter field: {field}")]
    BadFilterField { field: String },

    #[error("Bad range for {field}: {reason}")]
    BadFilterRange { field: String, reason: String },

    #[error("Bad filter value for {field}: {reason}")]
    BadFilterValue { field: String, reason: String },

    #[error("Bad paging: page {page}, page size {page_size}")]
    BadPaging { page: usize, page_size: usize },

    /// Optimistic revision check failed.
    #[error("Concurrent modification of {target}: expected revision {expected}, found {actual}")]
    ConcurrencyConflict {
        target: Ref,
        expected: u64,
        actual: u64,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Shorthand for a single-field validation failure.
    #[must_use]
    pub fn invalid(field: impl Into<String>, constraint: Constraint) -> Self {
        Self::Validation(vec![FieldViolation::new(field, constraint)])
    }

    /// The collected violations, if this is a validation failure.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Validation(v) => v,
            _ => &[],
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_orders_components_before_sub_components() {
        let mut ids = vec![
            RecordId::SubComponent(SubComponentId(1)),
            RecordId::Component(ComponentId(9)),
            RecordId::Component(ComponentId(2)),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                RecordId::Component(ComponentId(2)),
                RecordId::Component(ComponentId(9)),
                RecordId::SubComponent(SubComponentId(1)),
            ]
        );
    }

    #[test]
    fn raw_value_from_json() {
        let raw: RawAttributes = serde_json::from_str(
            r#"{"CoreTotal": 8, "Speed": 3200.5, "Name": "x", "Note": null, "Ecc": true}"#,
        )
        .expect("parse");
        assert_eq!(raw["CoreTotal"], RawValue::Int(8));
        assert_eq!(
            raw["Speed"],
            RawValue::Decimal(Decimal::from_thousandths(3_200_500))
        );
        assert_eq!(raw["Name"], RawValue::Text("x".into()));
        assert_eq!(raw["Note"], RawValue::Null);
        assert_eq!(raw["Ecc"], RawValue::Bool(true));
    }

    #[test]
    fn raw_value_rejects_nested_json() {
        let result: Result<RawAttributes, _> = serde_json::from_str(r#"{"Name": [1, 2]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn validation_error_lists_every_field() {
        let err = CatalogError::Validation(vec![
            FieldViolation::new("CoreTotal", Constraint::IntRange { min: 1, max: 512 }),
            FieldViolation::new("Name", Constraint::Missing),
        ]);
        let message = err.to_string();
        assert!(message.contains("CoreTotal: integer in 1..=512"));
        assert!(message.contains("Name: required field missing"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn cycle_error_renders_path() {
        let err = CatalogError::CycleDetected {
            path: vec![SubComponentId(1), SubComponentId(2), SubComponentId(1)],
        };
        assert_eq!(
            err.to_string(),
            "Cycle detected: sub-component#1 -> sub-component#2 -> sub-component#1"
        );
    }
}
