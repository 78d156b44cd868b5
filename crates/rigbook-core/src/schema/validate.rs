//! Coercion of raw input values against declared field types.

use super::{FieldDef, FieldType, KindSchema};
use crate::{CatalogError, Constraint, FieldViolation, RawAttributes, RawValue, Value};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Input format of `Date` fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A fully validated attribute set, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedRecord {
    pub kind: super::Kind,
    /// Writable fields only; system fields are filled in by the catalog.
    pub values: BTreeMap<String, Value>,
}

/// A validated partial update. `None` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    changes: BTreeMap<&'static str, Option<Value>>,
}

impl Patch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&Value>)> {
        self.changes.iter().map(|(name, value)| (*name, value.as_ref()))
    }

    /// Apply the patch to a stored value map.
    pub fn apply(&self, values: &mut BTreeMap<String, Value>) {
        for (name, change) in &self.changes {
            match change {
                Some(value) => {
                    values.insert((*name).to_string(), value.clone());
                }
                None => {
                    values.remove(*name);
                }
            }
        }
    }
}

impl FieldType {
    /// Interpret a raw value as this type without checking bounds.
    ///
    /// `Null` yields `Ok(None)`; nullability is decided by the caller.
    pub fn interpret(&self, raw: &RawValue) -> Result<Option<Value>, Constraint> {
        let mismatch = || Constraint::WrongType {
            expected: self.name(),
            found: raw.type_name(),
        };

        let value = match (self, raw) {
            (_, RawValue::Null) => return Ok(None),
            (Self::Int { .. }, RawValue::Int(v)) => Value::Int(*v),
            // `8.0` arrives as a decimal from JSON; accept whole values.
            (Self::Int { .. }, RawValue::Decimal(d)) if d.thousandths() % crate::Decimal::SCALE == 0 => {
                Value::Int(d.trunc())
            }
            (Self::Decimal { .. }, RawValue::Decimal(d)) => Value::Decimal(*d),
            (Self::Decimal { .. }, RawValue::Int(v)) => Value::Decimal(crate::Decimal::from_int(*v)),
            (Self::Text { .. } | Self::Enum(_), RawValue::Text(s)) => Value::Text(s.clone()),
            (Self::Bool, RawValue::Bool(b)) => Value::Bool(*b),
            (Self::Date, RawValue::Text(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|_| Constraint::InvalidDate)?,
            (Self::Timestamp, RawValue::Text(s)) => DateTime::parse_from_rfc3339(s)
                .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                .map_err(|_| mismatch())?,
            _ => return Err(mismatch()),
        };
        Ok(Some(value))
    }

    /// Check an interpreted value against the declared bounds.
    pub fn check(&self, value: &Value) -> Result<(), Constraint> {
        match (self, value) {
            (Self::Int { min, max }, Value::Int(v)) if v < min || v > max => {
                Err(Constraint::IntRange {
                    min: *min,
                    max: *max,
                })
            }
            (Self::Decimal { min, max }, Value::Decimal(d)) if d < min || d > max => {
                Err(Constraint::DecimalRange {
                    min: *min,
                    max: *max,
                })
            }
            (Self::Text { min_len, max_len }, Value::Text(s)) => {
                let len = s.chars().count();
                if len < *min_len || len > *max_len {
                    Err(Constraint::Length {
                        min: *min_len,
                        max: *max_len,
                    })
                } else {
                    Ok(())
                }
            }
            (Self::Enum(options), Value::Text(s)) if !options.contains(&s.as_str()) => {
                Err(Constraint::OneOf(*options))
            }
            _ => Ok(()),
        }
    }

    /// Interpret and bounds-check in one step.
    pub fn coerce(&self, raw: &RawValue) -> Result<Option<Value>, Constraint> {
        let value = self.interpret(raw)?;
        if let Some(v) = &value {
            self.check(v)?;
        }
        Ok(value)
    }
}

/// Resolve `name` against `schema` for a write, recording violations.
fn writable_field(
    schema: &KindSchema,
    name: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<&'static FieldDef> {
    match schema.field(name) {
        None => {
            violations.push(FieldViolation::new(name, Constraint::Unknown));
            None
        }
        Some(def) if !def.writable => {
            violations.push(FieldViolation::new(name, Constraint::ReadOnly));
            None
        }
        Some(def) => Some(def),
    }
}

pub(super) fn validate_full(
    schema: &KindSchema,
    raw: &RawAttributes,
) -> Result<TypedRecord, CatalogError> {
    let mut violations = Vec::new();
    let mut values = BTreeMap::new();

    for (name, raw_value) in raw {
        let Some(def) = writable_field(schema, name, &mut violations) else {
            continue;
        };
        match def.ty.coerce(raw_value) {
            Ok(Some(value)) => {
                values.insert(def.name.to_string(), value);
            }
            Ok(None) if def.required => {
                violations.push(FieldViolation::new(def.name, Constraint::NotNullable));
            }
            Ok(None) => {}
            Err(constraint) => violations.push(FieldViolation::new(def.name, constraint)),
        }
    }

    for def in schema.fields().filter(|f| f.required && f.writable) {
        if !raw.contains_key(def.name) {
            violations.push(FieldViolation::new(def.name, Constraint::Missing));
        }
    }

    if violations.is_empty() {
        Ok(TypedRecord {
            kind: schema.kind,
            values,
        })
    } else {
        Err(CatalogError::Validation(violations))
    }
}

pub(super) fn validate_partial(
    schema: &KindSchema,
    raw: &RawAttributes,
) -> Result<Patch, CatalogError> {
    let mut violations = Vec::new();
    let mut changes = BTreeMap::new();

    for (name, raw_value) in raw {
        let Some(def) = writable_field(schema, name, &mut violations) else {
            continue;
        };
        match def.ty.coerce(raw_value) {
            Ok(None) if def.required => {
                violations.push(FieldViolation::new(def.name, Constraint::NotNullable));
            }
            Ok(value) => {
                changes.insert(def.name, value);
            }
            Err(constraint) => violations.push(FieldViolation::new(def.name, constraint)),
        }
    }

    if violations.is_empty() {
        Ok(Patch { changes })
    } else {
        Err(CatalogError::Validation(violations))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::schema::{ComponentKind, Kind, SchemaRegistry};
    use crate::{Constraint, Decimal, RawAttributes, RawValue, Value};

    const CPU: Kind = Kind::Component(ComponentKind::Cpu);

    fn attrs(pairs: &[(&str, RawValue)]) -> RawAttributes {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn valid_cpu() -> RawAttributes {
        attrs(&[
            ("Name", "Ryzen 7 7700X".into()),
            ("Manufacturer", "AMD".into()),
            ("CoreTotal", 8.into()),
            ("ThreadsAmount", 16.into()),
            ("BaseClock", Decimal::from_thousandths(4500).into()),
            ("ThermalDesignPower", 105.into()),
            ("Socket", "AM5".into()),
        ])
    }

    #[test]
    fn accepts_valid_cpu() {
        let typed = SchemaRegistry::validate(CPU, &valid_cpu()).expect("valid");
        assert_eq!(typed.kind, CPU);
        assert_eq!(typed.values["CoreTotal"], Value::Int(8));
        // Integer input is widened for decimal fields.
        assert_eq!(
            typed.values["ThermalDesignPower"],
            Value::Decimal(Decimal::from_int(105))
        );
    }

    #[test]
    fn collects_every_violation() {
        let mut raw = valid_cpu();
        raw.insert("CoreTotal".into(), 0.into());
        raw.insert("ThreadsAmount".into(), "sixteen".into());
        raw.insert("Warp".into(), 9.into());
        raw.remove("Socket");

        let err = SchemaRegistry::validate(CPU, &raw).expect_err("invalid");
        let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["CoreTotal", "ThreadsAmount", "Warp", "Socket"]);
        assert_eq!(
            err.violations()[0].constraint,
            Constraint::IntRange { min: 1, max: 512 }
        );
        assert_eq!(err.violations()[2].constraint, Constraint::Unknown);
        assert_eq!(err.violations()[3].constraint, Constraint::Missing);
    }

    #[test]
    fn rejects_read_only_and_null_required() {
        let mut raw = valid_cpu();
        raw.insert("CreatedAt".into(), "2024-01-01T00:00:00Z".into());
        raw.insert("Name".into(), RawValue::Null);
        let err = SchemaRegistry::validate(CPU, &raw).expect_err("invalid");
        let constraints: Vec<_> = err.violations().iter().map(|v| &v.constraint).collect();
        assert!(constraints.contains(&&Constraint::ReadOnly));
        assert!(constraints.contains(&&Constraint::NotNullable));
    }

    #[test]
    fn text_length_counts_characters() {
        let mut raw = valid_cpu();
        raw.insert("Name".into(), "é".repeat(200).as_str().into());
        assert!(SchemaRegistry::validate(CPU, &raw).is_ok());
        raw.insert("Name".into(), "é".repeat(201).as_str().into());
        assert!(SchemaRegistry::validate(CPU, &raw).is_err());
    }

    #[test]
    fn dates_and_enums_are_checked() {
        let mut raw = valid_cpu();
        raw.insert("ReleaseDate".into(), "2022-09-27".into());
        assert!(SchemaRegistry::validate(CPU, &raw).is_ok());

        raw.insert("ReleaseDate".into(), "27/09/2022".into());
        let err = SchemaRegistry::validate(CPU, &raw).expect_err("bad date");
        assert_eq!(err.violations()[0].constraint, Constraint::InvalidDate);

        let memory = Kind::Component(ComponentKind::Memory);
        let raw = attrs(&[
            ("Name", "Vengeance".into()),
            ("Manufacturer", "Corsair".into()),
            ("Speed", 6000.into()),
            ("ModuleQuantity", 2.into()),
            ("ModuleCapacity", 16.into()),
            ("MemoryType", "DDR9".into()),
        ]);
        let err = SchemaRegistry::validate(memory, &raw).expect_err("bad enum");
        assert!(matches!(err.violations()[0].constraint, Constraint::OneOf(_)));
    }

    #[test]
    fn whole_decimal_accepted_for_integer_field() {
        let mut raw = valid_cpu();
        raw.insert("CoreTotal".into(), Decimal::from_int(8).into());
        assert!(SchemaRegistry::validate(CPU, &raw).is_ok());
        raw.insert("CoreTotal".into(), Decimal::from_thousandths(8500).into());
        assert!(SchemaRegistry::validate(CPU, &raw).is_err());
    }

    #[test]
    fn patch_clears_optional_and_rejects_required_null() {
        let patch = SchemaRegistry::validate_patch(
            CPU,
            &attrs(&[("Note", RawValue::Null), ("CoreTotal", 12.into())]),
        )
        .expect("patch");
        let changes: Vec<_> = patch.iter().collect();
        assert_eq!(changes, vec![("CoreTotal", Some(&Value::Int(12))), ("Note", None)]);

        let err = SchemaRegistry::validate_patch(CPU, &attrs(&[("Socket", RawValue::Null)]))
            .expect_err("required");
        assert_eq!(err.violations()[0].constraint, Constraint::NotNullable);
    }

    #[test]
    fn patch_does_not_require_missing_fields() {
        let patch = SchemaRegistry::validate_patch(CPU, &RawAttributes::new()).expect("empty");
        assert!(patch.is_empty());
    }
}
