//! Compilation of a [`QuerySpec`] into a typed [`QueryPlan`].

use super::{Direction, FieldFilter, Paging, QuerySpec, RangeFilter};
use crate::config::CatalogConfig;
use crate::schema::{Domain, FieldDef, FieldType, Kind, SchemaRegistry, Slot};
use crate::{CatalogError, Constraint, RawValue, Value};
use std::collections::{BTreeMap, BTreeSet};

const TYPE_FIELD: &str = "Type";
const TEXT_FIELD: &str = "text";

/// A field name resolved against every candidate kind that declares it.
pub(crate) type Resolved = BTreeMap<Kind, &'static FieldDef>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Test {
    Range {
        start: Option<Value>,
        end: Option<Value>,
    },
    OneOf(Vec<Value>),
}

impl Test {
    pub(crate) fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Range { start, end } => {
                start.as_ref().is_none_or(|lo| value >= lo) && end.as_ref().is_none_or(|hi| value <= hi)
            }
            Self::OneOf(options) => options.contains(value),
        }
    }
}

/// One conjunct of the filter. Interpreted per kind since two kinds may
/// declare the same field name with different types.
#[derive(Debug, Clone)]
pub(crate) struct Predicate {
    pub(crate) per_kind: BTreeMap<Kind, (&'static FieldDef, Test)>,
}

#[derive(Debug, Clone)]
pub(crate) struct OrderPlan {
    pub(crate) fields: Resolved,
    pub(crate) direction: Direction,
}

#[derive(Debug, Clone)]
pub(crate) struct QueryPlan {
    pub(crate) domain: Domain,
    pub(crate) kinds: BTreeSet<Kind>,
    pub(crate) predicates: Vec<Predicate>,
    /// Lowercased free-text terms.
    pub(crate) terms: Vec<String>,
    pub(crate) order: OrderPlan,
    pub(crate) paging: Option<Paging>,
}

// =============================================================================
// COMPILATION
// =============================================================================

/// Validate `spec` against the schema registry and `config`.
pub(crate) fn compile(spec: &QuerySpec, config: &CatalogConfig) -> Result<QueryPlan, CatalogError> {
    let domain = spec.target.domain();
    let target_kinds = spec.target.kinds();

    let kinds = match spec.filters.get(TYPE_FIELD) {
        Some(filter) => narrow_kinds(domain, &target_kinds, filter)?,
        None => target_kinds.iter().copied().collect(),
    };
    // Field names resolve against the kinds named by `Type`, or every kind
    // of the target when it is absent or selects nothing.
    let scope: Vec<Kind> = match spec.filters.get(TYPE_FIELD) {
        Some(FieldFilter::Set(values)) if !values.is_empty() && !kinds.is_empty() => {
            kinds.iter().copied().collect()
        }
        _ => target_kinds,
    };

    let mut predicates = Vec::new();
    for (name, filter) in &spec.filters {
        if name == TYPE_FIELD {
            continue;
        }
        let resolved = resolve(&scope, name)?;
        if let Some(predicate) = compile_filter(name, &resolved, filter)? {
            predicates.push(predicate);
        }
    }

    let terms = text_terms(spec.text.as_deref(), config)?;
    let order = compile_order(spec, domain, &scope)?;
    let paging = spec.paging.map(|p| check_paging(p, config)).transpose()?;

    Ok(QueryPlan {
        domain,
        kinds,
        predicates,
        terms,
        order,
        paging,
    })
}

fn resolve(scope: &[Kind], name: &str) -> Result<Resolved, CatalogError> {
    let resolved: Resolved = scope
        .iter()
        .filter_map(|&kind| SchemaRegistry::schema(kind).field(name).map(|def| (kind, def)))
        .collect();
    if resolved.is_empty() {
        return Err(CatalogError::BadFilterField {
            field: name.to_string(),
        });
    }
    Ok(resolved)
}

/// The `Type` filter selects leaf kinds instead of matching a stored value.
fn narrow_kinds(
    domain: Domain,
    target_kinds: &[Kind],
    filter: &FieldFilter,
) -> Result<BTreeSet<Kind>, CatalogError> {
    let values = match filter {
        FieldFilter::Set(values) => values,
        FieldFilter::Range(_) => {
            return Err(CatalogError::BadFilterRange {
                field: TYPE_FIELD.to_string(),
                reason: "kinds are not ordered".to_string(),
            });
        }
    };
    if values.is_empty() {
        return Ok(target_kinds.iter().copied().collect());
    }

    let mut selected = BTreeSet::new();
    for value in values {
        let kind = match value {
            RawValue::Text(tag) => Kind::from_tag(tag).filter(|kind| kind.domain() == domain),
            _ => None,
        };
        match kind {
            Some(kind) if target_kinds.contains(&kind) => {
                selected.insert(kind);
            }
            Some(_) => {}
            None => {
                return Err(bad_value(
                    TYPE_FIELD,
                    format!("{value:?} is not a {} kind", domain.name()),
                ));
            }
        }
    }
    Ok(selected)
}

fn compile_filter(
    name: &str,
    resolved: &Resolved,
    filter: &FieldFilter,
) -> Result<Option<Predicate>, CatalogError> {
    let values = match filter {
        FieldFilter::Set(values) if values.is_empty() => return Ok(None),
        FieldFilter::Set(values) => values.as_slice(),
        FieldFilter::Range(range) => return range_predicate(name, resolved, range).map(Some),
    };

    // Each value must be valid for at least one kind declaring the field.
    let mut accepted = vec![false; values.len()];
    let mut first_error = None;
    let mut per_kind = BTreeMap::new();
    for (&kind, &def) in resolved {
        let mut options = Vec::with_capacity(values.len());
        for (i, raw) in values.iter().enumerate() {
            match set_value(name, def, raw) {
                Ok(value) => {
                    accepted[i] = true;
                    options.push(value);
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        per_kind.insert(kind, (def, Test::OneOf(options)));
    }

    match first_error {
        Some(err) if accepted.contains(&false) => Err(err),
        _ => Ok(Some(Predicate { per_kind })),
    }
}

/// Kinds whose field rejects the bounds drop out of the predicate.
fn range_predicate(
    name: &str,
    resolved: &Resolved,
    range: &RangeFilter,
) -> Result<Predicate, CatalogError> {
    let mut first_error = None;
    let mut per_kind = BTreeMap::new();
    for (&kind, &def) in resolved {
        match range_test(name, def, range) {
            Ok(test) => {
                per_kind.insert(kind, (def, test));
            }
            Err(RangeRejection::Inverted(err)) => return Err(err),
            Err(RangeRejection::Unfit(err)) => {
                first_error.get_or_insert(err);
            }
        }
    }
    match first_error {
        Some(err) if per_kind.is_empty() => Err(err),
        _ => Ok(Predicate { per_kind }),
    }
}

/// Why one kind's field cannot take a range.
enum RangeRejection {
    /// The field type or a bound does not fit this kind; the kind drops out.
    Unfit(CatalogError),
    /// Start above end. Fails the whole query whatever the other kinds say.
    Inverted(CatalogError),
}

fn range_test(name: &str, def: &FieldDef, range: &RangeFilter) -> Result<Test, RangeRejection> {
    if !def.ty.is_rangeable() {
        return Err(RangeRejection::Unfit(CatalogError::BadFilterRange {
            field: name.to_string(),
            reason: format!("{} fields take set filters only", def.ty.name()),
        }));
    }
    let bound = |raw: &Option<RawValue>| -> Result<Option<Value>, RangeRejection> {
        match raw {
            None => Ok(None),
            Some(raw) => def
                .ty
                .interpret(raw)
                .map_err(|c| RangeRejection::Unfit(bad_value(name, c.to_string()))),
        }
    };
    let start = bound(&range.start)?;
    let end = bound(&range.end)?;

    if let (Some(lo), Some(hi)) = (&start, &end) {
        if lo > hi {
            return Err(RangeRejection::Inverted(CatalogError::BadFilterRange {
                field: name.to_string(),
                reason: format!("start {lo} exceeds end {hi}"),
            }));
        }
    }
    Ok(Test::Range { start, end })
}

fn set_value(name: &str, def: &FieldDef, raw: &RawValue) -> Result<Value, CatalogError> {
    let value = def
        .ty
        .interpret(raw)
        .map_err(|c| bad_value(name, c.to_string()))?
        .ok_or_else(|| bad_value(name, Constraint::NotNullable.to_string()))?;
    if let FieldType::Enum(_) = def.ty {
        def.ty.check(&value).map_err(|c| bad_value(name, c.to_string()))?;
    }
    Ok(value)
}

fn text_terms(text: Option<&str>, config: &CatalogConfig) -> Result<Vec<String>, CatalogError> {
    let terms: Vec<String> = text
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if terms.len() > config.max_text_terms {
        return Err(bad_value(
            TEXT_FIELD,
            format!("{} terms exceed the limit of {}", terms.len(), config.max_text_terms),
        ));
    }
    Ok(terms)
}

fn compile_order(spec: &QuerySpec, domain: Domain, scope: &[Kind]) -> Result<OrderPlan, CatalogError> {
    match &spec.order {
        Some(order) => Ok(OrderPlan {
            fields: resolve(scope, &order.field)?,
            direction: order.direction,
        }),
        None => Ok(OrderPlan {
            fields: resolve(scope, default_order_field(domain))?,
            direction: Direction::Asc,
        }),
    }
}

/// Creation order for components; identity for sub-components.
fn default_order_field(domain: Domain) -> &'static str {
    let base = domain.base_fields();
    base.iter()
        .find(|def| def.name == crate::catalog::CREATED_AT)
        .or_else(|| base.iter().find(|def| def.slot == Slot::Id))
        .map_or("Id", |def| def.name)
}

fn check_paging(paging: Paging, config: &CatalogConfig) -> Result<Paging, CatalogError> {
    if paging.page == 0 || paging.page_size == 0 || paging.page_size > config.max_page_size {
        return Err(CatalogError::BadPaging {
            page: paging.page,
            page_size: paging.page_size,
        });
    }
    Ok(paging)
}

fn bad_value(field: &str, reason: String) -> CatalogError {
    CatalogError::BadFilterValue {
        field: field.to_string(),
        reason,
    }
}

// =============================================================================
// TESTS
// =============================================================================
