//! # Query Engine
//!
//! Filter, order and page records of one domain uniformly across kinds.
//!
//! A [`QuerySpec`] is compiled against the schema registry once (field names
//! resolved per candidate kind, bounds interpreted with the field's declared
//! type) and then evaluated over a single read transaction. Privileged fields
//! are masked only when rows are projected, after filtering and ordering.

mod engine;
mod plan;

use crate::catalog::Catalog;
use crate::record::{self, RecordView};
use crate::schema::{Domain, Kind};
use crate::store::CatalogStore;
use crate::{CatalogError, Privilege, RawValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// TARGET
// =============================================================================

/// What a query ranges over: every kind of a domain, or one leaf kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QueryTarget {
    Domain(Domain),
    Kind(Kind),
}

impl QueryTarget {
    #[must_use]
    pub const fn domain(self) -> Domain {
        match self {
            Self::Domain(domain) => domain,
            Self::Kind(kind) => kind.domain(),
        }
    }

    /// Candidate kinds before any `Type` filter narrows them.
    #[must_use]
    pub fn kinds(self) -> Vec<Kind> {
        match self {
            Self::Domain(domain) => domain.kinds(),
            Self::Kind(kind) => vec![kind],
        }
    }
}

impl FromStr for QueryTarget {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Component" => Ok(Self::Domain(Domain::Component)),
            "SubComponent" => Ok(Self::Domain(Domain::SubComponent)),
            tag => Kind::from_tag(tag)
                .map(Self::Kind)
                .ok_or_else(|| CatalogError::BadFilterValue {
                    field: "target".to_string(),
                    reason: format!("unknown kind {tag}"),
                }),
        }
    }
}

impl TryFrom<String> for QueryTarget {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QueryTarget> for String {
    fn from(target: QueryTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for QueryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(domain) => f.write_str(domain.name()),
            Self::Kind(kind) => f.write_str(kind.tag()),
        }
    }
}

// =============================================================================
// SPECIFICATION
// =============================================================================

/// Inclusive bounds; an absent bound leaves that side open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeFilter {
    #[serde(default)]
    pub start: Option<RawValue>,
    #[serde(default)]
    pub end: Option<RawValue>,
}

/// Per-field constraint. JSON lists are set filters, objects are ranges.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldFilter {
    Set(Vec<RawValue>),
    Range(RangeFilter),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    pub page: usize,
    pub page_size: usize,
}

/// A complete query request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuerySpec {
    pub target: QueryTarget,
    #[serde(default)]
    pub filters: BTreeMap<String, FieldFilter>,
    /// Free-text terms matched against text-indexed fields.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub order: Option<OrderBy>,
    /// Absent paging returns every matching row.
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl QuerySpec {
    #[must_use]
    pub fn new(target: QueryTarget) -> Self {
        Self {
            target,
            filters: BTreeMap::new(),
            text: None,
            order: None,
            paging: None,
        }
    }

    #[must_use]
    pub fn range(
        mut self,
        field: &str,
        start: Option<RawValue>,
        end: Option<RawValue>,
    ) -> Self {
        self.filters.insert(
            field.to_string(),
            FieldFilter::Range(RangeFilter { start, end }),
        );
        self
    }

    #[must_use]
    pub fn one_of(mut self, field: &str, values: Vec<RawValue>) -> Self {
        self.filters
            .insert(field.to_string(), FieldFilter::Set(values));
        self
    }

    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.paging = Some(Paging { page, page_size });
        self
    }
}

/// One page of masked results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPage {
    pub records: Vec<RecordView>,
    pub total: usize,
    pub paging: Option<Paging>,
}

// =============================================================================
// CATALOG API
// =============================================================================

impl<S: CatalogStore> Catalog<S> {
    /// Evaluate `spec` for a caller with `privilege`.
    ///
    /// The query is validated completely before the store is touched.
    pub fn query(&self, spec: &QuerySpec, privilege: Privilege) -> Result<QueryPage, CatalogError> {
        let plan = plan::compile(spec, &self.config)?;
        let records = self
            .store
            .read(|tx| record::load_records(tx, plan.domain))?;
        let page = engine::evaluate(&plan, &records, privilege);
        tracing::debug!(
            query_target = %spec.target,
            total = page.total,
            returned = page.records.len(),
            "query evaluated"
        );
        Ok(page)
    }
}

// =============================================================================
// TESTS
// =============================================================================
