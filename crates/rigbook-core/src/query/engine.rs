//! Evaluation of a compiled [`QueryPlan`] over one domain's records.

use super::plan::{Predicate, QueryPlan};
use super::{Direction, QueryPage};
use crate::record::Record;
use crate::{Privilege, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

fn satisfies(predicate: &Predicate, record: &Record) -> bool {
    predicate
        .per_kind
        .get(&record.kind)
        .and_then(|(def, test)| record.value(def).map(|value| test.matches(&value)))
        .unwrap_or(false)
}

/// Every term occurs in at least one text-indexed field.
fn matches_terms(terms: &[String], record: &Record) -> bool {
    if terms.is_empty() {
        return true;
    }
    let haystacks: Vec<String> = record
        .schema()
        .text_fields()
        .filter_map(|def| record.value(def))
        .filter_map(|value| value.as_text().map(str::to_lowercase))
        .collect();
    terms
        .iter()
        .all(|term| haystacks.iter().any(|text| text.contains(term.as_str())))
}

/// Nulls last in either direction.
fn compare_keys(a: Option<&Value>, b: Option<&Value>, direction: Direction) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            Direction::Asc => a.cmp(b),
            Direction::Desc => b.cmp(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn evaluate(plan: &QueryPlan, records: &[Record], privilege: Privilege) -> QueryPage {
    let mut matched: Vec<(Option<Cow<'_, Value>>, &Record)> = records
        .iter()
        .filter(|record| plan.kinds.contains(&record.kind))
        .filter(|record| plan.predicates.iter().all(|p| satisfies(p, record)))
        .filter(|record| matches_terms(&plan.terms, record))
        .map(|record| {
            let key = plan
                .order
                .fields
                .get(&record.kind)
                .and_then(|def| record.value(def));
            (key, record)
        })
        .collect();

    matched.sort_by(|(ka, a), (kb, b)| {
        compare_keys(ka.as_deref(), kb.as_deref(), plan.order.direction)
            .then_with(|| a.id.raw().cmp(&b.id.raw()))
    });

    let total = matched.len();
    let window: &[(Option<Cow<'_, Value>>, &Record)] = match plan.paging {
        Some(paging) => {
            let start = (paging.page - 1).saturating_mul(paging.page_size);
            let end = start.saturating_add(paging.page_size).min(total);
            matched.get(start..end).unwrap_or_default()
        }
        None => &matched,
    };

    QueryPage {
        records: window
            .iter()
            .map(|(_, record)| record.project(privilege))
            .collect(),
        total,
        paging: plan.paging,
    }
}

// =============================================================================
// TESTS
// =============================================================================
