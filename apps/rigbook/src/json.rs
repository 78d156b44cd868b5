//! # JSON Conversion
//!
//! Command line input (attribute maps, query specifications) and output
//! (records, pages, graph rows) as JSON.
//!
//! Decimals are written as strings so no value passes through a float.

use rigbook_core::{
    CatalogError, CatalogStats, Color, Compatibility, PartEdge, Price, QueryPage, QuerySpec,
    RawAttributes, RecordId, RecordView, Review, Value, VariantView,
};
use serde_json::{Map, Value as Json, json};

// =============================================================================
// INPUT
// =============================================================================

/// Parse an attribute object such as `{"Name": "X", "CoreTotal": 8}`.
pub fn parse_attributes(text: &str) -> Result<RawAttributes, CatalogError> {
    serde_json::from_str(text)
        .map_err(|e| CatalogError::Deserialization(format!("Invalid attributes: {}", e)))
}

pub fn parse_query(text: &str) -> Result<QuerySpec, CatalogError> {
    serde_json::from_str(text)
        .map_err(|e| CatalogError::Deserialization(format!("Invalid query: {}", e)))
}

// =============================================================================
// OUTPUT
// =============================================================================

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => json!(i),
        Value::Decimal(_) | Value::Text(_) | Value::Date(_) | Value::Timestamp(_) => {
            Json::String(value.to_string())
        }
    }
}

pub fn record_id_to_json(id: RecordId) -> Json {
    match id {
        RecordId::Component(id) => json!({ "component": id.0 }),
        RecordId::SubComponent(id) => json!({ "sub_component": id.0 }),
    }
}

pub fn view_to_json(view: &RecordView) -> Json {
    let fields: Map<String, Json> = view
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), value_to_json(value)))
        .collect();
    json!({
        "id": record_id_to_json(view.id),
        "kind": view.kind.tag(),
        "revision": view.revision,
        "fields": fields,
    })
}

pub fn page_to_json(page: &QueryPage) -> Json {
    json!({
        "total": page.total,
        "paging": page.paging.map(|p| json!({ "page": p.page, "page_size": p.page_size })),
        "records": page.records.iter().map(view_to_json).collect::<Vec<_>>(),
    })
}

pub fn part_to_json(edge: &PartEdge) -> Json {
    json!({
        "id": edge.id.0,
        "parent": record_id_to_json(edge.parent),
        "child": edge.child.0,
        "quantity": edge.quantity,
        "revision": edge.revision,
    })
}

pub fn compatibility_to_json(edge: &Compatibility) -> Json {
    json!({ "id": edge.id.0, "source": edge.source.0, "target": edge.target.0 })
}

pub fn color_to_json(color: &Color) -> Json {
    json!({ "code": color.code.as_str(), "name": color.name })
}

pub fn variant_to_json(view: &VariantView) -> Json {
    json!({
        "id": view.variant.id.0,
        "component": view.variant.component.0,
        "available": view.variant.available,
        "price_delta": view.variant.price_delta.map(|d| d.to_string()),
        "colors": view.colors.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
    })
}

pub fn price_to_json(price: &Price) -> Json {
    json!({
        "id": price.id.0,
        "component": price.component.0,
        "retailer": price.retailer,
        "amount": price.amount.to_string(),
        "recorded_at": price.recorded_at.to_rfc3339(),
    })
}

pub fn review_to_json(review: &Review) -> Json {
    json!({
        "id": review.id.0,
        "component": review.component.0,
        "rating": review.rating,
        "body": review.body,
        "created_at": review.created_at.to_rfc3339(),
    })
}

pub fn stats_to_json(stats: &CatalogStats) -> Json {
    json!({
        "tables": stats.tables,
        "kinds": stats.kinds,
        "part_depth": stats.part_depth,
    })
}

/// Pretty-print for `--json-mode` output.
pub fn render(value: &Json) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
