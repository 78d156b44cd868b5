//! # CLI Command Implementations
//!
//! Each `cmd_*` function runs one subcommand against an open catalog and
//! prints either plain text or, with `--json-mode`, a pretty JSON document.

use super::{
    ColorCommand, CompatCommand, Output, PartCommand, PriceCommand, ReviewCommand, VariantCommand,
    save_file_catalog,
};
use crate::config::{AppConfig, Backend};
use crate::json;
use rigbook_core::{
    Catalog, CatalogError, CatalogStore, ColorCode, CompatibilityId, ComponentId, Constraint,
    Decimal, Domain, FieldType, Kind, MemoryStore, PartId, RecordId, RecordView, RedbStore,
    SchemaRegistry, SubComponentId, VariantId, formats::MAX_SNAPSHOT_SIZE,
};
use serde_json::json;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum snapshot file size for import and the file backend (500 MB).
pub const MAX_IMPORT_FILE_SIZE: u64 = MAX_SNAPSHOT_SIZE as u64;

/// Maximum query specification file size (1 MB).
pub const MAX_SPEC_FILE_SIZE: u64 = 1024 * 1024;

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CatalogError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CatalogError::Storage(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CatalogError::Deserialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CatalogError> {
    let canonical = path.canonicalize().map_err(|e| {
        CatalogError::Storage(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CatalogError::Storage(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// For output files the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, CatalogError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CatalogError::Storage(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CatalogError::Storage(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CatalogError::Storage("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a whole file after checking its path and size.
pub fn read_limited(path: &Path, max_size: u64) -> Result<Vec<u8>, CatalogError> {
    let path = validate_file_path(path)?;
    validate_file_size(&path, max_size)?;
    std::fs::read(&path)
        .map_err(|e| CatalogError::Storage(format!("Read {}: {}", path.display(), e)))
}

fn parse_kind(tag: &str) -> Result<Kind, CatalogError> {
    Kind::from_tag(tag).ok_or_else(|| CatalogError::invalid("kind", Constraint::Unknown))
}

fn parse_decimal(field: &str, text: &str) -> Result<Decimal, CatalogError> {
    text.parse().map_err(|_| {
        CatalogError::invalid(
            field,
            Constraint::WrongType {
                expected: "decimal",
                found: "text",
            },
        )
    })
}

fn print_json(value: &serde_json::Value) {
    println!("{}", json::render(value));
}

fn print_view(view: &RecordView) {
    println!("{} {} (revision {})", view.id, view.kind, view.revision);
    for (name, value) in &view.fields {
        println!("  {:<24} {}", name, value);
    }
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty catalog at the configured database path.
pub fn cmd_init(config: &AppConfig, force: bool, out: Output) -> Result<(), CatalogError> {
    let path = &config.database;
    if path.exists() {
        if !force {
            return Err(CatalogError::Storage(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| CatalogError::Storage(format!("Remove {}: {}", path.display(), e)))?;
    }

    match config.backend {
        Backend::Redb => {
            Catalog::new(RedbStore::open(path)?, config.catalog.clone())?;
        }
        Backend::File => {
            let catalog = Catalog::new(MemoryStore::new(), config.catalog.clone())?;
            save_file_catalog(&catalog, path)?;
        }
    }
    tracing::info!(database = %path.display(), backend = %config.backend, "catalog initialized");

    if out.json_mode {
        print_json(&json!({
            "database": path.to_string_lossy(),
            "backend": config.backend.to_string(),
            "initialized": true,
        }));
    } else {
        println!("Initialized empty catalog at {}", path.display());
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status<S: CatalogStore>(
    catalog: &Catalog<S>,
    config: &AppConfig,
    out: Output,
) -> Result<(), CatalogError> {
    let stats = catalog.stats()?;

    if out.json_mode {
        let mut output = json::stats_to_json(&stats);
        output["database"] = json!(config.database.to_string_lossy());
        output["backend"] = json!(config.backend.to_string());
        print_json(&output);
        return Ok(());
    }

    println!("rigbook Catalog Status");
    println!("======================");
    println!("Database: {}", config.database.display());
    println!("Backend:  {}", config.backend);
    println!();
    println!("Tables:");
    for (table, rows) in &stats.tables {
        println!("  {:<16} {}", table, rows);
    }
    println!();
    println!("Kinds:");
    for (kind, rows) in stats.kinds.iter().filter(|(_, rows)| **rows > 0) {
        println!("  {:<20} {}", kind, rows);
    }
    println!();
    println!("Part depth: {}", stats.part_depth);
    Ok(())
}

// =============================================================================
// SCHEMA COMMAND
// =============================================================================

fn describe_type(ty: &FieldType) -> String {
    match ty {
        FieldType::Int { min, max } => format!("integer {}..={}", min, max),
        FieldType::Decimal { min, max } => format!("decimal {}..={}", min, max),
        FieldType::Text { min_len, max_len } => format!("text {}..={} chars", min_len, max_len),
        FieldType::Enum(values) => format!("one of {}", values.join(" | ")),
        FieldType::Bool | FieldType::Date | FieldType::Timestamp => ty.name().to_string(),
    }
}

/// Without a tag, list every kind; with one, describe its fields.
pub fn cmd_schema(tag: Option<&str>, out: Output) -> Result<(), CatalogError> {
    let Some(tag) = tag else {
        if out.json_mode {
            let domains: Vec<_> = [Domain::Component, Domain::SubComponent]
                .into_iter()
                .map(|domain| {
                    json!({
                        "domain": format!("{:?}", domain),
                        "kinds": domain.kinds().iter().map(|k| k.tag()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            print_json(&json!({ "domains": domains }));
        } else {
            for domain in [Domain::Component, Domain::SubComponent] {
                println!("{:?}:", domain);
                for kind in domain.kinds() {
                    let schema = SchemaRegistry::schema(kind);
                    println!("  {:<20} {} fields", kind.tag(), schema.fields().count());
                }
            }
        }
        return Ok(());
    };

    let schema = SchemaRegistry::schema(parse_kind(tag)?);
    if out.json_mode {
        let fields: Vec<_> = schema
            .fields()
            .map(|def| {
                json!({
                    "name": def.name,
                    "type": describe_type(&def.ty),
                    "required": def.required,
                    "writable": def.writable,
                    "privileged": def.privileged,
                    "text_indexed": def.text_indexed,
                })
            })
            .collect();
        print_json(&json!({ "kind": schema.kind.tag(), "fields": fields }));
        return Ok(());
    }

    println!("{} ({:?})", schema.kind.tag(), schema.kind.domain());
    for def in schema.fields() {
        let mut flags = Vec::new();
        if def.required {
            flags.push("required");
        }
        if !def.writable {
            flags.push("read-only");
        }
        if def.privileged {
            flags.push("privileged");
        }
        if def.text_indexed {
            flags.push("text");
        }
        println!(
            "  {:<24} {:<40} {}",
            def.name,
            describe_type(&def.ty),
            flags.join(", ")
        );
    }
    Ok(())
}

// =============================================================================
// RECORD COMMANDS
// =============================================================================

pub fn cmd_create<S: CatalogStore>(
    catalog: &Catalog<S>,
    kind: &str,
    attrs: &str,
    out: Output,
) -> Result<(), CatalogError> {
    let kind = parse_kind(kind)?;
    let raw = json::parse_attributes(attrs)?;
    let id = catalog.create(kind, &raw)?;

    if out.json_mode {
        print_json(&json!({ "id": json::record_id_to_json(id), "kind": kind.tag() }));
    } else {
        println!("Created {} ({})", id, kind);
    }
    Ok(())
}

pub fn cmd_update<S: CatalogStore>(
    catalog: &Catalog<S>,
    id: RecordId,
    attrs: &str,
    revision: Option<u64>,
    out: Output,
) -> Result<(), CatalogError> {
    let raw = json::parse_attributes(attrs)?;
    let new_revision = catalog.update(id, &raw, revision)?;

    if out.json_mode {
        print_json(&json!({ "id": json::record_id_to_json(id), "revision": new_revision }));
    } else {
        println!("Updated {} (revision {})", id, new_revision);
    }
    Ok(())
}

pub fn cmd_delete<S: CatalogStore>(
    catalog: &Catalog<S>,
    id: RecordId,
    out: Output,
) -> Result<(), CatalogError> {
    catalog.delete(id)?;

    if out.json_mode {
        print_json(&json!({ "id": json::record_id_to_json(id), "deleted": true }));
    } else {
        println!("Deleted {}", id);
    }
    Ok(())
}

pub fn cmd_get<S: CatalogStore>(
    catalog: &Catalog<S>,
    id: RecordId,
    out: Output,
) -> Result<(), CatalogError> {
    let view = catalog.get(id, out.privilege)?;

    if out.json_mode {
        print_json(&json::view_to_json(&view));
    } else {
        print_view(&view);
    }
    Ok(())
}

// =============================================================================
// GRAPH COMMANDS
// =============================================================================

pub fn cmd_part<S: CatalogStore>(
    catalog: &Catalog<S>,
    cmd: PartCommand,
    out: Output,
) -> Result<(), CatalogError> {
    match cmd {
        PartCommand::Add {
            parent,
            child,
            quantity,
        } => {
            let id = catalog.add_part(parent, SubComponentId(child), quantity)?;
            let edge = catalog.get_part(id)?;
            if out.json_mode {
                print_json(&json::part_to_json(&edge));
            } else {
                println!("Added {}: {} x{} in {}", id, edge.child, edge.quantity, edge.parent);
            }
        }
        PartCommand::Remove { id } => {
            catalog.remove_part(PartId(id))?;
            if out.json_mode {
                print_json(&json!({ "id": id, "removed": true }));
            } else {
                println!("Removed {}", PartId(id));
            }
        }
        PartCommand::Set {
            id,
            quantity,
            revision,
        } => {
            let id = PartId(id);
            let new_revision = catalog.set_part_quantity(id, quantity, revision)?;
            if out.json_mode {
                print_json(&json!({ "id": id.0, "quantity": quantity, "revision": new_revision }));
            } else {
                println!("Set {} quantity to {} (revision {})", id, quantity, new_revision);
            }
        }
        PartCommand::List { parent } => {
            let edges = catalog.list_parts(parent)?;
            if out.json_mode {
                print_json(&json!(edges.iter().map(json::part_to_json).collect::<Vec<_>>()));
            } else if edges.is_empty() {
                println!("{} has no parts", parent);
            } else {
                for edge in &edges {
                    println!(
                        "  {:<10} {:<20} x{:<6} rev {}",
                        edge.id, edge.child, edge.quantity, edge.revision
                    );
                }
            }
        }
        PartCommand::Expand { parent } => {
            let totals = catalog.expand(parent)?;
            if out.json_mode {
                let rows: Vec<_> = totals
                    .iter()
                    .map(|(child, total)| json!({ "sub_component": child.0, "total": total }))
                    .collect();
                print_json(&json!({ "parent": json::record_id_to_json(parent), "parts": rows }));
            } else {
                println!("Leaf parts of {}:", parent);
                for (child, total) in &totals {
                    println!("  {:<20} x{}", child, total);
                }
            }
        }
    }
    Ok(())
}

pub fn cmd_compat<S: CatalogStore>(
    catalog: &Catalog<S>,
    cmd: CompatCommand,
    out: Output,
) -> Result<(), CatalogError> {
    let edges = match cmd {
        CompatCommand::Add { source, target } => {
            let id = catalog.add_compatibility(ComponentId(source), ComponentId(target))?;
            if out.json_mode {
                print_json(&json!({ "id": id.0, "source": source, "target": target }));
            } else {
                println!(
                    "{}: {} works with {}",
                    id,
                    ComponentId(source),
                    ComponentId(target)
                );
            }
            return Ok(());
        }
        CompatCommand::Remove { id } => {
            catalog.remove_compatibility(CompatibilityId(id))?;
            if out.json_mode {
                print_json(&json!({ "id": id, "removed": true }));
            } else {
                println!("Removed {}", CompatibilityId(id));
            }
            return Ok(());
        }
        CompatCommand::From { component } => catalog.compatible_from(ComponentId(component))?,
        CompatCommand::To { component } => catalog.compatible_to(ComponentId(component))?,
    };

    if out.json_mode {
        print_json(&json!(edges.iter().map(json::compatibility_to_json).collect::<Vec<_>>()));
    } else if edges.is_empty() {
        println!("No compatibility edges");
    } else {
        for edge in &edges {
            println!("  {:<20} {} -> {}", edge.id, edge.source, edge.target);
        }
    }
    Ok(())
}

// =============================================================================
// VARIANT COMMANDS
// =============================================================================

pub fn cmd_color<S: CatalogStore>(
    catalog: &Catalog<S>,
    cmd: ColorCommand,
    out: Output,
) -> Result<(), CatalogError> {
    match cmd {
        ColorCommand::Add { code, name } => {
            catalog.add_color(&ColorCode::new(code.as_str()), &name)?;
            if out.json_mode {
                print_json(&json!({ "code": code, "name": name }));
            } else {
                println!("Color {} = {}", code, name);
            }
        }
        ColorCommand::Remove { code } => {
            catalog.remove_color(&ColorCode::new(code.as_str()))?;
            if out.json_mode {
                print_json(&json!({ "code": code, "removed": true }));
            } else {
                println!("Removed color {}", code);
            }
        }
        ColorCommand::List => {
            let colors = catalog.list_colors()?;
            if out.json_mode {
                print_json(&json!(colors.iter().map(json::color_to_json).collect::<Vec<_>>()));
            } else {
                for color in &colors {
                    println!("  {:<12} {}", color.code, color.name);
                }
            }
        }
    }
    Ok(())
}

pub fn cmd_variant<S: CatalogStore>(
    catalog: &Catalog<S>,
    cmd: VariantCommand,
    out: Output,
) -> Result<(), CatalogError> {
    match cmd {
        VariantCommand::Add {
            component,
            unavailable,
            price_delta,
        } => {
            let delta = price_delta
                .as_deref()
                .map(|text| parse_decimal("price_delta", text))
                .transpose()?;
            let id = catalog.add_variant(ComponentId(component), !unavailable, delta)?;
            if out.json_mode {
                print_json(&json!({ "id": id.0, "component": component }));
            } else {
                println!("Added {} of {}", id, ComponentId(component));
            }
        }
        VariantCommand::List { component } => {
            let views = catalog.list_variants(ComponentId(component))?;
            if out.json_mode {
                print_json(&json!(views.iter().map(json::variant_to_json).collect::<Vec<_>>()));
            } else {
                for view in &views {
                    let colors: Vec<&str> = view.colors.iter().map(ColorCode::as_str).collect();
                    let delta = view
                        .variant
                        .price_delta
                        .map_or_else(|| "-".to_string(), |d| d.to_string());
                    println!(
                        "  {:<14} {:<12} delta {:<10} colors [{}]",
                        view.variant.id,
                        if view.variant.available { "available" } else { "unavailable" },
                        delta,
                        colors.join(", ")
                    );
                }
            }
        }
        VariantCommand::Color { variant, color } => {
            let id = catalog.add_color_variant(VariantId(variant), &ColorCode::new(color.as_str()))?;
            if out.json_mode {
                print_json(&json!({ "id": id.0, "variant": variant, "color": color }));
            } else {
                println!("{}: {} in {}", id, VariantId(variant), color);
            }
        }
    }
    Ok(())
}

// =============================================================================
// LISTING COMMANDS
// =============================================================================

pub fn cmd_price<S: CatalogStore>(
    catalog: &Catalog<S>,
    cmd: PriceCommand,
    out: Output,
) -> Result<(), CatalogError> {
    match cmd {
        PriceCommand::Add {
            component,
            retailer,
            amount,
        } => {
            let amount = parse_decimal("amount", &amount)?;
            let id = catalog.add_price(ComponentId(component), &retailer, amount)?;
            if out.json_mode {
                print_json(&json!({ "id": id.0, "component": component, "amount": amount.to_string() }));
            } else {
                println!("Added {}: {} at {}", id, amount, retailer);
            }
        }
        PriceCommand::List { component } => {
            let prices = catalog.list_prices(ComponentId(component))?;
            if out.json_mode {
                print_json(&json!(prices.iter().map(json::price_to_json).collect::<Vec<_>>()));
            } else {
                for price in &prices {
                    println!(
                        "  {:<12} {:<24} {:>12} {}",
                        price.id,
                        price.retailer,
                        price.amount,
                        price.recorded_at.format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
    }
    Ok(())
}

pub fn cmd_review<S: CatalogStore>(
    catalog: &Catalog<S>,
    cmd: ReviewCommand,
    out: Output,
) -> Result<(), CatalogError> {
    match cmd {
        ReviewCommand::Add {
            component,
            rating,
            body,
        } => {
            let id = catalog.add_review(ComponentId(component), rating, &body)?;
            if out.json_mode {
                print_json(&json!({ "id": id.0, "component": component, "rating": rating }));
            } else {
                println!("Added {} ({} stars)", id, rating);
            }
        }
        ReviewCommand::List { component } => {
            let reviews = catalog.list_reviews(ComponentId(component))?;
            if out.json_mode {
                print_json(&json!(reviews.iter().map(json::review_to_json).collect::<Vec<_>>()));
            } else {
                for review in &reviews {
                    println!("  {} {}/5 {}", review.id, review.rating, review.body);
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// QUERY COMMAND
// =============================================================================

pub fn cmd_query<S: CatalogStore>(
    catalog: &Catalog<S>,
    spec: Option<&str>,
    file: Option<&Path>,
    out: Output,
) -> Result<(), CatalogError> {
    let text = match (spec, file) {
        (Some(spec), _) => spec.to_string(),
        (None, Some(file)) => String::from_utf8(read_limited(file, MAX_SPEC_FILE_SIZE)?)
            .map_err(|e| CatalogError::Deserialization(format!("Query file is not UTF-8: {}", e)))?,
        (None, None) => return Err(CatalogError::invalid("spec", Constraint::Missing)),
    };
    let spec = json::parse_query(&text)?;
    let page = catalog.query(&spec, out.privilege)?;

    if out.json_mode {
        print_json(&json::page_to_json(&page));
        return Ok(());
    }

    match page.paging {
        Some(paging) => println!(
            "{} matching records (page {}, {} per page)",
            page.total, paging.page, paging.page_size
        ),
        None => println!("{} matching records", page.total),
    }
    for view in &page.records {
        println!();
        print_view(view);
    }
    Ok(())
}

// =============================================================================
// EXPORT / IMPORT COMMANDS
// =============================================================================

pub fn cmd_export<S: CatalogStore>(
    catalog: &Catalog<S>,
    output: &Path,
    out: Output,
) -> Result<(), CatalogError> {
    let path = validate_output_path(output)?;
    let data = catalog.export_snapshot()?;
    std::fs::write(&path, &data)
        .map_err(|e| CatalogError::Storage(format!("Write {}: {}", path.display(), e)))?;

    if out.json_mode {
        print_json(&json!({ "output": path.to_string_lossy(), "bytes": data.len() }));
    } else {
        println!("Exported {} bytes to {}", data.len(), path.display());
    }
    Ok(())
}

pub fn cmd_import<S: CatalogStore>(
    catalog: &Catalog<S>,
    input: &Path,
    out: Output,
) -> Result<(), CatalogError> {
    let data = read_limited(input, MAX_IMPORT_FILE_SIZE)?;
    let rows = catalog.import_snapshot(&data)?;

    if out.json_mode {
        print_json(&json!({ "input": input.to_string_lossy(), "rows": rows }));
    } else {
        println!("Imported {} rows from {}", rows, input.display());
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_in_missing_directory_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("out.snap");
        assert!(matches!(
            validate_output_path(&path),
            Err(CatalogError::Storage(_))
        ));
    }

    #[test]
    fn read_limited_enforces_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("spec.json");
        std::fs::write(&path, b"{\"target\": \"CPU\"}").expect("write");

        assert_eq!(read_limited(&path, 1024).expect("read").len(), 17);
        assert!(matches!(
            read_limited(&path, 4),
            Err(CatalogError::Deserialization(_))
        ));
        assert!(read_limited(dir.path(), 1024).is_err());
    }

    #[test]
    fn decimal_arguments_report_the_field() {
        let err = parse_decimal("amount", "12,50").expect_err("comma is not a decimal point");
        assert_eq!(err.violations()[0].field, "amount");
        assert_eq!(parse_decimal("amount", "12.50").expect("decimal").to_string(), "12.5");
    }

    #[test]
    fn schema_type_descriptions() {
        assert_eq!(describe_type(&FieldType::Int { min: 1, max: 8 }), "integer 1..=8");
        assert_eq!(describe_type(&FieldType::Enum(&["A", "B"])), "one of A | B");
        assert_eq!(describe_type(&FieldType::Date), "date");
    }

    #[test]
    fn unknown_kind_tag() {
        assert!(matches!(parse_kind("Toaster"), Err(CatalogError::Validation(_))));
        assert_eq!(
            parse_kind("PCIeSlot").expect("kind").domain(),
            Domain::SubComponent
        );
    }
}
