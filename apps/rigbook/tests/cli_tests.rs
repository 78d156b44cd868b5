//! Tests for argument parsing, JSON conversion, and whole-command runs
//! against a temporary catalog.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use rigbook::cli::{self, Cli, Commands, PartCommand, load_file_catalog, parse_record_id};
use rigbook::config::{AppConfig, Backend};
use rigbook::json;
use rigbook_core::{
    Catalog, CatalogError, ComponentId, ComponentKind, Domain, Kind, MemoryStore, PartId, Privilege,
    QueryTarget, RawValue, RecordId, RecordView, SubComponentId, Value,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

const CPU_ATTRS: &str = r#"{
    "Name": "Ryzen 7 7700X",
    "Manufacturer": "AMD",
    "CoreTotal": 8,
    "ThreadsAmount": 16,
    "BaseClock": 4.5,
    "ThermalDesignPower": 105,
    "Socket": "AM5"
}"#;

/// Run one command line against `dir`, with an explicit config file so the
/// working directory never leaks in.
fn run(dir: &Path, backend: &str, args: &[&str]) -> Result<(), CatalogError> {
    let config = dir.join("rigbook.toml");
    std::fs::write(&config, "").unwrap();
    let database = dir.join("catalog.db");

    let mut argv = vec![
        "rigbook".to_string(),
        "--quiet".to_string(),
        "--config".to_string(),
        config.display().to_string(),
        "--database".to_string(),
        database.display().to_string(),
        "--backend".to_string(),
        backend.to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    cli::execute(Cli::try_parse_from(argv).unwrap())
}

fn file_catalog(dir: &Path) -> Catalog<MemoryStore> {
    let config = AppConfig {
        database: dir.join("catalog.db"),
        backend: Backend::File,
        ..AppConfig::default()
    };
    load_file_catalog(&config.database, &config).unwrap()
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_parse_record_id_forms() {
    assert_eq!(
        parse_record_id("component#7").unwrap(),
        RecordId::Component(ComponentId(7))
    );
    assert_eq!(
        parse_record_id("sub-component:3").unwrap(),
        RecordId::SubComponent(SubComponentId(3))
    );
    assert!(parse_record_id("7").is_err());
    assert!(parse_record_id("part#7").is_err());
    assert!(parse_record_id("component#x").is_err());
}

#[test]
fn test_cli_parses_part_add() {
    let cli = Cli::try_parse_from([
        "rigbook", "part", "add", "-p", "component#1", "-c", "4", "--quantity", "2",
    ])
    .unwrap();
    match cli.command {
        Some(Commands::Part(PartCommand::Add {
            parent,
            child,
            quantity,
        })) => {
            assert_eq!(parent, RecordId::Component(ComponentId(1)));
            assert_eq!(child, 4);
            assert_eq!(quantity, 2);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_part_set_requires_revision() {
    assert!(Cli::try_parse_from(["rigbook", "part", "set", "-i", "1", "--quantity", "2"]).is_err());
    let cli = Cli::try_parse_from([
        "rigbook", "part", "set", "-i", "1", "--quantity", "2", "-r", "1",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Part(PartCommand::Set {
            id: 1,
            quantity: 2,
            revision: 1
        }))
    ));
}

#[test]
fn test_query_spec_and_file_conflict() {
    let result = Cli::try_parse_from(["rigbook", "query", "-s", "{}", "-f", "q.json"]);
    assert!(result.is_err());
}

#[test]
fn test_unknown_backend_flag_is_rejected() {
    assert!(Cli::try_parse_from(["rigbook", "--backend", "sqlite", "status"]).is_err());
}

// =============================================================================
// JSON CONVERSION
// =============================================================================

#[test]
fn test_parse_attributes() {
    let attrs = json::parse_attributes(r#"{"Name": "X", "CoreTotal": 8, "BaseClock": 4.5, "Series": null}"#)
        .unwrap();
    assert_eq!(attrs["Name"], RawValue::Text("X".to_string()));
    assert_eq!(attrs["CoreTotal"], RawValue::Int(8));
    assert_eq!(attrs["BaseClock"], RawValue::Decimal("4.5".parse().unwrap()));
    assert_eq!(attrs["Series"], RawValue::Null);
}

#[test]
fn test_nested_attribute_values_are_rejected() {
    assert!(matches!(
        json::parse_attributes(r#"{"Name": ["a", "b"]}"#),
        Err(CatalogError::Deserialization(_))
    ));
}

#[test]
fn test_parse_query_document() {
    let spec = json::parse_query(
        r#"{
            "target": "Component",
            "filters": {
                "Type": ["CPU", "GPU"],
                "CoreTotal": {"start": 8}
            },
            "text": "amd",
            "order": {"field": "CoreTotal", "direction": "desc"},
            "paging": {"page": 2, "page_size": 10}
        }"#,
    )
    .unwrap();
    assert_eq!(spec.target, QueryTarget::Domain(Domain::Component));
    assert_eq!(spec.filters.len(), 2);
    assert_eq!(spec.text.as_deref(), Some("amd"));
    assert_eq!(spec.paging.map(|p| p.page), Some(2));
}

#[test]
fn test_parse_query_rejects_unknown_keys_and_targets() {
    assert!(json::parse_query(r#"{"target": "CPU", "limit": 3}"#).is_err());
    assert!(json::parse_query(r#"{"target": "Toaster"}"#).is_err());
}

#[test]
fn test_view_json_keeps_decimals_as_strings() {
    let mut fields = BTreeMap::new();
    fields.insert("BaseClock".to_string(), Value::Decimal("4.5".parse().unwrap()));
    fields.insert("CoreTotal".to_string(), Value::Int(8));
    let view = RecordView {
        id: RecordId::Component(ComponentId(1)),
        kind: Kind::Component(ComponentKind::Cpu),
        revision: 1,
        fields,
    };

    let output = json::view_to_json(&view);
    assert_eq!(output["id"], json!({ "component": 1 }));
    assert_eq!(output["kind"], "CPU");
    assert_eq!(output["fields"]["BaseClock"], "4.5");
    assert_eq!(output["fields"]["CoreTotal"], 8);
}

// =============================================================================
// COMMAND RUNS
// =============================================================================

#[test]
fn test_file_backend_persists_between_runs() {
    let dir = tempfile::tempdir().unwrap();
    run(dir.path(), "file", &["init"]).unwrap();
    run(dir.path(), "file", &["create", "-k", "CPU", "-a", CPU_ATTRS]).unwrap();
    run(dir.path(), "file", &["color", "add", "-c", "BLK", "-n", "Black"]).unwrap();
    run(dir.path(), "file", &["variant", "add", "-c", "1", "-p", "15.00"]).unwrap();
    run(dir.path(), "file", &["variant", "color", "-v", "1", "-c", "BLK"]).unwrap();

    let catalog = file_catalog(dir.path());
    let view = catalog
        .get(RecordId::Component(ComponentId(1)), Privilege::Public)
        .unwrap();
    assert_eq!(view.get("CoreTotal"), Some(&Value::Int(8)));
    let variants = catalog.list_variants(ComponentId(1)).unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].colors.len(), 1);
}

#[test]
fn test_init_refuses_existing_database() {
    let dir = tempfile::tempdir().unwrap();
    run(dir.path(), "file", &["init"]).unwrap();
    assert!(matches!(
        run(dir.path(), "file", &["init"]),
        Err(CatalogError::Storage(_))
    ));
    run(dir.path(), "file", &["init", "--force"]).unwrap();
}

#[test]
fn test_failed_command_leaves_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    run(dir.path(), "file", &["init"]).unwrap();
    let before = std::fs::read(dir.path().join("catalog.db")).unwrap();

    let result = run(dir.path(), "file", &["create", "-k", "CPU", "-a", r#"{"Name": "X"}"#]);
    assert!(matches!(result, Err(CatalogError::Validation(_))));
    assert_eq!(std::fs::read(dir.path().join("catalog.db")).unwrap(), before);
}

#[test]
fn test_redb_backend_query_and_export() {
    let dir = tempfile::tempdir().unwrap();
    run(dir.path(), "redb", &["create", "-k", "CPU", "-a", CPU_ATTRS]).unwrap();
    run(
        dir.path(),
        "redb",
        &["query", "-s", r#"{"target": "CPU", "filters": {"CoreTotal": {"start": 4}}}"#],
    )
    .unwrap();

    let snapshot = dir.path().join("catalog.snap");
    run(
        dir.path(),
        "redb",
        &["export", "-o", &snapshot.display().to_string()],
    )
    .unwrap();

    let fresh = tempfile::tempdir().unwrap();
    run(
        fresh.path(),
        "file",
        &["import", "-i", &snapshot.display().to_string()],
    )
    .unwrap();
    let catalog = file_catalog(fresh.path());
    assert_eq!(catalog.stats().unwrap().kinds["CPU"], 1);
}

#[test]
fn test_part_set_with_stale_revision_fails() {
    let dir = tempfile::tempdir().unwrap();
    let slot = r#"{"Name": "x16", "Generation": 4, "Lanes": 16}"#;
    run(dir.path(), "file", &["create", "-k", "PCIeSlot", "-a", slot]).unwrap();
    run(dir.path(), "file", &["create", "-k", "PCIeSlot", "-a", slot]).unwrap();
    run(
        dir.path(),
        "file",
        &["part", "add", "-p", "sub-component#1", "-c", "2", "--quantity", "2"],
    )
    .unwrap();

    run(
        dir.path(),
        "file",
        &["part", "set", "-i", "1", "--quantity", "3", "-r", "1"],
    )
    .unwrap();
    let stale = run(
        dir.path(),
        "file",
        &["part", "set", "-i", "1", "--quantity", "5", "-r", "1"],
    );
    assert!(matches!(stale, Err(CatalogError::ConcurrencyConflict { .. })));

    let edge = file_catalog(dir.path()).get_part(PartId(1)).unwrap();
    assert_eq!((edge.quantity, edge.revision), (3, 2));
}

#[test]
fn test_query_with_bad_range_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = run(
        dir.path(),
        "file",
        &["query", "-s", r#"{"target": "CPU", "filters": {"Socket": {"start": "AM4"}}}"#],
    );
    assert!(matches!(result, Err(CatalogError::BadFilterRange { .. })));
}
