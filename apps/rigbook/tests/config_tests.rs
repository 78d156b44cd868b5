//! Tests for TOML configuration loading and command line overrides.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use rigbook::config::{AppConfig, Backend, DEFAULT_DATABASE};
use rigbook_core::CatalogError;
use std::path::PathBuf;

// =============================================================================
// PARSING
// =============================================================================

#[test]
fn test_empty_document_gives_defaults() {
    let config = AppConfig::from_toml("").unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
    assert_eq!(config.backend, Backend::Redb);
}

#[test]
fn test_full_document() {
    let config = AppConfig::from_toml(
        r#"
        database = "/var/lib/rigbook/catalog.snap"
        backend = "file"

        [catalog]
        max_page_size = 50
        allow_self_compatibility = true
        max_text_terms = 4
        "#,
    )
    .unwrap();

    assert_eq!(config.database, PathBuf::from("/var/lib/rigbook/catalog.snap"));
    assert_eq!(config.backend, Backend::File);
    assert_eq!(config.catalog.max_page_size, 50);
    assert!(config.catalog.allow_self_compatibility);
    assert_eq!(config.catalog.max_text_terms, 4);
}

#[test]
fn test_partial_catalog_section_keeps_other_defaults() {
    let config = AppConfig::from_toml("[catalog]\nmax_page_size = 10\n").unwrap();
    assert_eq!(config.catalog.max_page_size, 10);
    assert!(!config.catalog.allow_self_compatibility);
    assert_eq!(config.backend, Backend::Redb);
}

#[test]
fn test_unknown_keys_are_rejected() {
    assert!(matches!(
        AppConfig::from_toml("databse = \"typo.db\"\n"),
        Err(CatalogError::Config(_))
    ));
    assert!(matches!(
        AppConfig::from_toml("[catalog]\npage_limit = 3\n"),
        Err(CatalogError::Config(_))
    ));
}

#[test]
fn test_unknown_backend_is_rejected() {
    assert!(AppConfig::from_toml("backend = \"sqlite\"\n").is_err());
}

#[test]
fn test_zero_page_size_fails_validation() {
    let err = AppConfig::from_toml("[catalog]\nmax_page_size = 0\n").unwrap_err();
    assert!(err.to_string().contains("max_page_size"));
}

// =============================================================================
// LOADING & OVERRIDES
// =============================================================================

#[test]
fn test_load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rigbook.toml");
    std::fs::write(&path, "backend = \"file\"\n").unwrap();

    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.backend, Backend::File);
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(
        AppConfig::load(Some(&path)),
        Err(CatalogError::Config(_))
    ));
}

#[test]
fn test_overrides_win() {
    let config = AppConfig::from_toml("database = \"a.db\"\nbackend = \"redb\"\n")
        .unwrap()
        .with_overrides(Some(PathBuf::from("b.snap")), Some(Backend::File));
    assert_eq!(config.database, PathBuf::from("b.snap"));
    assert_eq!(config.backend, Backend::File);
}

#[test]
fn test_absent_overrides_keep_file_values() {
    let config = AppConfig::from_toml("database = \"a.db\"\n")
        .unwrap()
        .with_overrides(None, None);
    assert_eq!(config.database, PathBuf::from("a.db"));
}
