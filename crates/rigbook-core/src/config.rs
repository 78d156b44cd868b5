//! # Catalog Configuration
//!
//! Explicit configuration for a [`crate::Catalog`] instance.
//!
//! Constructed once (defaults, or deserialized from the app's TOML file) and
//! owned by the catalog. The CORE keeps no process-wide mutable settings.

use crate::CatalogError;
use serde::{Deserialize, Serialize};

/// Upper bound a caller may request as `page_size`.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 500;

/// Maximum number of whitespace-separated free-text terms per query.
pub const DEFAULT_MAX_TEXT_TERMS: usize = 16;

/// Tunable limits and policies of the catalog engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Largest accepted `page_size`; larger requests fail with `BadPaging`.
    pub max_page_size: usize,
    /// Accept `A -> A` compatibility edges.
    pub allow_self_compatibility: bool,
    /// Largest accepted number of free-text terms.
    pub max_text_terms: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            allow_self_compatibility: false,
            max_text_terms: DEFAULT_MAX_TEXT_TERMS,
        }
    }
}

impl CatalogConfig {
    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.max_page_size == 0 {
            return Err(CatalogError::Config(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        if self.max_text_terms == 0 {
            return Err(CatalogError::Config(
                "max_text_terms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
