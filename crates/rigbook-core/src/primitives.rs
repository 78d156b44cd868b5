//! # Catalog Primitives
//!
//! Hardcoded runtime constants for the rigbook CORE.
//!
//! These are compiled into the binary and are immutable at runtime.
//! Tunable limits live in [`crate::CatalogConfig`] instead.

use crate::Decimal;

/// Magic bytes for the rigbook snapshot header.
///
/// - Snapshot = Magic Bytes ("RBOK") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"RBOK";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const FORMAT_VERSION: u8 = 1;

/// Smallest quantity a part-of edge may carry.
pub const MIN_PART_QUANTITY: u32 = 1;

/// Maximum length of a color code.
pub const MAX_COLOR_CODE_LENGTH: usize = 16;

/// Maximum length of a color display name.
pub const MAX_COLOR_NAME_LENGTH: usize = 64;

/// Maximum length of a retailer name on a price row.
pub const MAX_RETAILER_LENGTH: usize = 100;

/// Largest accepted price amount.
pub const MAX_PRICE: Decimal = Decimal::from_int(1_000_000);

/// Maximum length of a review body.
pub const MAX_REVIEW_LENGTH: usize = 5000;

/// Review ratings are whole stars in `MIN_RATING..=MAX_RATING`.
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_are_correct() {
        assert_eq!(MAGIC_BYTES, b"RBOK");
    }

    #[test]
    fn rating_bounds_are_ordered() {
        assert!(MIN_RATING < MAX_RATING);
        assert_eq!(MIN_PART_QUANTITY, 1);
    }
}
