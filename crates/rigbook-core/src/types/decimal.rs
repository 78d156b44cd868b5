//! # Fixed-Point Decimal
//!
//! Decimal attributes (clock speeds, lengths, wattages, price deltas) are
//! stored as signed thousandths in an `i64`. This keeps every comparison
//! exact and totally ordered, and keeps floating point out of the CORE.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by [`Decimal`].
pub const DECIMAL_PLACES: usize = 3;

/// A decimal number with three fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decimal(i64);

/// Reasons a decimal literal can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("empty decimal literal")]
    Empty,
    #[error("invalid character in decimal literal")]
    InvalidDigit,
    #[error("more than {DECIMAL_PLACES} fractional digits")]
    TooPrecise,
    #[error("decimal literal out of range")]
    Overflow,
}

impl Decimal {
    /// Scale factor between the stored integer and the represented value.
    pub const SCALE: i64 = 1000;

    pub const ZERO: Self = Self(0);

    /// Build a decimal from a whole number (saturating on overflow).
    #[must_use]
    pub const fn from_int(value: i64) -> Self {
        Self(value.saturating_mul(Self::SCALE))
    }

    /// Build a decimal from a raw count of thousandths.
    #[must_use]
    pub const fn from_thousandths(thousandths: i64) -> Self {
        Self(thousandths)
    }

    /// The raw count of thousandths.
    #[must_use]
    pub const fn thousandths(self) -> i64 {
        self.0
    }

    /// Whole part, truncated toward zero.
    #[must_use]
    pub const fn trunc(self) -> i64 {
        self.0 / Self::SCALE
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl FromStr for Decimal {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecimalError::Empty);
        }

        let (negative, unsigned) = match s.as_bytes()[0] {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let (whole, fraction) = match unsigned.split_once('.') {
            Some((w, f)) => (w, f),
            None => (unsigned, ""),
        };

        if whole.is_empty() {
            return Err(DecimalError::Empty);
        }
        if unsigned.contains('.') && fraction.is_empty() {
            return Err(DecimalError::InvalidDigit);
        }
        if fraction.len() > DECIMAL_PLACES {
            return Err(DecimalError::TooPrecise);
        }

        let mut whole_value: i64 = 0;
        for byte in whole.bytes() {
            let digit = ascii_digit(byte)?;
            whole_value = whole_value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or(DecimalError::Overflow)?;
        }

        let mut fraction_value: i64 = 0;
        for position in 0..DECIMAL_PLACES {
            let digit = match fraction.as_bytes().get(position) {
                Some(&byte) => ascii_digit(byte)?,
                None => 0,
            };
            fraction_value = fraction_value * 10 + digit;
        }

        let magnitude = whole_value
            .checked_mul(Self::SCALE)
            .and_then(|v| v.checked_add(fraction_value))
            .ok_or(DecimalError::Overflow)?;

        Ok(Self(if negative { -magnitude } else { magnitude }))
    }
}

fn ascii_digit(byte: u8) -> Result<i64, DecimalError> {
    if byte.is_ascii_digit() {
        Ok(i64::from(byte - b'0'))
    } else {
        Err(DecimalError::InvalidDigit)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let scale = Self::SCALE.unsigned_abs();
        let whole = magnitude / scale;
        let fraction = magnitude % scale;

        if fraction == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let digits = format!("{fraction:03}");
            write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

// Human-readable formats (JSON, TOML) carry the literal; binary formats
// (postcard rows) carry the raw thousandths.
impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_i64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(DecimalVisitor)
        } else {
            i64::deserialize(deserializer).map(Self)
        }
    }
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or decimal string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from_int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        i64::try_from(v)
            .map(Decimal::from_int)
            .map_err(|_| E::custom(DecimalError::Overflow))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        v.parse().map_err(E::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================
