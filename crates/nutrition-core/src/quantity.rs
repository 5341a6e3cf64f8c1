//! # Quantity Module
//!
//! Provides the `Quantity` type for nutrient amounts, weights and serving
//! counts.
//!
//! ## Why Fixed-Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Labels print "12.5 g fat". As f64 that is fine, but totals are not:   │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  The backend stores DECIMAL columns and returns them as strings.        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Hundredths                                       │
//! │    "12.5"  → 1250                                                       │
//! │    "0.05"  → 5                                                          │
//! │    "100"   → 10000                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use nutrition_core::quantity::Quantity;
//!
//! let fat: Quantity = "12.5".parse().unwrap();
//! assert_eq!(fat.hundredths(), 1250);
//! assert_eq!(fat.to_string(), "12.50");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of fractional digits carried by a [`Quantity`].
pub const SCALE_DIGITS: usize = 2;

const SCALE: i64 = 100;

// =============================================================================
// Quantity Type
// =============================================================================

/// A non-negative amount with two decimal places, stored as hundredths.
///
/// Serializes as a decimal string (`"12.50"`), matching the GraphQL
/// `Decimal` scalar; deserializes from either a string or a JSON number.
/// TypeScript bindings see it as `string` (`#[ts(as = ...)]` on fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from hundredths.
    ///
    /// Negative input is clamped to zero; quantities are never negative.
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        if hundredths < 0 {
            Quantity(0)
        } else {
            Quantity(hundredths)
        }
    }

    /// Creates a quantity from a whole number of units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Self::from_hundredths(units * SCALE)
    }

    /// Returns the raw value in hundredths.
    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / SCALE
    }

    /// Returns the fractional portion in hundredths (0-99).
    #[inline]
    pub const fn fraction(&self) -> i64 {
        self.0 % SCALE
    }

    /// Zero quantity.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// Checks if the quantity is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Divides this amount by a (possibly fractional) count, rounding half up
    /// to the nearest hundredth.
    ///
    /// Returns `None` when `divisor` is zero or the result does not fit.
    ///
    /// ## Example
    /// ```rust
    /// use nutrition_core::quantity::Quantity;
    ///
    /// let energy = Quantity::from_units(1000);
    /// let servings = Quantity::from_units(3);
    /// assert_eq!(energy.divide_by(servings).unwrap().to_string(), "333.33");
    /// ```
    pub fn divide_by(&self, divisor: Quantity) -> Option<Quantity> {
        if divisor.is_zero() {
            return None;
        }

        // Both operands are in hundredths, so scale the dividend once more to
        // keep the result in hundredths. i128 avoids overflow.
        let numerator = self.0 as i128 * SCALE as i128;
        let denominator = divisor.0 as i128;
        let rounded = (numerator * 2 + denominator) / (denominator * 2);
        i64::try_from(rounded).ok().map(Quantity)
    }

    /// Parses a user- or server-supplied decimal string.
    ///
    /// Accepts `"12"`, `"12.5"`, `"12.50"`, `".5"` and surrounding whitespace.
    /// Rejects signs, exponents, grouping separators and more than two
    /// fractional digits.
    pub fn parse_field(field: &str, input: &str) -> Result<Quantity, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }

        if input.starts_with('-') {
            return Err(invalid("must not be negative"));
        }

        let (whole, frac) = match input.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (input, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("must be a number"));
        }

        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a number"));
        }

        if frac.len() > SCALE_DIGITS {
            return Err(invalid("at most 2 decimal places"));
        }

        let units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("value is too large"))?
        };

        let mut frac_hundredths: i64 = if frac.is_empty() {
            0
        } else {
            frac.parse().map_err(|_| invalid("must be a number"))?
        };
        if frac.len() == 1 {
            frac_hundredths *= 10;
        }

        units
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_hundredths))
            .map(Quantity)
            .ok_or_else(|| invalid("value is too large"))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.units(), self.fraction())
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quantity::parse_field("quantity", s)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Integer(u64),
            Float(f64),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Text(text) => text.parse().map_err(serde::de::Error::custom),
            Wire::Integer(units) => i64::try_from(units)
                .ok()
                .and_then(|u| u.checked_mul(SCALE))
                .map(Quantity)
                .ok_or_else(|| serde::de::Error::custom("quantity out of range")),
            Wire::Float(value) if value.is_finite() && value >= 0.0 => {
                Ok(Quantity((value * SCALE as f64).round() as i64))
            }
            Wire::Float(_) => Err(serde::de::Error::custom("quantity must be non-negative")),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
