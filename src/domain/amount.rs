//! Amount type
//!
//! Domain primitive for monetary amounts with business rule validation.
//! Amounts are validated at construction time and always carry exactly
//! two decimal places (currency minor units), matching the NUMERIC(15,2)
//! columns they are stored in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places of every stored monetary value
pub const MONEY_SCALE: u32 = 2;

/// Largest value a NUMERIC(15,2) column can hold, in minor units
const MAX_MINOR_UNITS: i64 = 999_999_999_999_999;

/// Largest representable monetary value (9 999 999 999 999.99)
pub fn max_money() -> Decimal {
    Decimal::new(MAX_MINOR_UNITS, MONEY_SCALE)
}

/// Normalize a monetary value to exactly two decimal places.
pub fn to_money(mut value: Decimal) -> Decimal {
    value.rescale(MONEY_SCALE);
    value
}

/// Check that a value fits the stored column range (sign-insensitive).
pub fn fits_money_range(value: Decimal) -> bool {
    value.abs() <= max_money()
}

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - At most 2 decimal places
/// - At most 9 999 999 999 999.99
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use core_banking::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(5000, 2)).unwrap();
/// assert_eq!(amount.to_string(), "50.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(Decimal),

    #[error("Amount has too many decimal places (max {MONEY_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value")]
    Overflow,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 significant decimal places
    /// - `AmountError::Overflow` if value does not fit NUMERIC(15,2)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        // Trailing zeros beyond the minor unit are harmless ("10.500")
        let normalized = value.normalize();
        if normalized.scale() > MONEY_SCALE {
            return Err(AmountError::TooManyDecimals(normalized.scale()));
        }

        if !fits_money_range(value) {
            return Err(AmountError::Overflow);
        }

        Ok(Self(to_money(value)))
    }

    /// Create an Amount from a number of minor units (cents).
    pub fn from_minor_units(cents: i64) -> Result<Self, AmountError> {
        Self::new(Decimal::new(cents, MONEY_SCALE))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decimal = Decimal::from_str(s.trim())
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(decimal)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
