use crate::error::ValidationError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest amount the payments service accepts, in major currency units.
pub const MINIMUM_AMOUNT: Decimal = dec!(10);

/// Represents a pool balance as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] pub Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// `None` when the sum does not fit a `Decimal`.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }
}

/// Represents a positive monetary amount the user asked to move.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidAmount)
        }
    }

    /// Parses raw form input and enforces `minimum`.
    ///
    /// Empty input, anything that is not a decimal number, and non-positive
    /// values are rejected before the minimum is checked.
    pub fn parse(raw: &str, minimum: Decimal) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::AmountRequired);
        }
        let value = Decimal::from_str(raw).map_err(|_| ValidationError::InvalidAmount)?;
        let amount = Self::new(value)?;
        if amount.0 < minimum {
            return Err(ValidationError::BelowMinimum(minimum));
        }
        if amount.to_minor_units().is_none() {
            return Err(ValidationError::AmountTooLarge);
        }
        Ok(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Amount in minor units (cents), as the hosted checkout expects it.
    /// `None` when it does not fit a `u64`.
    pub fn to_minor_units(&self) -> Option<u64> {
        self.0.checked_mul(dec!(100))?.round().to_u64()
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl From<Amount> for Balance {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
