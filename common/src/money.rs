use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::CoreErrorKind;

/// Pix transfers are capped at R$ 20,000.00 (§3 of the core spec).
pub const PIX_MAX: Money = Money(2_000_000);

/// Signed integer minor-units (cents) value type. Storing money as an
/// exact integer rather than a binary float eliminates rounding drift in
/// the ledger; every arithmetic operation in the core uses this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor_units(cents: i64) -> Self {
        Self(cents)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// Parses a decimal string in major units ("12.34") into cents, rounding
    /// half-up to 2 decimal places. Empty or non-numeric input fails with
    /// `INVALID_AMOUNT`.
    pub fn from_major_units_string(input: &str) -> Result<Self, CoreErrorKind> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CoreErrorKind::InvalidAmount);
        }
        let decimal = Decimal::from_str(trimmed).map_err(|_| CoreErrorKind::InvalidAmount)?;
        let rounded = decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let cents = rounded * Decimal::from(100);
        let cents_i64: i64 = cents.try_into().map_err(|_| CoreErrorKind::InvalidAmount)?;
        Ok(Self(cents_i64))
    }

    pub fn to_major_units_string(&self) -> String {
        let decimal = Decimal::from(self.0) / Decimal::from(100);
        decimal.round_dp(2).to_string()
    }

    pub fn add(&self, other: Money) -> Result<Money, CoreErrorKind> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(CoreErrorKind::InternalError)
    }

    pub fn subtract(&self, other: Money) -> Result<Money, CoreErrorKind> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(CoreErrorKind::InternalError)
    }

    pub fn multiply(&self, factor: i64) -> Result<Money, CoreErrorKind> {
        self.0
            .checked_mul(factor)
            .map(Money)
            .ok_or(CoreErrorKind::InternalError)
    }

    pub fn negate(&self) -> Money {
        Money(-self.0)
    }

    pub fn abs(&self) -> Money {
        Money(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major_units_string())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

/// Pix-specific amount validation: must be strictly positive and not exceed
/// `PIX_MAX`. Amounts below 1 cent are rejected by construction (minor units
/// are already integral cents, so "below 1 cent" only happens at zero).
pub fn validate_pix_amount(amount: Money) -> Result<(), CoreErrorKind> {
    if amount.is_zero() || amount.is_negative() {
        return Err(CoreErrorKind::InvalidAmount);
    }
    if amount > PIX_MAX {
        return Err(CoreErrorKind::AmountOutOfRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_major_units_with_half_up_rounding() {
        let m = Money::from_major_units_string("12.345").unwrap();
        assert_eq!(m.minor_units(), 1235);
    }

    #[test]
    fn rejects_empty_and_non_numeric_strings() {
        assert_eq!(
            Money::from_major_units_string("").unwrap_err(),
            CoreErrorKind::InvalidAmount
        );
        assert_eq!(
            Money::from_major_units_string("not-a-number").unwrap_err(),
            CoreErrorKind::InvalidAmount
        );
    }

    #[test]
    fn arithmetic_is_exact() {
        let a = Money::from_minor_units(1000);
        let b = Money::from_minor_units(250);
        assert_eq!(a.add(b).unwrap().minor_units(), 1250);
        assert_eq!(a.subtract(b).unwrap().minor_units(), 750);
        assert_eq!(a.negate().minor_units(), -1000);
        assert_eq!(a.negate().abs(), a);
    }

    #[test]
    fn overflowing_add_fails_internal_error() {
        let a = Money::from_minor_units(i64::MAX);
        let b = Money::from_minor_units(1);
        assert_eq!(a.add(b).unwrap_err(), CoreErrorKind::InternalError);
    }

    #[test]
    fn pix_amount_boundaries() {
        assert!(validate_pix_amount(Money::from_minor_units(1)).is_ok());
        assert_eq!(
            validate_pix_amount(Money::ZERO).unwrap_err(),
            CoreErrorKind::InvalidAmount
        );
        assert!(validate_pix_amount(PIX_MAX).is_ok());
        assert_eq!(
            validate_pix_amount(PIX_MAX.add(Money::from_minor_units(1)).unwrap()).unwrap_err(),
            CoreErrorKind::AmountOutOfRange
        );
    }
}
