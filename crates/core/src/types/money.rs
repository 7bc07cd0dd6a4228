//! Fixed-point money and tax rate types.
//!
//! All storefront arithmetic happens in integer minor units (cents). Values
//! cross the database boundary as `NUMERIC` via [`rust_decimal::Decimal`] and
//! serialize to JSON as decimal strings (e.g. `"34.50"`).

use core::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The decimal has more than two fractional digits.
    #[error("amount {0} has more than two decimal places")]
    TooPrecise(Decimal),
    /// The amount does not fit in 64-bit cents.
    #[error("amount out of range")]
    Overflow,
}

/// An amount of money in minor currency units (cents).
///
/// ## Examples
///
/// ```
/// use tienda_core::Money;
///
/// let price = Money::from_cents(1000);
/// let line = price.checked_mul(3).unwrap();
/// assert_eq!(line.to_string(), "30.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from cents.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Amount in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Convert a decimal in major units (e.g. `19.99`) to cents.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooPrecise`] if the decimal has sub-cent digits,
    /// or [`MoneyError::Overflow`] if it does not fit.
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        let scaled = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(MoneyError::Overflow)?;
        if !scaled.fract().is_zero() {
            return Err(MoneyError::TooPrecise(amount));
        }
        scaled.to_i64().map(Self).ok_or(MoneyError::Overflow)
    }

    /// Amount in major units with a scale of two.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Add two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Multiply by a quantity, returning `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(i64::from(quantity)).map(Self)
    }

    /// Format with a dollar sign for display (e.g. `$34.50`).
    #[must_use]
    pub fn display(self) -> String {
        if self.0 < 0 {
            format!("-${}", Self(self.0.saturating_neg()))
        } else {
            format!("${self}")
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.to_decimal()
    }
}

/// A tax rate expressed in basis points (1/100 of a percent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// The storefront's flat 15% sales tax.
    pub const STANDARD: Self = Self(1_500);

    /// Create a rate from basis points (`1500` = 15%).
    #[must_use]
    pub const fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    /// Rate in basis points.
    #[must_use]
    pub const fn basis_points(self) -> u32 {
        self.0
    }

    /// Tax owed on `amount`, rounded half away from zero to the cent.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] if the result does not fit.
    pub fn tax_on(self, amount: Money) -> Result<Money, MoneyError> {
        let product = i128::from(amount.cents()) * i128::from(self.0);
        let half = if product < 0 { -5_000 } else { 5_000 };
        let cents = (product + half) / 10_000;
        i64::try_from(cents)
            .map(Money::from_cents)
            .map_err(|_| MoneyError::Overflow)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self::STANDARD
    }
}
