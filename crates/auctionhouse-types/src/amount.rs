//! Fixed-point money model.
//!
//! An [`Amount`] is an integer quantity of a currency's minor units
//! (pence, cents). Every comparison or arithmetic operation between two
//! amounts requires the same currency and fails with
//! [`AuctionError::CurrencyMismatch`] otherwise.

use std::{cmp::Ordering, fmt};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AuctionError, Result};

/// ISO-4217 style currency code (e.g. "GBP").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_ascii_uppercase())
    }

    #[must_use]
    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    #[must_use]
    pub fn usd() -> Self {
        Self::new("USD")
    }

    #[must_use]
    pub fn eur() -> Self {
        Self::new("EUR")
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of minor-unit digits (2 for GBP, 0 for JPY).
    #[must_use]
    pub fn fraction_digits(&self) -> u32 {
        match self.0.as_str() {
            "JPY" | "KRW" => 0,
            "BHD" | "KWD" => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A quantity of money in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    pub quantity: i64,
    pub currency: Currency,
}

impl Amount {
    #[must_use]
    pub fn new(quantity: i64, currency: Currency) -> Self {
        Self { quantity, currency }
    }

    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Build an amount from whole major units, e.g. `from_major(1000, GBP)` is £1000.00.
    pub fn from_major(units: i64, currency: Currency) -> Result<Self> {
        let scale = 10_i64.pow(currency.fraction_digits());
        let quantity = units
            .checked_mul(scale)
            .ok_or(AuctionError::AmountOutOfRange)?;
        Ok(Self::new(quantity, currency))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.quantity == 0
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.quantity > 0
    }

    fn same_currency(&self, other: &Self) -> Result<()> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(AuctionError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }

    /// Currency-checked ordering.
    pub fn compare(&self, other: &Self) -> Result<Ordering> {
        self.same_currency(other)?;
        Ok(self.quantity.cmp(&other.quantity))
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        self.same_currency(other)?;
        let quantity = self
            .quantity
            .checked_add(other.quantity)
            .ok_or(AuctionError::AmountOutOfRange)?;
        Ok(Self::new(quantity, self.currency.clone()))
    }

    /// Subtract, refusing to go below zero.
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.same_currency(other)?;
        match self.quantity.checked_sub(other.quantity) {
            Some(quantity) if quantity >= 0 => Ok(Self::new(quantity, self.currency.clone())),
            _ => Err(AuctionError::AmountOutOfRange),
        }
    }

    /// Sum a sequence of amounts, all of which must be in `currency`.
    pub fn sum<'a, I>(amounts: I, currency: &Currency) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Amount>,
    {
        amounts
            .into_iter()
            .try_fold(Self::zero(currency.clone()), |acc, a| acc.checked_add(a))
    }

    /// Major-unit decimal view, e.g. 120000 GBP minor units → `1200.00`.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.quantity, self.currency.fraction_digits())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.to_decimal(), self.currency)
    }
}
