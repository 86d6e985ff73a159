//! Cash supply conservation.
//!
//! Invariant checked against the ledger:
//! ```text
//! ∀ currency: Σ(unconsumed cash) == Σ(issued cash)
//! ```
//!
//! Moves and settlements only reshuffle cash between owners; only an
//! issuance grows the supply.

use std::collections::HashMap;

use auctionhouse_types::{Amount, AuctionError, Currency, Result};

/// Per-currency issued totals.
#[derive(Debug, Clone, Default)]
pub struct CashSupply {
    issued: HashMap<Currency, i64>,
}

impl CashSupply {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record newly issued cash.
    ///
    /// # Errors
    /// `AmountOutOfRange` if the running total overflows.
    pub fn record_issue(&mut self, amount: &Amount) -> Result<()> {
        let total = self.issued.entry(amount.currency.clone()).or_insert(0);
        *total = total
            .checked_add(amount.quantity)
            .ok_or(AuctionError::AmountOutOfRange)?;
        Ok(())
    }

    /// Expected supply for `currency`, in minor units.
    #[must_use]
    pub fn expected(&self, currency: &Currency) -> Amount {
        Amount::new(
            self.issued.get(currency).copied().unwrap_or(0),
            currency.clone(),
        )
    }

    /// Compare `actual` unconsumed cash with what was issued.
    ///
    /// # Errors
    /// [`AuctionError::SupplyInvariantViolation`] if they differ.
    pub fn verify(&self, actual: &Amount) -> Result<()> {
        let expected = self.expected(&actual.currency);
        if *actual != expected {
            return Err(AuctionError::SupplyInvariantViolation {
                reason: format!(
                    "{}: unconsumed {actual} != issued {expected}",
                    actual.currency
                ),
            });
        }
        Ok(())
    }

    /// Every currency ever issued, sorted.
    #[must_use]
    pub fn currencies(&self) -> Vec<Currency> {
        let mut currencies: Vec<Currency> = self.issued.keys().cloned().collect();
        currencies.sort();
        currencies
    }
}
