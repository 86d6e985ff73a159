//! Small helpers shared by every contract rule set.
//!
//! Each rule is a named condition; the first one that does not hold becomes
//! the reported [`AuctionError::ContractViolation`].

use std::collections::BTreeSet;

use auctionhouse_types::{AuctionError, ContractKind, PartyKey, Result, Transaction};
use chrono::{DateTime, Utc};

/// Rule checker bound to one contract name.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Requirements {
    contract: &'static str,
}

impl Requirements {
    pub(crate) fn new(kind: ContractKind) -> Self {
        Self {
            contract: kind.name(),
        }
    }

    /// Fail with `reason` unless `condition` holds.
    pub(crate) fn using(self, reason: &str, condition: bool) -> Result<()> {
        if condition {
            Ok(())
        } else {
            Err(AuctionError::violation(self.contract, reason))
        }
    }

    /// Exactly one element, or fail with `reason`.
    pub(crate) fn single<'a, T>(self, reason: &str, items: &[&'a T]) -> Result<&'a T> {
        match items {
            [one] => Ok(*one),
            _ => Err(AuctionError::violation(self.contract, reason)),
        }
    }

    /// The signer set must equal `expected` exactly.
    pub(crate) fn signers(
        self,
        reason: &str,
        actual: &BTreeSet<PartyKey>,
        expected: impl IntoIterator<Item = PartyKey>,
    ) -> Result<()> {
        let expected: BTreeSet<PartyKey> = expected.into_iter().collect();
        self.using(reason, *actual == expected)
    }

    /// Lower bound of the time window, or `MissingTimestamp`.
    pub(crate) fn timestamp(self, tx: &Transaction, reason: &str) -> Result<DateTime<Utc>> {
        tx.time_from().ok_or_else(|| AuctionError::MissingTimestamp {
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn using_reports_reason() {
        let req = Requirements::new(ContractKind::Auction);
        assert!(req.using("fine", true).is_ok());
        assert_eq!(
            req.using("The bidder cannot be empty", false).unwrap_err(),
            AuctionError::violation("AuctionContract", "The bidder cannot be empty")
        );
    }

    #[test]
    fn single_rejects_zero_and_many() {
        let req = Requirements::new(ContractKind::Cash);
        let (a, b) = (1, 2);
        assert_eq!(*req.single("one", &[&a]).unwrap(), 1);
        assert!(req.single::<i32>("one", &[]).is_err());
        assert!(req.single("one", &[&a, &b]).is_err());
    }

    #[test]
    fn signers_compare_as_sets() {
        let req = Requirements::new(ContractKind::AuctionItem);
        let actual: BTreeSet<_> = [PartyKey([1; 32]), PartyKey([2; 32])].into_iter().collect();
        assert!(req.signers("s", &actual, [PartyKey([2; 32]), PartyKey([1; 32])]).is_ok());
        assert!(req.signers("s", &actual, [PartyKey([1; 32])]).is_err());
        assert!(
            req.signers("s", &actual, [PartyKey([1; 32]), PartyKey([2; 32]), PartyKey([3; 32])])
                .is_err()
        );
    }
}
