//! Ledger state entities.
//!
//! States are immutable values. Every "mutation" is a pure function that
//! returns the next version; the ledger links versions of the same linear
//! state through their `id`.
//!
//! ## Lifecycles
//!
//! ```text
//!   AuctionItemState:  Issued(listed=false) ⇄ Listed(listed=true) → Transferred(new owner, listed=false)
//!   AuctionState:      Listed(bidder=none) → Bid(P1) → Bid(P2, higher) → … → Settled | Ended
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Amount, Party, PartyKey, UniqueId};

// ---------------------------------------------------------------------------
// AuctionItemState
// ---------------------------------------------------------------------------

/// Something that can be auctioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionItemState {
    pub id: UniqueId,
    pub description: String,
    pub owner: Party,
    pub listed: bool,
}

impl AuctionItemState {
    /// A freshly issued, unlisted item.
    #[must_use]
    pub fn issue(description: impl Into<String>, owner: Party) -> Self {
        Self {
            id: UniqueId::new(),
            description: description.into(),
            owner,
            listed: false,
        }
    }

    /// Next version, listed in an auction.
    #[must_use]
    pub fn list(&self) -> Self {
        Self {
            listed: true,
            ..self.clone()
        }
    }

    /// Next version, withdrawn from its auction.
    #[must_use]
    pub fn delist(&self) -> Self {
        Self {
            listed: false,
            ..self.clone()
        }
    }

    /// Next version, owned by `new_owner` and unlisted.
    #[must_use]
    pub fn transfer(&self, new_owner: Party) -> Self {
        Self {
            owner: new_owner,
            listed: false,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn participants(&self) -> Vec<Party> {
        vec![self.owner.clone()]
    }
}

// ---------------------------------------------------------------------------
// AuctionState
// ---------------------------------------------------------------------------

/// A running auction for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionState {
    pub id: UniqueId,
    /// Linear id of the [`AuctionItemState`] being sold.
    pub item_id: UniqueId,
    /// Starting price until the first bid, then the highest bid.
    pub price: Amount,
    pub seller: Party,
    pub bidder: Option<Party>,
    pub expiry: DateTime<Utc>,
}

impl AuctionState {
    /// A freshly listed auction with no bidder.
    #[must_use]
    pub fn new(item_id: UniqueId, price: Amount, seller: Party, expiry: DateTime<Utc>) -> Self {
        Self {
            id: UniqueId::new(),
            item_id,
            price,
            seller,
            bidder: None,
            expiry,
        }
    }

    /// Next version carrying a new highest bid.
    #[must_use]
    pub fn bid(&self, amount: Amount, bidder: Party) -> Self {
        Self {
            price: amount,
            bidder: Some(bidder),
            ..self.clone()
        }
    }

    /// Seller plus the current bidder, if any.
    #[must_use]
    pub fn participants(&self) -> Vec<Party> {
        let mut parties = vec![self.seller.clone()];
        parties.extend(self.bidder.clone());
        parties
    }

    #[must_use]
    pub fn participant_keys(&self) -> Vec<PartyKey> {
        self.participants().iter().map(Party::owning_key).collect()
    }

    #[must_use]
    pub fn has_bidder(&self) -> bool {
        self.bidder.is_some()
    }
}

// ---------------------------------------------------------------------------
// CashState
// ---------------------------------------------------------------------------

/// A fungible claim on `issuer` for `amount`, held by `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashState {
    pub amount: Amount,
    pub issuer: Party,
    pub owner: Party,
}

impl CashState {
    #[must_use]
    pub fn new(amount: Amount, issuer: Party, owner: Party) -> Self {
        Self {
            amount,
            issuer,
            owner,
        }
    }

    /// Same claim, new holder.
    #[must_use]
    pub fn with_owner(&self, owner: Party) -> Self {
        Self {
            owner,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerState
// ---------------------------------------------------------------------------

/// The contract that governs a state type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ContractKind {
    AuctionItem,
    Auction,
    Cash,
}

impl ContractKind {
    pub const ALL: [Self; 3] = [Self::AuctionItem, Self::Auction, Self::Cash];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::AuctionItem => "AuctionItemContract",
            Self::Auction => "AuctionContract",
            Self::Cash => "CashContract",
        }
    }
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed set of state types the ledger knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LedgerState {
    AuctionItem(AuctionItemState),
    Auction(AuctionState),
    Cash(CashState),
}

impl LedgerState {
    #[must_use]
    pub fn contract(&self) -> ContractKind {
        match self {
            Self::AuctionItem(_) => ContractKind::AuctionItem,
            Self::Auction(_) => ContractKind::Auction,
            Self::Cash(_) => ContractKind::Cash,
        }
    }

    /// Linear id for items and auctions; cash is fungible and has none.
    #[must_use]
    pub fn linear_id(&self) -> Option<UniqueId> {
        match self {
            Self::AuctionItem(item) => Some(item.id),
            Self::Auction(auction) => Some(auction.id),
            Self::Cash(_) => None,
        }
    }

    #[must_use]
    pub fn participants(&self) -> Vec<Party> {
        match self {
            Self::AuctionItem(item) => item.participants(),
            Self::Auction(auction) => auction.participants(),
            Self::Cash(cash) => vec![cash.owner.clone()],
        }
    }

    #[must_use]
    pub fn as_item(&self) -> Option<&AuctionItemState> {
        match self {
            Self::AuctionItem(item) => Some(item),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_auction(&self) -> Option<&AuctionState> {
        match self {
            Self::Auction(auction) => Some(auction),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_cash(&self) -> Option<&CashState> {
        match self {
            Self::Cash(cash) => Some(cash),
            _ => None,
        }
    }
}

impl From<AuctionItemState> for LedgerState {
    fn from(state: AuctionItemState) -> Self {
        Self::AuctionItem(state)
    }
}

impl From<AuctionState> for LedgerState {
    fn from(state: AuctionState) -> Self {
        Self::Auction(state)
    }
}

impl From<CashState> for LedgerState {
    fn from(state: CashState) -> Self {
        Self::Cash(state)
    }
}
