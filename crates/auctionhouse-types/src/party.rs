//! Parties and signing identities.
//!
//! A [`Party`] is the public face of a ledger participant: a display name
//! plus the raw ed25519 verifying key. Two parties are equal iff their keys
//! are equal; the name is informational only.
//!
//! An [`Identity`] pairs a party with its signing key and is held only by
//! the node acting as that party.

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{AuctionError, Result, TxId};

// ---------------------------------------------------------------------------
// PartyKey
// ---------------------------------------------------------------------------

/// Raw ed25519 public key (32 bytes) identifying a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PartyKey(pub [u8; 32]);

impl PartyKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Verify an ed25519 signature by this key over `txid`.
    ///
    /// # Errors
    /// [`AuctionError::InvalidSignature`] if the key or the signature is malformed,
    /// or the signature does not verify.
    pub fn verify(&self, txid: &TxId, signature: &[u8]) -> Result<()> {
        let key = VerifyingKey::from_bytes(&self.0).map_err(|_| AuctionError::InvalidSignature(*self))?;
        let sig = Signature::from_slice(signature).map_err(|_| AuctionError::InvalidSignature(*self))?;
        key.verify(txid.as_bytes(), &sig)
            .map_err(|_| AuctionError::InvalidSignature(*self))
    }
}

impl fmt::Display for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Party
// ---------------------------------------------------------------------------

/// A ledger participant, compared by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub key: PartyKey,
}

impl Party {
    #[must_use]
    pub fn new(name: impl Into<String>, key: PartyKey) -> Self {
        Self {
            name: name.into(),
            key,
        }
    }

    #[must_use]
    pub fn owning_key(&self) -> PartyKey {
        self.key
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Party {}

impl Hash for Party {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key.short())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A party together with its private signing key.
pub struct Identity {
    party: Party,
    signing_key: SigningKey,
}

impl Identity {
    #[must_use]
    pub fn new(name: impl Into<String>, signing_key: SigningKey) -> Self {
        let key = PartyKey(signing_key.verifying_key().to_bytes());
        Self {
            party: Party::new(name, key),
            signing_key,
        }
    }

    /// Deterministic identity from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(name: impl Into<String>, seed: [u8; 32]) -> Self {
        Self::new(name, SigningKey::from_bytes(&seed))
    }

    #[must_use]
    pub fn party(&self) -> &Party {
        &self.party
    }

    #[must_use]
    pub fn key(&self) -> PartyKey {
        self.party.key
    }

    /// Sign a transaction id.
    #[must_use]
    pub fn sign(&self, txid: &TxId) -> crate::TransactionSignature {
        let sig = self.signing_key.sign(txid.as_bytes());
        crate::TransactionSignature {
            by: self.key(),
            bytes: sig.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("party", &self.party)
            .finish_non_exhaustive()
    }
}

/// Random identities for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Identity {
    pub fn random(name: &str) -> Self {
        Self::new(name, SigningKey::generate(&mut rand::rngs::OsRng))
    }
}
