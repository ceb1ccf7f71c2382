//! Piggybank E-Cash - Types and Core Structures
//!
//! This module defines the data model shared by payers, merchants and the bank:
//! - CoinId: Globally unique coin identifier
//! - Family / Share: The two parallel identity-commitment share families
//! - Selection: Which family (or families per position) a merchant revealed
//! - Disclosure: The half of a coin revealed at one acceptance event

use crate::error::{EcashError, EcashResult};
use serde::{Deserialize, Serialize};
use blake2::{Blake2b, Digest, digest::consts::U32};
use rand::RngCore;
use std::fmt;

pub type Blake2b256 = Blake2b<U32>;

/// 32-byte array for identifiers and commitments
pub type Bytes32 = [u8; 32];

/// Tag identifying coins minted by this issuer format
pub const BANK_STR: &str = "ELECTRONIC_PIGGYBANK";

/// Public marker string; its hash prefix tags a reconstructed identity record
pub const IDENT_STR: &str = "IDENT";

/// Default number of share pairs per coin (k)
pub const COIN_RIS_LENGTH: usize = 20;

/// Bytes of `hash(IDENT_STR)` used as the marker prefix
pub const MARKER_LEN: usize = 5;

/// Length of every share: marker prefix followed by a 32-byte identity digest
pub const SHARE_LEN: usize = MARKER_LEN + 32;

/// Reject issuer tags the canonical form cannot carry: it splits on '-' and ','
pub fn validate_issuer_tag(tag: &str) -> EcashResult<()> {
    if tag.is_empty() || tag.contains(['-', ',']) {
        return Err(EcashError::Configuration(format!(
            "invalid issuer tag: {:?}",
            tag
        )));
    }
    Ok(())
}

/// Unique coin identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinId(pub Bytes32);

impl CoinId {
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut id = [0u8; 32];
        rng.fill_bytes(&mut id);
        Self(id)
    }

    pub fn as_bytes(&self) -> &Bytes32 {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut id = [0u8; 32];
        hex::decode_to_slice(s, &mut id)?;
        Ok(Self(id))
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoinId({})", &self.to_hex()[..16])
    }
}

/// One of the two parallel share families
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Left,
    Right,
}

impl Family {
    pub fn opposite(self) -> Self {
        match self {
            Family::Left => Family::Right,
            Family::Right => Family::Left,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Left => write!(f, "left"),
            Family::Right => write!(f, "right"),
        }
    }
}

/// Opaque identity-commitment share
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share(pub Vec<u8>);

impl Share {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compute share commitment: blake2b256(share)
    pub fn commitment(&self) -> Bytes32 {
        let result = Blake2b256::digest(&self.0);
        let mut commitment = [0u8; 32];
        commitment.copy_from_slice(&result);
        commitment
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shares are identity material; only the commitment is printed
        write!(f, "Share({})", &hex::encode(self.commitment())[..12])
    }
}

/// Which family a merchant revealed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// One flip governs all k positions
    Whole(Family),
    /// Independent flip per position
    PerPosition(Vec<Family>),
}

impl Selection {
    /// Family revealed at `index`, or None if a per-position selection is too short
    pub fn family_at(&self, index: usize) -> Option<Family> {
        match self {
            Selection::Whole(family) => Some(*family),
            Selection::PerPosition(families) => families.get(index).copied(),
        }
    }
}

/// Half of a coin's shares revealed at one acceptance event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub coin_id: CoinId,
    pub selection: Selection,
    pub revealed_shares: Vec<Share>,
}

impl Disclosure {
    pub fn new(coin_id: CoinId, selection: Selection, revealed_shares: Vec<Share>) -> Self {
        Self {
            coin_id,
            selection,
            revealed_shares,
        }
    }

    /// The revealed family, for whole-family disclosures
    pub fn chosen_family(&self) -> Option<Family> {
        match &self.selection {
            Selection::Whole(family) => Some(*family),
            Selection::PerPosition(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.revealed_shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revealed_shares.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_coin_id_hex_roundtrip() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = CoinId::random(&mut rng);
        let parsed = CoinId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);

        // Fresh ids differ
        assert_ne!(id, CoinId::random(&mut rng));

        // Wrong length is rejected
        assert!(CoinId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_share_commitment() {
        let share = Share(vec![7u8; SHARE_LEN]);

        // Commitment should be deterministic
        assert_eq!(share.commitment(), share.commitment());

        // Different share -> different commitment
        let other = Share(vec![8u8; SHARE_LEN]);
        assert_ne!(share.commitment(), other.commitment());
    }

    #[test]
    fn test_selection_family_at() {
        let whole = Selection::Whole(Family::Right);
        assert_eq!(whole.family_at(0), Some(Family::Right));
        assert_eq!(whole.family_at(99), Some(Family::Right));

        let mixed = Selection::PerPosition(vec![Family::Left, Family::Right]);
        assert_eq!(mixed.family_at(1), Some(Family::Right));
        assert_eq!(mixed.family_at(2), None);
        assert_eq!(Family::Left.opposite(), Family::Right);
    }

    #[test]
    fn test_issuer_tag_validation() {
        assert!(validate_issuer_tag(BANK_STR).is_ok());
        assert!(validate_issuer_tag("MY_BANK").is_ok());

        for tag in ["", "MY-BANK", "A,B"] {
            assert!(matches!(
                validate_issuer_tag(tag),
                Err(EcashError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_share_debug_hides_bytes() {
        let share = Share(vec![0xAB; SHARE_LEN]);
        let printed = format!("{:?}", share);
        assert!(!printed.contains("abab"));
    }
}
