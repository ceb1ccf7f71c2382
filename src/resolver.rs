//! Double-Spend Resolver
//!
//! Given two disclosures for the same coin, decide who cheated. If at some
//! position the two revealed shares come from opposite families, their XOR is
//! the payer's identity record and starts with the public marker: the payer
//! spent the coin twice. If no position yields the marker, both disclosures
//! opened the same family everywhere, which is what a replayed deposit looks like.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EcashError, EcashResult};
use crate::types::Disclosure;
use crate::utils;

/// Identifying value recovered from a double-spent coin
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityProof(pub Vec<u8>);

impl IdentityProof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// True if this proof identifies `payer`
    pub fn matches(&self, payer: &str) -> bool {
        self.0 == utils::identity_digest(payer)
    }
}

impl fmt::Display for IdentityProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for IdentityProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityProof({})", self.to_hex())
    }
}

/// Outcome of reconciling two disclosures
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Opposite families met at `position`; the payer double-spent
    PayerFraud {
        position: usize,
        identity: IdentityProof,
    },
    /// Same family everywhere; the deposit record was replayed
    MerchantFraud,
}

impl Verdict {
    pub fn is_payer_fraud(&self) -> bool {
        matches!(self, Verdict::PayerFraud { .. })
    }

    pub fn identity(&self) -> Option<&IdentityProof> {
        match self {
            Verdict::PayerFraud { identity, .. } => Some(identity),
            Verdict::MerchantFraud => None,
        }
    }
}

/// Reconcile two disclosures of the same coin
pub fn resolve(first: &Disclosure, second: &Disclosure) -> EcashResult<Verdict> {
    if first.coin_id != second.coin_id {
        return Err(EcashError::CoinMismatch(first.coin_id, second.coin_id));
    }
    if first.len() != second.len() {
        return Err(EcashError::LengthMismatch {
            left: first.len(),
            right: second.len(),
        });
    }
    if first.is_empty() {
        return Err(EcashError::MalformedCoin(
            "disclosure carries no shares".to_string(),
        ));
    }

    for (position, (a, b)) in first
        .revealed_shares
        .iter()
        .zip(&second.revealed_shares)
        .enumerate()
    {
        let combined = utils::xor_bytes(a.as_bytes(), b.as_bytes())?;
        if let Some(remainder) = utils::strip_marker(&combined) {
            let identity = IdentityProof(remainder.to_vec());
            tracing::warn!(
                "Double-spender identified on coin {} at position {}: {}",
                first.coin_id,
                position,
                identity
            );
            return Ok(Verdict::PayerFraud { position, identity });
        }
    }

    tracing::warn!("Coin {}: the merchant attempted fraud", first.coin_id);
    Ok(Verdict::MerchantFraud)
}
