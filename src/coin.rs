//! Coin construction and the payer-side issuance flow
//!
//! A coin carries k pairs of identity-commitment shares. For every position the
//! left and right share XOR to `marker || identity_digest(payer)`, so revealing
//! one family says nothing about the payer, while the two families together give
//! the payer away. Only the Blake2b commitments of the shares enter the signed
//! canonical form; the shares stay with the payer until a merchant asks for them.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::authority::{Authority, PublicParams};
use crate::blind_sig::{self, BlindSignature, BlindedDigest, BlindingFactor, Signature};
use crate::error::{EcashError, EcashResult};
use crate::types::*;
use crate::utils;

/// Signature lifecycle: Unsigned -> BlindSigned -> Unblinded
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureState {
    Unsigned,
    BlindSigned(BlindSignature),
    Unblinded(Signature),
}

/// One issued token, as held by its payer
#[derive(Debug)]
pub struct Coin {
    amount: u64,
    id: CoinId,
    issuer_tag: String,
    left: Vec<Share>,
    right: Vec<Share>,
    canonical: String,
    blinded: BlindedDigest,
    blinding: Option<BlindingFactor>,
    signature: SignatureState,
}

impl Coin {
    /// Build a coin for `payer` worth `amount`, blinded for `issuer`
    pub fn build<R: RngCore + CryptoRng>(
        payer: &str,
        amount: u64,
        issuer: &PublicParams,
        share_count: usize,
        rng: &mut R,
    ) -> EcashResult<Self> {
        if amount == 0 {
            return Err(EcashError::InvalidAmount(amount));
        }
        if share_count == 0 {
            return Err(EcashError::Configuration(
                "share count must be at least 1".to_string(),
            ));
        }

        let id = CoinId::random(rng);
        let record = utils::identity_record(payer);

        // One-time pad per position: left is the pad, right is pad XOR record
        let mut left = Vec::with_capacity(share_count);
        let mut right = Vec::with_capacity(share_count);
        for _ in 0..share_count {
            let mut pad = vec![0u8; SHARE_LEN];
            rng.fill_bytes(&mut pad);
            let ciphertext = utils::xor_bytes(&pad, &record)?;
            left.push(Share(pad));
            right.push(Share(ciphertext));
        }

        let canonical = canonical_form(issuer.issuer_tag(), amount, &id, &left, &right);
        let (blinded, blinding) = blind_sig::blind(canonical.as_bytes(), issuer.key(), rng);

        tracing::debug!("Built coin {} worth {} with {} share pairs", id, amount, share_count);

        Ok(Self {
            amount,
            id,
            issuer_tag: issuer.issuer_tag().to_string(),
            left,
            right,
            canonical,
            blinded,
            blinding: Some(blinding),
            signature: SignatureState::Unsigned,
        })
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn id(&self) -> CoinId {
        self.id
    }

    pub fn issuer_tag(&self) -> &str {
        &self.issuer_tag
    }

    pub fn share_count(&self) -> usize {
        self.left.len()
    }

    /// Exactly the message the issuer signs
    pub fn canonical_form(&self) -> &str {
        &self.canonical
    }

    /// Blinded digest to hand to the issuer
    pub fn blinded_digest(&self) -> &BlindedDigest {
        &self.blinded
    }

    pub fn signature_state(&self) -> &SignatureState {
        &self.signature
    }

    /// Unblinded signature, once issuance is complete
    pub fn signature(&self) -> Option<&Signature> {
        match &self.signature {
            SignatureState::Unblinded(signature) => Some(signature),
            _ => None,
        }
    }

    pub fn shares(&self, family: Family) -> &[Share] {
        match family {
            Family::Left => &self.left,
            Family::Right => &self.right,
        }
    }

    /// Record the issuer's blind signature. A signature that does not unblind to a
    /// valid signature over the canonical form is rejected and the coin stays unsigned.
    pub fn attach_blind_signature(
        &mut self,
        blind_signature: BlindSignature,
        issuer: &PublicParams,
    ) -> EcashResult<()> {
        if self.signature != SignatureState::Unsigned {
            return Err(EcashError::InvalidState(format!(
                "coin {} already carries a signature",
                self.id
            )));
        }

        self.checked_unblind(&blind_signature, issuer)?;
        self.signature = SignatureState::BlindSigned(blind_signature);
        Ok(())
    }

    /// Replace the blind signature with one valid over the canonical form
    pub fn unblind(&mut self, issuer: &PublicParams) -> EcashResult<()> {
        let blind_signature = match &self.signature {
            SignatureState::BlindSigned(sig) => sig,
            SignatureState::Unsigned => {
                return Err(EcashError::InvalidState(format!(
                    "coin {} has not been signed",
                    self.id
                )))
            }
            SignatureState::Unblinded(_) => {
                return Err(EcashError::InvalidState(format!(
                    "coin {} is already unblinded",
                    self.id
                )))
            }
        };

        let signature = self.checked_unblind(blind_signature, issuer)?;
        self.signature = SignatureState::Unblinded(signature);
        self.blinding = None;
        Ok(())
    }

    fn checked_unblind(
        &self,
        blind_signature: &BlindSignature,
        issuer: &PublicParams,
    ) -> EcashResult<Signature> {
        let factor = self.blinding.as_ref().ok_or_else(|| {
            EcashError::InvalidState(format!("coin {} lost its blinding factor", self.id))
        })?;

        let signature = blind_sig::unblind(blind_signature, factor, issuer.key())?;
        if !issuer.verify(self.canonical.as_bytes(), &signature) {
            tracing::warn!("Blind signature for coin {} does not verify", self.id);
            return Err(EcashError::InvalidSignature);
        }
        Ok(signature)
    }

    /// Shares for a merchant's selection
    pub fn reveal(&self, selection: &Selection) -> EcashResult<Vec<Share>> {
        match selection {
            Selection::Whole(family) => Ok(self.shares(*family).to_vec()),
            Selection::PerPosition(families) => {
                if families.len() != self.share_count() {
                    return Err(EcashError::LengthMismatch {
                        left: families.len(),
                        right: self.share_count(),
                    });
                }
                Ok(families
                    .iter()
                    .enumerate()
                    .map(|(i, family)| self.shares(*family)[i].clone())
                    .collect())
            }
        }
    }
}

/// Run the payer-side issuance flow: build, obtain blind signature, unblind
pub fn issue_coin<R: RngCore + CryptoRng>(
    payer: &str,
    amount: u64,
    authority: &Authority,
    share_count: usize,
    rng: &mut R,
) -> EcashResult<Coin> {
    let issuer = authority.public_params();
    let mut coin = Coin::build(payer, amount, issuer, share_count, rng)?;
    let blind_signature = authority.sign(coin.blinded_digest())?;
    coin.attach_blind_signature(blind_signature, issuer)?;
    coin.unblind(issuer)?;

    tracing::info!("Issued coin {} worth {}", coin.id(), amount);
    Ok(coin)
}

fn canonical_form(
    issuer_tag: &str,
    amount: u64,
    id: &CoinId,
    left: &[Share],
    right: &[Share],
) -> String {
    let encode = |shares: &[Share]| {
        shares
            .iter()
            .map(|share| hex::encode(share.commitment()))
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "{}-{}-{}-{}-{}",
        issuer_tag,
        amount,
        id.to_hex(),
        encode(left),
        encode(right)
    )
}

/// Decoded canonical form, as seen by merchants and the bank
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCoin {
    pub issuer_tag: String,
    pub amount: u64,
    pub id: CoinId,
    pub left_commitments: Vec<Bytes32>,
    pub right_commitments: Vec<Bytes32>,
}

impl ParsedCoin {
    pub fn parse(s: &str) -> EcashResult<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 5 {
            return Err(EcashError::MalformedCoin(format!(
                "expected 5 fields, found {}",
                parts.len()
            )));
        }

        let amount = parts[1]
            .parse::<u64>()
            .map_err(|e| EcashError::MalformedCoin(format!("amount: {}", e)))?;
        let id = CoinId::from_hex(parts[2])?;
        let left_commitments = parse_commitments(parts[3])?;
        let right_commitments = parse_commitments(parts[4])?;

        if left_commitments.len() != right_commitments.len() {
            return Err(EcashError::LengthMismatch {
                left: left_commitments.len(),
                right: right_commitments.len(),
            });
        }

        Ok(Self {
            issuer_tag: parts[0].to_string(),
            amount,
            id,
            left_commitments,
            right_commitments,
        })
    }

    /// Parse and require the expected issuer tag
    pub fn parse_for_issuer(s: &str, expected_tag: &str) -> EcashResult<Self> {
        let parsed = Self::parse(s)?;
        if parsed.issuer_tag != expected_tag {
            return Err(EcashError::IssuerMismatch {
                expected: expected_tag.to_string(),
                found: parsed.issuer_tag,
            });
        }
        Ok(parsed)
    }

    pub fn share_count(&self) -> usize {
        self.left_commitments.len()
    }

    /// Check revealed shares open the committed hashes for `selection`
    pub fn check_revealed(&self, selection: &Selection, shares: &[Share]) -> EcashResult<()> {
        if shares.len() != self.share_count() {
            return Err(EcashError::LengthMismatch {
                left: shares.len(),
                right: self.share_count(),
            });
        }

        for (index, share) in shares.iter().enumerate() {
            let family = selection.family_at(index).ok_or(EcashError::LengthMismatch {
                left: index,
                right: self.share_count(),
            })?;
            let expected = match family {
                Family::Left => &self.left_commitments[index],
                Family::Right => &self.right_commitments[index],
            };
            if &share.commitment() != expected {
                return Err(EcashError::ShareCommitmentMismatch { index });
            }
        }
        Ok(())
    }
}

fn parse_commitments(field: &str) -> EcashResult<Vec<Bytes32>> {
    field
        .split(',')
        .map(|part| -> EcashResult<Bytes32> {
            let mut commitment = [0u8; 32];
            hex::decode_to_slice(part, &mut commitment)?;
            Ok(commitment)
        })
        .collect()
}
