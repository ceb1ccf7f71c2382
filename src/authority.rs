//! Blind Signature Authority
//!
//! The issuer's key pair, created once and passed explicitly to every party that
//! signs or verifies. Public parameters are cloneable and read-only, so any number
//! of merchants can verify coins without contacting the issuer.

use rand::{CryptoRng, RngCore};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::blind_sig::{self, BlindSignature, BlindedDigest, Signature};
use crate::error::{EcashError, EcashResult};
use crate::types::validate_issuer_tag;

/// Issuer public key plus the tag its coins must carry
#[derive(Clone, Debug, PartialEq)]
pub struct PublicParams {
    key: RsaPublicKey,
    issuer_tag: String,
}

impl PublicParams {
    pub fn key(&self) -> &RsaPublicKey {
        &self.key
    }

    pub fn issuer_tag(&self) -> &str {
        &self.issuer_tag
    }

    /// Modulus size in bytes
    pub fn size(&self) -> usize {
        self.key.size()
    }

    /// True iff `signature` is a valid issuer signature over `message`
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        blind_sig::verify(message, signature, &self.key)
    }
}

/// Issuer key pair
pub struct Authority {
    private: RsaPrivateKey,
    public: PublicParams,
}

impl Authority {
    /// Generate a fresh key pair of `key_bits` bits
    pub fn generate<R: RngCore + CryptoRng>(
        key_bits: usize,
        issuer_tag: &str,
        rng: &mut R,
    ) -> EcashResult<Self> {
        validate_issuer_tag(issuer_tag)?;
        let private = RsaPrivateKey::new(rng, key_bits)
            .map_err(|e| EcashError::KeyGeneration(e.to_string()))?;
        let key = RsaPublicKey::from(&private);

        tracing::info!("Generated {}-bit issuer key for {}", key_bits, issuer_tag);

        Ok(Self {
            private,
            public: PublicParams {
                key,
                issuer_tag: issuer_tag.to_string(),
            },
        })
    }

    pub fn public_params(&self) -> &PublicParams {
        &self.public
    }

    /// Sign a blinded digest. The content is opaque to the issuer and is never logged.
    pub fn sign(&self, blinded: &BlindedDigest) -> EcashResult<BlindSignature> {
        tracing::debug!("Signing blinded digest ({} bytes)", blinded.0.len());
        blind_sig::sign_blinded(blinded, &self.private)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public.verify(message, signature)
    }

    #[cfg(test)]
    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}
