//! RSA blind signatures over a full-domain hash
//!
//! Flow:
//! 1. Payer hashes the coin's canonical form to an integer m < n
//! 2. Payer blinds it: m' = m * r^e mod n, keeps r^-1
//! 3. Issuer signs the blinded value: s' = m'^d mod n (never sees m)
//! 4. Payer unblinds: s = s' * r^-1 mod n, a plain RSA-FDH signature on m
//!
//! Anyone holding the public key checks s^e == FDH(message) mod n.

use num_bigint_dig::{BigInt, ModInverse, Sign};
use rand::{CryptoRng, RngCore};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{EcashError, EcashResult};

/// Domain separation prefix for the full-domain hash
const FDH_DOMAIN: &[u8] = b"piggybank-fdh-v1";

/// Blinded message digest handed to the issuer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedDigest(pub Vec<u8>);

/// Issuer's signature over a blinded digest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignature(pub Vec<u8>);

/// Unblinded signature, valid over the original message
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}..)", &hex[..hex.len().min(16)])
    }
}

/// Payer-held secret r^-1 mod n
pub struct BlindingFactor {
    r_inv: BigUint,
}

impl fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlindingFactor(..)")
    }
}

/// Expand SHA-256 in counter mode to the modulus size and reduce mod n
pub fn full_domain_hash(message: &[u8], key: &RsaPublicKey) -> BigUint {
    let size = key.size();
    let mut expanded = Vec::with_capacity(size + 32);
    let mut counter: u32 = 0;
    while expanded.len() < size {
        let mut hasher = Sha256::new();
        hasher.update(FDH_DOMAIN);
        hasher.update(counter.to_be_bytes());
        hasher.update(message);
        expanded.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    expanded.truncate(size);
    BigUint::from_bytes_be(&expanded) % key.n()
}

/// Blind `message` for signing under `key`
pub fn blind<R: RngCore + CryptoRng>(
    message: &[u8],
    key: &RsaPublicKey,
    rng: &mut R,
) -> (BlindedDigest, BlindingFactor) {
    let n = key.n();
    let size = key.size();
    let m = full_domain_hash(message, key);
    let one = BigUint::from(1u32);

    loop {
        let mut bytes = vec![0u8; size];
        rng.fill_bytes(&mut bytes);
        let r = BigUint::from_bytes_be(&bytes) % n;
        if r <= one {
            continue;
        }
        // Non-invertible r means gcd(r, n) > 1; draw again
        let r_inv = match mod_inverse(&r, n) {
            Some(inv) => inv,
            None => continue,
        };

        let r_e = r.modpow(key.e(), n);
        let blinded = (&m * &r_e) % n;
        return (
            BlindedDigest(to_fixed_bytes(&blinded, size)),
            BlindingFactor { r_inv },
        );
    }
}

/// Sign a blinded digest with the issuer's private key
pub fn sign_blinded(blinded: &BlindedDigest, key: &RsaPrivateKey) -> EcashResult<BlindSignature> {
    let size = key.size();
    if blinded.0.len() != size {
        return Err(EcashError::MalformedDigest(format!(
            "expected {} bytes, got {}",
            size,
            blinded.0.len()
        )));
    }

    let c = BigUint::from_bytes_be(&blinded.0);
    if &c >= key.n() {
        return Err(EcashError::MalformedDigest(
            "value exceeds modulus".to_string(),
        ));
    }

    let s = c.modpow(key.d(), key.n());
    Ok(BlindSignature(to_fixed_bytes(&s, size)))
}

/// Remove the blinding factor from an issuer signature
pub fn unblind(
    blind_signature: &BlindSignature,
    factor: &BlindingFactor,
    key: &RsaPublicKey,
) -> EcashResult<Signature> {
    let size = key.size();
    if blind_signature.0.len() != size {
        return Err(EcashError::MalformedSignature(format!(
            "expected {} bytes, got {}",
            size,
            blind_signature.0.len()
        )));
    }

    let s_blind = BigUint::from_bytes_be(&blind_signature.0);
    if &s_blind >= key.n() {
        return Err(EcashError::MalformedSignature(
            "value exceeds modulus".to_string(),
        ));
    }

    let s = (&s_blind * &factor.r_inv) % key.n();
    Ok(Signature(to_fixed_bytes(&s, size)))
}

/// Check `signature` over `message`. Never errors; malformed input is simply invalid.
pub fn verify(message: &[u8], signature: &Signature, key: &RsaPublicKey) -> bool {
    if signature.0.len() != key.size() {
        return false;
    }
    let s = BigUint::from_bytes_be(&signature.0);
    if &s >= key.n() {
        return false;
    }
    s.modpow(key.e(), key.n()) == full_domain_hash(message, key)
}

fn mod_inverse(r: &BigUint, n: &BigUint) -> Option<BigUint> {
    let inv = r.clone().mod_inverse(n)?;
    let inv = if inv.sign() == Sign::Minus {
        inv + BigInt::from_biguint(Sign::Plus, n.clone())
    } else {
        inv
    };
    inv.to_biguint()
}

/// Big-endian encoding left-padded to `size` bytes
fn to_fixed_bytes(value: &BigUint, size: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut out = vec![0u8; size.saturating_sub(bytes.len())];
    out.extend_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_authority;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_blind_sign_unblind_verify() {
        let authority = test_authority();
        let private = authority.private_key();
        let public = RsaPublicKey::from(private);
        let mut rng = StdRng::seed_from_u64(11);

        let message = b"ELECTRONIC_PIGGYBANK-20-00ff";
        let (blinded, factor) = blind(message, &public, &mut rng);
        assert_eq!(blinded.0.len(), public.size());

        let blind_sig = sign_blinded(&blinded, private).unwrap();
        let signature = unblind(&blind_sig, &factor, &public).unwrap();

        assert!(verify(message, &signature, &public));
        assert!(!verify(b"ELECTRONIC_PIGGYBANK-25-00ff", &signature, &public));
    }

    #[test]
    fn test_blinded_digest_hides_message() {
        let authority = test_authority();
        let public = RsaPublicKey::from(authority.private_key());
        let mut rng = StdRng::seed_from_u64(12);

        // Same message blinded twice gives unrelated values
        let (first, _) = blind(b"coin", &public, &mut rng);
        let (second, _) = blind(b"coin", &public, &mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_sign_rejects_wrong_length() {
        let authority = test_authority();
        let result = sign_blinded(&BlindedDigest(vec![1u8; 16]), authority.private_key());
        assert!(matches!(result, Err(EcashError::MalformedDigest(_))));
    }

    #[test]
    fn test_sign_rejects_value_above_modulus() {
        let authority = test_authority();
        let size = authority.private_key().size();
        let result = sign_blinded(&BlindedDigest(vec![0xFF; size]), authority.private_key());
        assert!(matches!(result, Err(EcashError::MalformedDigest(_))));
    }

    #[test]
    fn test_verify_rejects_malformed_signature() {
        let authority = test_authority();
        let public = RsaPublicKey::from(authority.private_key());

        assert!(!verify(b"coin", &Signature(vec![]), &public));
        assert!(!verify(b"coin", &Signature(vec![0xFF; public.size()]), &public));
        assert!(!verify(b"coin", &Signature(vec![0x01; public.size()]), &public));
    }
}
