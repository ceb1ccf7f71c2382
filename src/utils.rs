//! Commitment utilities: hashing and bitwise combination of shares

use sha2::{Digest, Sha256};

use crate::error::{EcashError, EcashResult};
use crate::types::{Bytes32, IDENT_STR, MARKER_LEN, SHARE_LEN};

/// SHA-256 of arbitrary bytes
pub fn hash(bytes: &[u8]) -> Bytes32 {
    let result = Sha256::digest(bytes);
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// XOR two equal-length byte strings
pub fn xor_bytes(a: &[u8], b: &[u8]) -> EcashResult<Vec<u8>> {
    if a.len() != b.len() {
        return Err(EcashError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(a.iter().zip(b).map(|(x, y)| x ^ y).collect())
}

/// Public marker: the first MARKER_LEN bytes of hash(IDENT_STR)
pub fn marker() -> [u8; MARKER_LEN] {
    let digest = hash(IDENT_STR.as_bytes());
    let mut marker = [0u8; MARKER_LEN];
    marker.copy_from_slice(&digest[..MARKER_LEN]);
    marker
}

/// Non-reversible payer identifier: hash("IDENT:" || payer)
pub fn identity_digest(payer: &str) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update(IDENT_STR.as_bytes());
    hasher.update(b":");
    hasher.update(payer.as_bytes());
    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// Record split across every share pair: marker || identity_digest(payer)
pub fn identity_record(payer: &str) -> Vec<u8> {
    let mut record = Vec::with_capacity(SHARE_LEN);
    record.extend_from_slice(&marker());
    record.extend_from_slice(&identity_digest(payer));
    record
}

/// Identifying remainder of `combined`, if it starts with the marker
pub fn strip_marker(combined: &[u8]) -> Option<&[u8]> {
    let marker = marker();
    if combined.len() > MARKER_LEN && combined.starts_with(&marker) {
        Some(&combined[MARKER_LEN..])
    } else {
        None
    }
}
