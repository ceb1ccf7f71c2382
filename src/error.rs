//! Error types for the piggybank e-cash protocol

use thiserror::Error;

use crate::types::CoinId;

/// Broad error categories callers branch on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Coin failed signature verification, carries the wrong issuer tag,
    /// or disclosed shares that do not open its commitments
    Authenticity,
    /// Structurally invalid input (lengths, encodings, mismatched coins)
    MalformedInput,
    /// Operation attempted out of order on a coin's signature lifecycle
    State,
    Configuration,
    Internal,
}

/// Main error type for e-cash operations
#[derive(Error, Debug)]
pub enum EcashError {
    // Authenticity errors
    #[error("Invalid coin signature")]
    InvalidSignature,

    #[error("Invalid issuer tag: {found} received, but {expected} expected")]
    IssuerMismatch { expected: String, found: String },

    #[error("Revealed share {index} does not match the coin's commitment")]
    ShareCommitmentMismatch { index: usize },

    // Malformed input errors
    #[error("Length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Malformed blinded digest: {0}")]
    MalformedDigest(String),

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    #[error("Malformed coin: {0}")]
    MalformedCoin(String),

    #[error("Disclosures reference different coins: {0} and {1}")]
    CoinMismatch(CoinId, CoinId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(u64),

    // Lifecycle errors
    #[error("Invalid coin state: {0}")]
    InvalidState(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

impl EcashError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EcashError::InvalidSignature
            | EcashError::IssuerMismatch { .. }
            | EcashError::ShareCommitmentMismatch { .. } => ErrorKind::Authenticity,
            EcashError::LengthMismatch { .. }
            | EcashError::MalformedDigest(_)
            | EcashError::MalformedSignature(_)
            | EcashError::MalformedCoin(_)
            | EcashError::CoinMismatch(..)
            | EcashError::InvalidAmount(_)
            | EcashError::HexDecode(_) => ErrorKind::MalformedInput,
            EcashError::InvalidState(_) => ErrorKind::State,
            EcashError::Configuration(_) | EcashError::Json(_) | EcashError::Io(_) => {
                ErrorKind::Configuration
            }
            EcashError::KeyGeneration(_) => ErrorKind::Internal,
        }
    }

    pub fn is_authenticity(&self) -> bool {
        self.kind() == ErrorKind::Authenticity
    }

    pub fn is_malformed_input(&self) -> bool {
        self.kind() == ErrorKind::MalformedInput
    }
}

/// Result type alias for e-cash operations
pub type EcashResult<T> = std::result::Result<T, EcashError>;
