//! Protocol configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EcashError, EcashResult};
use crate::merchant::DisclosureMode;
use crate::types::{validate_issuer_tag, BANK_STR, COIN_RIS_LENGTH};

/// Smallest issuer modulus accepted by `validate`
pub const MIN_KEY_BITS: usize = 1024;

/// Protocol-wide parameters shared by issuer, payers and merchants
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Tag every coin of this issuer carries
    pub issuer_tag: String,
    /// Share pairs per coin (k)
    pub share_count: usize,
    /// Issuer RSA modulus size
    pub key_bits: usize,
    pub disclosure_mode: DisclosureMode,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            issuer_tag: BANK_STR.to_string(),
            share_count: COIN_RIS_LENGTH,
            key_bits: 2048,
            disclosure_mode: DisclosureMode::WholeFamily,
        }
    }
}

impl ProtocolConfig {
    pub fn from_json_str(s: &str) -> EcashResult<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> EcashResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> EcashResult<()> {
        validate_issuer_tag(&self.issuer_tag)?;
        if self.share_count == 0 {
            return Err(EcashError::Configuration(
                "share_count must be at least 1".to_string(),
            ));
        }
        if self.key_bits < MIN_KEY_BITS {
            return Err(EcashError::Configuration(format!(
                "key_bits must be at least {}, got {}",
                MIN_KEY_BITS, self.key_bits
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.issuer_tag, "ELECTRONIC_PIGGYBANK");
        assert_eq!(config.share_count, 20);
        assert_eq!(config.disclosure_mode, DisclosureMode::WholeFamily);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            ProtocolConfig::from_json_str(r#"{"share_count": 32, "disclosure_mode": "per_position"}"#)
                .unwrap();
        assert_eq!(config.share_count, 32);
        assert_eq!(config.disclosure_mode, DisclosureMode::PerPosition);
        assert_eq!(config.key_bits, 2048);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        assert!(ProtocolConfig::from_json_str(r#"{"share_count": 0}"#).is_err());
        assert!(ProtocolConfig::from_json_str(r#"{"key_bits": 512}"#).is_err());
        assert!(ProtocolConfig::from_json_str(r#"{"issuer_tag": "BAD-TAG"}"#).is_err());
        assert!(ProtocolConfig::from_json_str(r#"{"issuer_tag": ""}"#).is_err());

        let err = ProtocolConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, EcashError::Json(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProtocolConfig::load("/nonexistent/piggybank.json").unwrap_err();
        assert!(matches!(err, EcashError::Io(_)));
    }
}
