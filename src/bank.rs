//! Bank Implementation for Piggybank E-Cash
//!
//! This module implements the issuer's back office:
//! - Blind-signing coins for registered payers
//! - Checking deposited coins and the shares merchants disclosed
//! - Detecting a second deposit of the same coin and resolving it
//! - Keeping merchant balances and a fraud log

use crate::authority::{Authority, PublicParams};
use crate::blind_sig::{BlindSignature, BlindedDigest, Signature};
use crate::coin::{Coin, ParsedCoin};
use crate::config::ProtocolConfig;
use crate::error::{EcashError, EcashResult};
use crate::resolver::{self, Verdict};
use crate::types::*;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a merchant hands the bank to get paid
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositSlip {
    pub merchant: String,
    pub canonical_form: String,
    pub signature: Signature,
    pub disclosure: Disclosure,
}

impl DepositSlip {
    pub fn new(merchant: &str, coin: &Coin, disclosure: Disclosure) -> EcashResult<Self> {
        let signature = coin.signature().cloned().ok_or(EcashError::InvalidSignature)?;
        Ok(Self {
            merchant: merchant.to_string(),
            canonical_form: coin.canonical_form().to_string(),
            signature,
            disclosure,
        })
    }
}

/// Result of a double deposit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudReport {
    pub coin_id: CoinId,
    pub verdict: Verdict,
    pub first_merchant: String,
    pub second_merchant: String,
    /// Registered payer matching the recovered identity, if any
    pub payer: Option<String>,
}

impl FraudReport {
    /// Party to punish: the payer on PayerFraud, the later depositor otherwise
    pub fn culprit(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::PayerFraud { .. } => self.payer.as_deref(),
            Verdict::MerchantFraud => Some(&self.second_merchant),
        }
    }
}

/// Deposit processing outcome
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepositOutcome {
    /// First deposit of this coin; the merchant was paid
    Credited { coin_id: CoinId, amount: u64 },
    /// Coin already deposited; nothing credited
    DoubleSpend(FraudReport),
}

/// Counters and balances
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BankState {
    pub issued_coins_count: u64,
    pub deposited_coins_count: u64,
    pub merchant_balances: HashMap<String, u64>,
}

impl BankState {
    pub fn balance(&self, merchant: &str) -> u64 {
        self.merchant_balances.get(merchant).copied().unwrap_or(0)
    }
}

struct DepositRecord {
    merchant: String,
    disclosure: Disclosure,
}

/// Issuer and deposit processor
pub struct Bank {
    authority: Authority,
    config: ProtocolConfig,

    /// Bank state (counters, balances)
    pub state: BankState,

    /// identity_digest(payer) -> payer name
    accounts: HashMap<Bytes32, String>,

    /// First deposit seen for each coin
    deposits: HashMap<CoinId, DepositRecord>,

    fraud_log: Vec<FraudReport>,
}

impl Bank {
    pub fn new(authority: Authority, config: ProtocolConfig) -> Self {
        Self {
            authority,
            config,
            state: BankState::default(),
            accounts: HashMap::new(),
            deposits: HashMap::new(),
            fraud_log: Vec::new(),
        }
    }

    pub fn public_params(&self) -> &PublicParams {
        self.authority.public_params()
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Open an account so a later double-spend can be attributed by name
    pub fn register_account(&mut self, payer: &str) {
        self.accounts
            .insert(utils::identity_digest(payer), payer.to_string());
        tracing::info!("Registered account {}", payer);
    }

    /// Blind-sign a coin digest
    pub fn issue_blind_signature(&mut self, blinded: &BlindedDigest) -> EcashResult<BlindSignature> {
        let signature = self.authority.sign(blinded)?;
        self.state.issued_coins_count += 1;
        Ok(signature)
    }

    /// Process a merchant deposit
    pub fn deposit(&mut self, slip: DepositSlip) -> EcashResult<DepositOutcome> {
        let parsed = self.check_slip(&slip)?;
        self.state.deposited_coins_count += 1;

        if let Some(previous) = self.deposits.get(&parsed.id) {
            let verdict = resolver::resolve(&previous.disclosure, &slip.disclosure)?;
            let payer = verdict
                .identity()
                .and_then(|identity| self.lookup_payer(identity.as_bytes()));

            let report = FraudReport {
                coin_id: parsed.id,
                verdict,
                first_merchant: previous.merchant.clone(),
                second_merchant: slip.merchant,
                payer,
            };
            match report.culprit() {
                Some(culprit) => tracing::warn!("Cheater {} punished for coin {}", culprit, parsed.id),
                None => tracing::warn!("Coin {} double-spent by an unregistered payer", parsed.id),
            }

            self.fraud_log.push(report.clone());
            return Ok(DepositOutcome::DoubleSpend(report));
        }

        *self
            .state
            .merchant_balances
            .entry(slip.merchant.clone())
            .or_insert(0) += parsed.amount;
        tracing::info!("Credited {} with {} for coin {}", slip.merchant, parsed.amount, parsed.id);

        self.deposits.insert(
            parsed.id,
            DepositRecord {
                merchant: slip.merchant,
                disclosure: slip.disclosure,
            },
        );

        Ok(DepositOutcome::Credited {
            coin_id: parsed.id,
            amount: parsed.amount,
        })
    }

    pub fn is_deposited(&self, coin_id: &CoinId) -> bool {
        self.deposits.contains_key(coin_id)
    }

    pub fn fraud_log(&self) -> &[FraudReport] {
        &self.fraud_log
    }

    fn lookup_payer(&self, identity: &[u8]) -> Option<String> {
        let digest: Bytes32 = identity.try_into().ok()?;
        self.accounts.get(&digest).cloned()
    }

    fn check_slip(&self, slip: &DepositSlip) -> EcashResult<ParsedCoin> {
        let public = self.authority.public_params();
        let parsed = ParsedCoin::parse_for_issuer(&slip.canonical_form, public.issuer_tag())?;

        if !public.verify(slip.canonical_form.as_bytes(), &slip.signature) {
            tracing::warn!("Rejected deposit from {}: invalid signature", slip.merchant);
            return Err(EcashError::InvalidSignature);
        }
        if slip.disclosure.coin_id != parsed.id {
            return Err(EcashError::CoinMismatch(parsed.id, slip.disclosure.coin_id));
        }
        parsed.check_revealed(&slip.disclosure.selection, &slip.disclosure.revealed_shares)?;

        Ok(parsed)
    }
}
