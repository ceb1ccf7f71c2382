//! Piggybank E-Cash Library
//!
//! This library implements anonymous blind-signed coins with double-spend
//! resolution. It supports:
//!
//! - Blind issuance of coins carrying identity-commitment shares
//! - Merchant acceptance revealing one share family per spend
//! - Bank-side reconciliation telling payer double-spends from merchant replays
//! - Recovery of a payer-identifying value when a payer double-spends
//!
//! ## Example
//!
//! ```rust,no_run
//! use piggybank_ecash::{issue_coin, resolve, Authority, DisclosureMode, Merchant, Verdict, BANK_STR};
//!
//! let mut rng = rand::thread_rng();
//! let bank = Authority::generate(2048, BANK_STR, &mut rng).unwrap();
//!
//! // Payer withdraws a coin worth 20
//! let coin = issue_coin("alice", 20, &bank, 20, &mut rng).unwrap();
//!
//! // Two merchants accept the same coin
//! let public = bank.public_params().clone();
//! let mut m1 = Merchant::with_thread_rng("m1", public.clone(), DisclosureMode::WholeFamily);
//! let mut m2 = Merchant::with_thread_rng("m2", public, DisclosureMode::WholeFamily);
//! let d1 = m1.accept(&coin).unwrap();
//! let d2 = m2.accept(&coin).unwrap();
//!
//! match resolve(&d1, &d2).unwrap() {
//!     Verdict::PayerFraud { identity, .. } => println!("double-spender: {}", identity),
//!     Verdict::MerchantFraud => println!("replayed deposit"),
//! }
//! ```

pub mod authority;
pub mod bank;
pub mod blind_sig;
pub mod coin;
pub mod config;
pub mod error;
pub mod merchant;
pub mod resolver;
pub mod types;
pub mod utils;

// Re-export key types
pub use types::{
    CoinId,
    Disclosure,
    Family,
    Selection,
    Share,
    Bytes32,
    BANK_STR,
    COIN_RIS_LENGTH,
    IDENT_STR,
};

pub use authority::{Authority, PublicParams};
pub use bank::{Bank, BankState, DepositOutcome, DepositSlip, FraudReport};
pub use blind_sig::{BlindSignature, BlindedDigest, Signature};
pub use coin::{issue_coin, Coin, ParsedCoin, SignatureState};
pub use config::ProtocolConfig;
pub use error::{EcashError, EcashResult, ErrorKind};
pub use merchant::{DisclosureMode, FamilyChooser, FixedFamily, Merchant, RandomFamily, ScriptedFamilies};
pub use resolver::{resolve, IdentityProof, Verdict};


#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::test_support::test_authority;
    use rand::{rngs::StdRng, SeedableRng};

    /// Full lifecycle: issue -> spend twice -> resolve
    #[test]
    fn test_double_spend_lifecycle() {
        // ========== Setup ==========
        let authority = test_authority();
        let public = authority.public_params().clone();
        let mut rng = StdRng::seed_from_u64(100);

        // ========== Phase 1: Issuance ==========
        println!("Phase 1: Issuance");
        let mut coin = Coin::build("P", 20, &public, COIN_RIS_LENGTH, &mut rng).unwrap();
        let blind_signature = authority.sign(coin.blinded_digest()).unwrap();
        coin.attach_blind_signature(blind_signature, &public).unwrap();
        coin.unblind(&public).unwrap();

        assert!(public.verify(coin.canonical_form().as_bytes(), coin.signature().unwrap()));
        println!("  ✓ Coin {} issued and unblinded", coin.id());

        // ========== Phase 2: Payer spends the same coin twice ==========
        println!("\nPhase 2: Double spend");
        let mut m1 = Merchant::new("M1", public.clone(), FixedFamily(Family::Left), DisclosureMode::WholeFamily);
        let mut m2 = Merchant::new("M2", public.clone(), FixedFamily(Family::Right), DisclosureMode::WholeFamily);

        let d1 = m1.accept(&coin).unwrap();
        let d2 = m2.accept(&coin).unwrap();
        assert_eq!(d1.chosen_family(), Some(Family::Left));
        assert_eq!(d2.chosen_family(), Some(Family::Right));

        // ========== Phase 3: Resolution ==========
        println!("\nPhase 3: Resolution");
        let verdict = resolve(&d1, &d2).unwrap();
        let identity = verdict.identity().unwrap();
        assert!(!identity.as_bytes().is_empty());
        assert!(identity.matches("P"));
        println!("  ✓ Double-spender identified: {}", identity);

        // Same verdict in either order
        assert_eq!(resolve(&d2, &d1).unwrap(), verdict);

        // ========== Phase 4: M2 also reveals left ==========
        println!("\nPhase 4: Replay");
        let mut m2_left = Merchant::new("M2", public.clone(), FixedFamily(Family::Left), DisclosureMode::WholeFamily);
        let d2_left = m2_left.accept(&coin).unwrap();
        assert_eq!(resolve(&d1, &d2_left).unwrap(), Verdict::MerchantFraud);
        assert_eq!(resolve(&d1, &d1).unwrap(), Verdict::MerchantFraud);
        println!("  ✓ Merchant fraud detected");

        // Signature still valid after all acceptances
        assert!(public.verify(coin.canonical_form().as_bytes(), coin.signature().unwrap()));
    }

    /// Seeded fair flips: outcome follows the families the merchants picked
    #[test]
    fn test_seeded_merchants_follow_their_flips() {
        let authority = test_authority();
        let public = authority.public_params().clone();
        let mut rng = StdRng::seed_from_u64(101);
        let coin = issue_coin("alice", 20, authority, 12, &mut rng).unwrap();

        for seed in 0..6u64 {
            let mut m1 = Merchant::new("M1", public.clone(), RandomFamily(StdRng::seed_from_u64(seed)), DisclosureMode::WholeFamily);
            let mut m2 = Merchant::new("M2", public.clone(), RandomFamily(StdRng::seed_from_u64(seed + 1000)), DisclosureMode::WholeFamily);
            let d1 = m1.accept(&coin).unwrap();
            let d2 = m2.accept(&coin).unwrap();

            let verdict = resolve(&d1, &d2).unwrap();
            if d1.chosen_family() == d2.chosen_family() {
                assert_eq!(verdict, Verdict::MerchantFraud);
            } else {
                assert!(verdict.identity().unwrap().matches("alice"));
            }
        }
    }

    /// Per-position disclosures: any differing position exposes the payer
    #[test]
    fn test_per_position_double_spend() {
        let authority = test_authority();
        let public = authority.public_params().clone();
        let mut rng = StdRng::seed_from_u64(102);
        let coin = issue_coin("bob", 10, authority, 6, &mut rng).unwrap();

        use Family::*;
        let mut m1 = Merchant::new("M1", public.clone(), ScriptedFamilies::new(vec![Left, Left, Right, Left, Right, Right]).unwrap(), DisclosureMode::PerPosition);
        let mut m2 = Merchant::new("M2", public.clone(), ScriptedFamilies::new(vec![Left, Left, Right, Right, Right, Left]).unwrap(), DisclosureMode::PerPosition);

        let d1 = m1.accept(&coin).unwrap();
        let d2 = m2.accept(&coin).unwrap();

        match resolve(&d1, &d2).unwrap() {
            Verdict::PayerFraud { position, identity } => {
                assert_eq!(position, 3);
                assert!(identity.matches("bob"));
            }
            Verdict::MerchantFraud => panic!("expected payer fraud"),
        }
    }

    /// Bank-side flow with deposit slips
    #[test]
    fn test_bank_deposit_flow() {
        let mut rng = StdRng::seed_from_u64(103);
        let config = ProtocolConfig {
            key_bits: 1024,
            share_count: 10,
            ..ProtocolConfig::default()
        };
        let authority = Authority::generate(config.key_bits, &config.issuer_tag, &mut rng).unwrap();
        let mut bank = Bank::new(authority, config);
        bank.register_account("alice");

        let public = bank.public_params().clone();
        let mut coin = Coin::build("alice", 20, &public, bank.config().share_count, &mut rng).unwrap();
        let blind_signature = bank.issue_blind_signature(coin.blinded_digest()).unwrap();
        coin.attach_blind_signature(blind_signature, &public).unwrap();
        coin.unblind(&public).unwrap();

        let mut m1 = Merchant::new("M1", public.clone(), FixedFamily(Family::Right), DisclosureMode::WholeFamily);
        let mut m2 = Merchant::new("M2", public.clone(), FixedFamily(Family::Left), DisclosureMode::WholeFamily);

        let first = bank.deposit(DepositSlip::new("M1", &coin, m1.accept(&coin).unwrap()).unwrap()).unwrap();
        assert!(matches!(first, DepositOutcome::Credited { amount: 20, .. }));

        let second = bank.deposit(DepositSlip::new("M2", &coin, m2.accept(&coin).unwrap()).unwrap()).unwrap();
        match second {
            DepositOutcome::DoubleSpend(report) => assert_eq!(report.culprit(), Some("alice")),
            other => panic!("expected double spend, got {:?}", other),
        }

        assert_eq!(bank.state.issued_coins_count, 1);
        assert_eq!(bank.state.deposited_coins_count, 2);
        assert_eq!(bank.state.balance("M1"), 20);
        assert_eq!(bank.state.balance("M2"), 0);
    }
}
