//! Piggybank E-Cash - Double-Spend Detection Demo
//!
//! This binary walks through the coin lifecycle:
//! 1. Bank generates its key pair
//! 2. Payer withdraws a blind-signed coin
//! 3. Two merchants accept the same coin
//! 4. Bank processes both deposits and identifies the double-spender
//! 5. A merchant replays a deposit and is caught instead

use clap::Parser;
use piggybank_ecash::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "piggybank_demo")]
#[command(about = "Blind-signed e-cash with double-spend resolution", long_about = None)]
struct Cli {
    /// Payer withdrawing the coin
    #[arg(long, default_value = "alice")]
    payer: String,

    /// Coin face value
    #[arg(long, default_value_t = 20)]
    amount: u64,

    /// JSON protocol configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the issuer key size
    #[arg(long)]
    key_bits: Option<usize>,

    /// Override the number of share pairs per coin
    #[arg(long)]
    shares: Option<usize>,

    /// Flip independently for every share position
    #[arg(long)]
    per_position: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ProtocolConfig::load(path)?,
        None => ProtocolConfig::default(),
    };
    if let Some(bits) = cli.key_bits {
        config.key_bits = bits;
    }
    if let Some(shares) = cli.shares {
        config.share_count = shares;
    }
    if cli.per_position {
        config.disclosure_mode = DisclosureMode::PerPosition;
    }
    config.validate()?;

    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║   Piggybank E-Cash - Double-Spend Detection Demo             ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ========== Initialize Bank ==========
    println!("🔧 Generating {}-bit bank key...\n", config.key_bits);

    let mut rng = rand::thread_rng();
    let authority = Authority::generate(config.key_bits, &config.issuer_tag, &mut rng)?;
    let mut bank = Bank::new(authority, config.clone());
    bank.register_account(&cli.payer);
    let public = bank.public_params().clone();

    // ========== Withdrawal ==========
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📥 WITHDRAWAL: {} obtains a coin worth {}", cli.payer, cli.amount);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    let mut coin = Coin::build(&cli.payer, cli.amount, &public, config.share_count, &mut rng)?;
    let blind_signature = bank.issue_blind_signature(coin.blinded_digest())?;
    coin.attach_blind_signature(blind_signature, &public)?;
    coin.unblind(&public)?;

    println!("  1. Bank signed the blinded coin without seeing it");
    println!("  2. {} unblinded the signature", cli.payer);
    println!("  ✓ Coin {} verifies: {}", coin.id(), public.verify(coin.canonical_form().as_bytes(), coin.signature().ok_or(EcashError::InvalidSignature)?));
    println!();

    // ========== Double spend ==========
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("💸 SPENDING: {} spends the same coin at two merchants", cli.payer);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    let mut m1 = Merchant::with_thread_rng("merchant_1", public.clone(), config.disclosure_mode);
    let mut m2 = Merchant::with_thread_rng("merchant_2", public.clone(), config.disclosure_mode);
    let d1 = m1.accept(&coin)?;
    let d2 = m2.accept(&coin)?;
    describe("merchant_1", &d1);
    describe("merchant_2", &d2);
    println!();

    // ========== Deposits ==========
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🏦 == Double Spending Check ==");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    let first_slip = DepositSlip::new(m1.name(), &coin, d1)?;
    report(bank.deposit(first_slip.clone())?);
    report(bank.deposit(DepositSlip::new(m2.name(), &coin, d2)?)?);
    println!();

    // ========== Replay ==========
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🚫 == False Double Spending Check ==");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    report(bank.deposit(first_slip)?);
    println!();

    // ========== Final state ==========
    println!("📊 Bank state:");
    println!("  - Issued coins:    {}", bank.state.issued_coins_count);
    println!("  - Deposits seen:   {}", bank.state.deposited_coins_count);
    println!("  - merchant_1 paid: {}", bank.state.balance("merchant_1"));
    println!("  - merchant_2 paid: {}", bank.state.balance("merchant_2"));
    println!("  - Fraud reports:   {}", bank.fraud_log().len());

    Ok(())
}

fn describe(merchant: &str, disclosure: &Disclosure) {
    match disclosure.chosen_family() {
        Some(family) => println!("  {} accepted the coin and revealed the {} family", merchant, family),
        None => println!("  {} accepted the coin and revealed shares position by position", merchant),
    }
}

fn report(outcome: DepositOutcome) {
    match outcome {
        DepositOutcome::Credited { coin_id, amount } => {
            println!("  ✓ Coin {} credited ({})", &coin_id.to_hex()[..16], amount);
        }
        DepositOutcome::DoubleSpend(fraud) => match &fraud.verdict {
            Verdict::PayerFraud { identity, position } => {
                println!("  ✗ Double-spender identified at position {}: {}", position, identity);
                if let Some(payer) = &fraud.payer {
                    println!("    (registered account: {})", payer);
                }
            }
            Verdict::MerchantFraud => {
                println!("  ✗ The merchant attempted fraud ({})", fraud.second_merchant);
            }
        },
    }
}
