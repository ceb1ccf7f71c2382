//! Merchant acceptance
//!
//! A merchant checks that a coin was minted by the expected issuer, then asks the
//! payer to open one family of shares. The family choice comes from an injected
//! `FamilyChooser`, so production code flips fairly while tests can force it.
//! Merchants keep no record of coins they have seen.

use rand::rngs::ThreadRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::authority::PublicParams;
use crate::coin::{Coin, ParsedCoin};
use crate::error::{EcashError, EcashResult};
use crate::types::{Disclosure, Family, Selection};

/// Source of left/right choices
pub trait FamilyChooser {
    fn choose(&mut self) -> Family;
}

/// Fair coin flip from any rng
pub struct RandomFamily<R>(pub R);

impl<R: RngCore> FamilyChooser for RandomFamily<R> {
    fn choose(&mut self) -> Family {
        if self.0.gen::<bool>() {
            Family::Left
        } else {
            Family::Right
        }
    }
}

/// Always the same family
pub struct FixedFamily(pub Family);

impl FamilyChooser for FixedFamily {
    fn choose(&mut self) -> Family {
        self.0
    }
}

/// Replays a fixed sequence, cycling when it runs out
pub struct ScriptedFamilies {
    script: Vec<Family>,
    next: usize,
}

impl ScriptedFamilies {
    /// The script must hold at least one family
    pub fn new(script: Vec<Family>) -> EcashResult<Self> {
        if script.is_empty() {
            return Err(EcashError::Configuration(
                "family script must not be empty".to_string(),
            ));
        }
        Ok(Self { script, next: 0 })
    }
}

impl FamilyChooser for ScriptedFamilies {
    fn choose(&mut self) -> Family {
        let family = self.script[self.next];
        self.next = (self.next + 1) % self.script.len();
        family
    }
}

/// How many flips an acceptance uses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureMode {
    /// One flip selects the family for every position
    #[default]
    WholeFamily,
    /// Independent flip per position
    PerPosition,
}

/// Accepting party
pub struct Merchant<C> {
    name: String,
    issuer: PublicParams,
    chooser: C,
    mode: DisclosureMode,
}

impl Merchant<RandomFamily<ThreadRng>> {
    /// Merchant flipping with the thread-local rng
    pub fn with_thread_rng(name: &str, issuer: PublicParams, mode: DisclosureMode) -> Self {
        Self::new(name, issuer, RandomFamily(rand::thread_rng()), mode)
    }
}

impl<C: FamilyChooser> Merchant<C> {
    pub fn new(name: &str, issuer: PublicParams, chooser: C, mode: DisclosureMode) -> Self {
        Self {
            name: name.to_string(),
            issuer,
            chooser,
            mode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> DisclosureMode {
        self.mode
    }

    /// Verify `coin` and disclose one family of its shares
    pub fn accept(&mut self, coin: &Coin) -> EcashResult<Disclosure> {
        let parsed = match self.authenticate(coin) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("{} rejected coin {}: {}", self.name, coin.id(), e);
                return Err(e);
            }
        };

        let selection = match self.mode {
            DisclosureMode::WholeFamily => Selection::Whole(self.chooser.choose()),
            DisclosureMode::PerPosition => Selection::PerPosition(
                (0..parsed.share_count()).map(|_| self.chooser.choose()).collect(),
            ),
        };

        let revealed_shares = coin.reveal(&selection)?;
        if let Err(e) = parsed.check_revealed(&selection, &revealed_shares) {
            tracing::warn!("{} rejected coin {}: {}", self.name, coin.id(), e);
            return Err(e);
        }

        match &selection {
            Selection::Whole(family) => {
                tracing::info!("{} accepted coin {} ({} family)", self.name, coin.id(), family)
            }
            Selection::PerPosition(_) => {
                tracing::info!("{} accepted coin {} (per-position)", self.name, coin.id())
            }
        }

        Ok(Disclosure::new(parsed.id, selection, revealed_shares))
    }

    fn authenticate(&self, coin: &Coin) -> EcashResult<ParsedCoin> {
        let parsed = ParsedCoin::parse_for_issuer(coin.canonical_form(), self.issuer.issuer_tag())?;
        let signature = coin.signature().ok_or(EcashError::InvalidSignature)?;
        if !self.issuer.verify(coin.canonical_form().as_bytes(), signature) {
            return Err(EcashError::InvalidSignature);
        }
        Ok(parsed)
    }
}
