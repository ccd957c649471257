//! Shared fixtures for scenario and adversarial tests.

use std::sync::Arc;

use stax_core::config::IssuerConfig;
use stax_core::types::{AccountId, AssetId};
use stax_issuer::Issuer;
use stax_issuer::memory::{ManualClock, MemoryCustody, MemoryIssuance};

pub const AUTHORITY: AccountId = AccountId::from_seed(0x01);
pub const REWARD: AssetId = AssetId::from_seed(0xee);

/// Deposit asset for the `index`-th pool.
pub fn lp(index: u8) -> AssetId {
    AssetId::from_seed(0x10 + index)
}

/// Participant account from a seed byte.
pub fn account(seed: u8) -> AccountId {
    AccountId::from_seed(seed)
}

/// Issuer plus handles to its collaborators.
pub struct World {
    pub clock: Arc<ManualClock>,
    pub custody: Arc<MemoryCustody>,
    pub issuance: Arc<MemoryIssuance>,
    pub issuer: Issuer,
}

impl World {
    /// Build a world with the clock at height 0.
    pub fn new(config: IssuerConfig) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let custody = Arc::new(MemoryCustody::new());
        let issuance = Arc::new(MemoryIssuance::new());
        let issuer = Issuer::new(config, clock.clone(), custody.clone(), issuance.clone())
            .expect("valid test config");
        Self { clock, custody, issuance, issuer }
    }

    /// Register pools with the given weights; pool `i` takes deposits in `lp(i)`.
    pub fn with_pools(config: IssuerConfig, weights: &[u64]) -> Self {
        let world = Self::new(config);
        for (i, w) in weights.iter().enumerate() {
            world
                .issuer
                .register(&AUTHORITY, *w, lp(i as u8))
                .expect("register pool");
        }
        world
    }

    /// Fund `who` with `amount` of every registered pool's deposit asset.
    pub fn fund(&self, who: AccountId, amount: u64) {
        for i in 0..self.issuer.pool_count() {
            self.custody.fund(lp(i as u8), who, amount);
        }
    }

    pub fn rewards_of(&self, who: &AccountId) -> u128 {
        self.issuance.balance_of(&REWARD, who)
    }
}

/// The schedule whose literal multiplier vectors are start=10, bonus end=20,
/// period=5, base rate=8.
pub fn vector_config() -> IssuerConfig {
    IssuerConfig::new(REWARD, AUTHORITY, 10, 20, 35, 5)
}

/// Schedule for the accumulator scenario: start=100, bonus end=120, period=3,
/// reward rate 2.
pub fn scenario_config() -> IssuerConfig {
    IssuerConfig::new(REWARD, AUTHORITY, 100, 120, 135, 3)
}
