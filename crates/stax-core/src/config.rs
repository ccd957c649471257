//! Issuer configuration.
//!
//! [`IssuerConfig`] is supplied once at construction and never changes.
//! It deserializes from any serde source; the simulator binary loads it
//! from a file with environment overrides.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BASE_RATE, DEFAULT_REWARD_RATE};
use crate::error::IssuerError;
use crate::types::{AccountId, AssetId};

fn default_base_rate() -> u64 {
    DEFAULT_BASE_RATE
}

fn default_reward_rate() -> u64 {
    DEFAULT_REWARD_RATE
}

fn default_allow_zero_weight() -> bool {
    true
}

/// Configuration for an issuer instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuerConfig {
    /// Asset credited by the issuance service.
    pub reward_asset: AssetId,
    /// The only account allowed to register pools or change weights.
    pub authority: AccountId,
    /// First height that emits.
    pub start_height: u64,
    /// Last height of the bonus window, before the first halving period begins.
    pub first_bonus_end_height: u64,
    /// Informational. Emission continues at the floor rate past this height.
    pub end_of_emission_height: u64,
    /// Length of each halving period. Must be positive.
    pub halving_period_length: u64,
    /// Reward units per unit of multiplier.
    #[serde(default = "default_reward_rate")]
    pub reward_rate_per_unit_time: u64,
    /// Rate during the bonus window.
    #[serde(default = "default_base_rate")]
    pub base_rate: u64,
    /// When false, registering a pool with weight 0 fails with `ZeroWeight`.
    #[serde(default = "default_allow_zero_weight")]
    pub allow_zero_weight: bool,
}

impl IssuerConfig {
    /// Build a config with the default rates.
    pub fn new(
        reward_asset: AssetId,
        authority: AccountId,
        start_height: u64,
        first_bonus_end_height: u64,
        end_of_emission_height: u64,
        halving_period_length: u64,
    ) -> Self {
        Self {
            reward_asset,
            authority,
            start_height,
            first_bonus_end_height,
            end_of_emission_height,
            halving_period_length,
            reward_rate_per_unit_time: DEFAULT_REWARD_RATE,
            base_rate: DEFAULT_BASE_RATE,
            allow_zero_weight: true,
        }
    }

    /// Check the schedule is well formed.
    ///
    /// # Errors
    ///
    /// [`IssuerError::InvalidConfig`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), IssuerError> {
        if self.halving_period_length == 0 {
            return Err(IssuerError::InvalidConfig("halving_period_length must be positive".into()));
        }
        if self.base_rate == 0 {
            return Err(IssuerError::InvalidConfig("base_rate must be positive".into()));
        }
        if self.first_bonus_end_height < self.start_height {
            return Err(IssuerError::InvalidConfig(format!(
                "first_bonus_end_height {} precedes start_height {}",
                self.first_bonus_end_height, self.start_height
            )));
        }
        if self.end_of_emission_height < self.first_bonus_end_height {
            return Err(IssuerError::InvalidConfig(format!(
                "end_of_emission_height {} precedes first_bonus_end_height {}",
                self.end_of_emission_height, self.first_bonus_end_height
            )));
        }
        Ok(())
    }
}
