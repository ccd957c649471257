//! Core issuer types: identifiers, pools, positions.
//!
//! Deposit amounts are `u64` units of a pool's deposit asset. Reward
//! quantities and fixed-point accumulators are `u128`, scaled by
//! [`SCALE`](crate::constants::SCALE) where noted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseIdError;

/// Stable pool identifier, assigned in registration order and never reused.
pub type PoolId = u64;

fn parse_id(s: &str) -> Result<[u8; 32], ParseIdError> {
    let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|e| ParseIdError(e.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| ParseIdError(format!("expected 32 bytes, got {}", bytes.len())))
}

/// A participant (or the authority) identified by 32 opaque bytes.
///
/// Renders and parses as 64 lowercase hex characters, optionally `0x`-prefixed.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Build an account id from a single repeated byte. Handy for fixtures.
    pub const fn from_seed(seed: u8) -> Self {
        Self([seed; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s).map(Self)
    }
}

impl TryFrom<String> for AccountId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.to_string()
    }
}

/// Opaque reference to a transferable asset (deposit asset or reward asset).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(pub [u8; 32]);

impl AssetId {
    pub const fn from_seed(seed: u8) -> Self {
        Self([seed; 32])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for AssetId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s).map(Self)
    }
}

impl TryFrom<String> for AssetId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.to_string()
    }
}

/// A weighted deposit pool.
///
/// `acc_reward_per_share` and `last_settled_height` never decrease.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Pool {
    pub id: PoolId,
    /// Share of total emission relative to the registry's total weight.
    pub weight: u64,
    /// Cumulative reward per deposited unit since inception, scaled by `SCALE`.
    pub acc_reward_per_share: u128,
    /// No emission before this height is still pending for the pool.
    pub last_settled_height: u64,
    pub deposit_asset: AssetId,
    /// Sum of all positions' deposited amounts.
    pub total_deposited: u64,
}

/// One account's stake in one pool. An absent position reads as the default.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Position {
    pub deposited: u64,
    /// Reward already accounted for, scaled like `deposited * acc / SCALE`.
    pub reward_debt: u128,
}

impl Position {
    /// Drained positions stay addressable and may be re-entered.
    pub fn is_drained(&self) -> bool {
        self.deposited == 0 && self.reward_debt == 0
    }
}
