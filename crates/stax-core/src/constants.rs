//! Issuer constants. All reward quantities are integer units of the reward asset.

/// Fixed-point scale of `acc_reward_per_share` and `reward_debt`.
pub const SCALE: u128 = 1_000_000_000_000;

/// Emission rate inside the initial bonus window.
pub const DEFAULT_BASE_RATE: u64 = 8;

/// Reward units emitted per unit of multiplier, before pool weighting.
pub const DEFAULT_REWARD_RATE: u64 = 2;

/// Largest right-shift applied to the base rate. Beyond it the rate is the floor.
pub const MAX_HALVINGS: u32 = 63;

/// Floor of the halving rate. Emission never stops.
pub const MIN_RATE: u64 = 1;
