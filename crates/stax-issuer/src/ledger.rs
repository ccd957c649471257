//! Per (pool, account) positions and reward-debt arithmetic.
//!
//! After every settlement that touches a position,
//! `reward_debt == deposited * acc_reward_per_share / SCALE`, so
//! [`pending`] is never negative and is exactly the reward accrued since.

use std::collections::HashMap;

use stax_core::constants::SCALE;
use stax_core::error::IssuerError;
use stax_core::types::{AccountId, PoolId, Position};

/// `deposited * acc_reward_per_share / SCALE`, truncated.
pub fn accrued(deposited: u64, acc_reward_per_share: u128) -> Result<u128, IssuerError> {
    (deposited as u128)
        .checked_mul(acc_reward_per_share)
        .map(|v| v / SCALE)
        .ok_or(IssuerError::ArithmeticOverflow)
}

/// Reward accrued by `position` but not yet issued.
///
/// # Errors
///
/// [`IssuerError::ArithmeticOverflow`] on overflow, or if the debt exceeds the
/// accrued amount (only possible if the accumulator went backwards).
pub fn pending(position: &Position, acc_reward_per_share: u128) -> Result<u128, IssuerError> {
    accrued(position.deposited, acc_reward_per_share)?
        .checked_sub(position.reward_debt)
        .ok_or(IssuerError::ArithmeticOverflow)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionLedger {
    positions: HashMap<(PoolId, AccountId), Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored position, or an empty one if the account never deposited.
    pub fn get(&self, pool: PoolId, account: &AccountId) -> Position {
        self.positions
            .get(&(pool, *account))
            .copied()
            .unwrap_or_default()
    }

    /// Store a position. Drained positions are kept so the key stays addressable.
    pub fn put(&mut self, pool: PoolId, account: AccountId, position: Position) {
        self.positions.insert((pool, account), position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// All stored positions, sorted by `(pool, account)` for stable output.
    pub fn entries(&self) -> Vec<(PoolId, AccountId, Position)> {
        let mut out: Vec<_> = self
            .positions
            .iter()
            .map(|(&(pool, account), &position)| (pool, account, position))
            .collect();
        out.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        out
    }

    /// Sum of deposits held in `pool` across all accounts.
    pub fn pool_total(&self, pool: PoolId) -> Result<u64, IssuerError> {
        self.positions
            .iter()
            .filter(|((p, _), _)| *p == pool)
            .try_fold(0u64, |acc, (_, pos)| {
                acc.checked_add(pos.deposited)
                    .ok_or(IssuerError::ArithmeticOverflow)
            })
    }
}
