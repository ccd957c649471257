//! Accrual engine: lazy per-pool settlement and settle-before-mutate
//! deposit/withdraw.
//!
//! Every mutating operation stages its changes on copies of the pool and
//! position, performs all arithmetic up front, then calls the collaborators
//! (issuance of pending reward first, custody second) and only commits once
//! both succeeded. An error at any step leaves the engine untouched.
//!
//! The engine is not synchronized; [`Issuer`](crate::issuer::Issuer) wraps it
//! in a single writer lock.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stax_core::config::IssuerConfig;
use stax_core::constants::SCALE;
use stax_core::error::{CollaboratorError, IssuerError};
use stax_core::traits::{CustodyService, EmissionSchedule, IssuanceService};
use stax_core::types::{AccountId, AssetId, Pool, PoolId, Position};

use crate::ledger::{accrued, pending, PositionLedger};
use crate::registry::PoolRegistry;
use crate::snapshot::EngineSnapshot;

/// Ledger change requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Deposit(u64),
    Withdraw(u64),
}

/// Outcome of a deposit or withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Reward issued to the account before the ledger changed.
    pub reward_issued: u128,
    /// Position after the operation.
    pub position: Position,
}

pub struct AccrualEngine {
    reward_asset: AssetId,
    start_height: u64,
    reward_rate: u64,
    allow_zero_weight: bool,
    schedule: Arc<dyn EmissionSchedule>,
    custody: Arc<dyn CustodyService>,
    issuance: Arc<dyn IssuanceService>,
    registry: PoolRegistry,
    ledger: PositionLedger,
}

impl AccrualEngine {
    /// Create an engine with no pools. The config is assumed validated.
    pub fn new(
        config: &IssuerConfig,
        schedule: Arc<dyn EmissionSchedule>,
        custody: Arc<dyn CustodyService>,
        issuance: Arc<dyn IssuanceService>,
    ) -> Self {
        Self {
            reward_asset: config.reward_asset,
            start_height: config.start_height,
            reward_rate: config.reward_rate_per_unit_time,
            allow_zero_weight: config.allow_zero_weight,
            schedule,
            custody,
            issuance,
            registry: PoolRegistry::new(),
            ledger: PositionLedger::new(),
        }
    }

    /// Replace the (empty) state with a decoded snapshot.
    ///
    /// # Errors
    ///
    /// [`IssuerError::Snapshot`] if a position names an unknown pool or a
    /// pool's `total_deposited` disagrees with its positions.
    pub fn load(&mut self, snapshot: EngineSnapshot) -> Result<(), IssuerError> {
        let registry = PoolRegistry::from_pools(snapshot.pools)?;
        let mut ledger = PositionLedger::new();
        for (pool, account, position) in snapshot.positions {
            registry
                .get(pool)
                .map_err(|_| IssuerError::Snapshot(format!("position references unknown pool {pool}")))?;
            ledger.put(pool, account, position);
        }
        for pool in registry.iter() {
            let held = ledger.pool_total(pool.id)?;
            if held != pool.total_deposited {
                return Err(IssuerError::Snapshot(format!(
                    "pool {} records {} deposited but positions hold {held}",
                    pool.id, pool.total_deposited
                )));
            }
        }
        self.registry = registry;
        self.ledger = ledger;
        info!(pools = self.registry.len(), positions = self.ledger.len(), "engine: state restored");
        Ok(())
    }

    /// Minimal state needed to resume accrual.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            pools: self.registry.iter().copied().collect(),
            positions: self.ledger.entries(),
        }
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Append a pool. Its settlement begins at `max(height, start_height)`.
    pub fn register(
        &mut self,
        weight: u64,
        deposit_asset: AssetId,
        height: u64,
    ) -> Result<PoolId, IssuerError> {
        if weight == 0 && !self.allow_zero_weight {
            return Err(IssuerError::ZeroWeight);
        }
        let first_height = height.max(self.start_height);
        let id = self.registry.register(weight, deposit_asset, first_height)?;
        info!(
            pool = id,
            weight,
            total_weight = self.registry.total_weight(),
            %deposit_asset,
            "registry: pool registered"
        );
        Ok(id)
    }

    /// Settle every pool under the current weights, then register.
    pub fn register_with_update(
        &mut self,
        weight: u64,
        deposit_asset: AssetId,
        height: u64,
    ) -> Result<PoolId, IssuerError> {
        if weight == 0 && !self.allow_zero_weight {
            return Err(IssuerError::ZeroWeight);
        }
        self.registry
            .total_weight()
            .checked_add(weight)
            .ok_or(IssuerError::ArithmeticOverflow)?;
        let settled = self.settled_all(height)?;
        self.commit_pools(settled)?;
        self.register(weight, deposit_asset, height)
    }

    /// Change a pool's weight after settling every pool under the old weights.
    /// Returns the previous weight.
    pub fn set_weight(&mut self, id: PoolId, weight: u64, height: u64) -> Result<u64, IssuerError> {
        self.registry.get(id)?;
        if weight == 0 && !self.allow_zero_weight {
            return Err(IssuerError::ZeroWeight);
        }
        let settled = self.settled_all(height)?;

        // Check the new total before committing anything.
        let old = self.registry.get(id)?.weight;
        (self.registry.total_weight() - old)
            .checked_add(weight)
            .ok_or(IssuerError::ArithmeticOverflow)?;

        self.commit_pools(settled)?;
        let old = self.registry.set_weight(id, weight)?;
        info!(
            pool = id,
            old_weight = old,
            weight,
            total_weight = self.registry.total_weight(),
            "registry: pool weight changed"
        );
        Ok(old)
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    /// Reward emitted to a pool of `weight` for multiplier `m`.
    fn pool_reward(&self, m: u64, weight: u64) -> Result<u128, IssuerError> {
        let total_weight = self.registry.total_weight();
        if total_weight == 0 {
            return Ok(0);
        }
        (m as u128)
            .checked_mul(self.reward_rate as u128)
            .and_then(|v| v.checked_mul(weight as u128))
            .map(|v| v / total_weight as u128)
            .ok_or(IssuerError::ArithmeticOverflow)
    }

    /// The pool as it would look settled at `height`. Nothing is mutated.
    pub fn settled(&self, id: PoolId, height: u64) -> Result<Pool, IssuerError> {
        let mut pool = *self.registry.get(id)?;
        if height <= pool.last_settled_height {
            return Ok(pool);
        }
        if pool.total_deposited == 0 {
            // Emission for an empty pool is discarded.
            pool.last_settled_height = height;
            return Ok(pool);
        }

        let m = self
            .schedule
            .multiplier(pool.last_settled_height, height, height)?;
        let reward = self.pool_reward(m, pool.weight)?;
        let increment = reward
            .checked_mul(SCALE)
            .ok_or(IssuerError::ArithmeticOverflow)?
            / pool.total_deposited as u128;
        pool.acc_reward_per_share = pool
            .acc_reward_per_share
            .checked_add(increment)
            .ok_or(IssuerError::ArithmeticOverflow)?;
        debug!(
            pool = id,
            from = pool.last_settled_height,
            to = height,
            multiplier = m,
            reward,
            acc_reward_per_share = pool.acc_reward_per_share,
            "engine: pool settled"
        );
        pool.last_settled_height = height;
        Ok(pool)
    }

    fn settled_all(&self, height: u64) -> Result<Vec<Pool>, IssuerError> {
        self.registry
            .iter()
            .map(|pool| self.settled(pool.id, height))
            .collect()
    }

    fn commit_pools(&mut self, pools: Vec<Pool>) -> Result<(), IssuerError> {
        for pool in pools {
            self.registry.replace(pool)?;
        }
        Ok(())
    }

    /// Advance one pool's accumulator to `height`. No-op if already settled there.
    pub fn settle(&mut self, id: PoolId, height: u64) -> Result<(), IssuerError> {
        let pool = self.settled(id, height)?;
        self.registry.replace(pool)
    }

    /// Settle every pool in id order. All pools settle or none do.
    pub fn settle_all(&mut self, height: u64) -> Result<(), IssuerError> {
        let settled = self.settled_all(height)?;
        self.commit_pools(settled)
    }

    // ------------------------------------------------------------------
    // Deposit / withdraw
    // ------------------------------------------------------------------

    /// Settle, pay pending reward, pull `amount` into custody, resync debt.
    pub fn deposit(
        &mut self,
        id: PoolId,
        account: &AccountId,
        amount: u64,
        height: u64,
    ) -> Result<Receipt, IssuerError> {
        let receipt = self.apply(id, account, Movement::Deposit(amount), height)?;
        info!(
            pool = id,
            %account,
            amount,
            reward = receipt.reward_issued,
            deposited = receipt.position.deposited,
            "engine: deposit"
        );
        Ok(receipt)
    }

    /// Settle, pay pending reward, return `amount` from custody, resync debt.
    pub fn withdraw(
        &mut self,
        id: PoolId,
        account: &AccountId,
        amount: u64,
        height: u64,
    ) -> Result<Receipt, IssuerError> {
        let receipt = self.apply(id, account, Movement::Withdraw(amount), height)?;
        info!(
            pool = id,
            %account,
            amount,
            reward = receipt.reward_issued,
            deposited = receipt.position.deposited,
            "engine: withdraw"
        );
        Ok(receipt)
    }

    fn apply(
        &mut self,
        id: PoolId,
        account: &AccountId,
        movement: Movement,
        height: u64,
    ) -> Result<Receipt, IssuerError> {
        self.registry.get(id)?;
        let mut position = self.ledger.get(id, account);
        if let Movement::Withdraw(amount) = movement {
            if amount > position.deposited {
                return Err(IssuerError::InsufficientBalance {
                    have: position.deposited,
                    need: amount,
                });
            }
        }

        // Stage: settle and compute everything before touching collaborators.
        let mut pool = self.settled(id, height)?;
        let reward = pending(&position, pool.acc_reward_per_share)?;
        match movement {
            Movement::Deposit(amount) => {
                position.deposited = position
                    .deposited
                    .checked_add(amount)
                    .ok_or(IssuerError::ArithmeticOverflow)?;
                pool.total_deposited = pool
                    .total_deposited
                    .checked_add(amount)
                    .ok_or(IssuerError::ArithmeticOverflow)?;
            }
            Movement::Withdraw(amount) => {
                position.deposited -= amount;
                pool.total_deposited = pool
                    .total_deposited
                    .checked_sub(amount)
                    .ok_or(IssuerError::ArithmeticOverflow)?;
            }
        }
        position.reward_debt = accrued(position.deposited, pool.acc_reward_per_share)?;

        // Pending reward is issued strictly before any custody movement.
        if reward > 0 {
            self.issuance
                .issue(&self.reward_asset, account, reward)
                .inspect_err(|e| warn!(pool = id, %account, reward, "engine: issuance rejected: {e}"))?;
        }

        let moved = match movement {
            Movement::Deposit(0) | Movement::Withdraw(0) => Ok(()),
            Movement::Deposit(amount) => self.custody.transfer_in(&pool.deposit_asset, account, amount),
            Movement::Withdraw(amount) => self.custody.transfer_out(&pool.deposit_asset, account, amount),
        };
        if let Err(e) = moved {
            warn!(pool = id, %account, ?movement, "engine: custody rejected: {e}");
            if reward > 0 {
                self.compensate(account, reward, &e)?;
            }
            return Err(e.into());
        }

        self.registry.replace(pool)?;
        self.ledger.put(id, *account, position);
        Ok(Receipt { reward_issued: reward, position })
    }

    /// Take back a reward issued earlier in an operation that then failed.
    fn compensate(
        &self,
        account: &AccountId,
        reward: u128,
        cause: &CollaboratorError,
    ) -> Result<(), IssuerError> {
        match self.issuance.revoke(&self.reward_asset, account, reward) {
            Ok(()) => {
                warn!(%account, reward, "engine: issued reward revoked");
                Ok(())
            }
            Err(revoke_err) => {
                warn!(%account, reward, "engine: revoke failed: {revoke_err}");
                Err(CollaboratorError::Issuance(format!(
                    "{cause}; revoking {reward} failed: {revoke_err}"
                ))
                .into())
            }
        }
    }

    /// Return the whole principal without settling and forfeit pending reward.
    /// Returns the amount sent back.
    pub fn emergency_withdraw(&mut self, id: PoolId, account: &AccountId) -> Result<u64, IssuerError> {
        let mut pool = *self.registry.get(id)?;
        let position = self.ledger.get(id, account);
        let amount = position.deposited;
        pool.total_deposited = pool
            .total_deposited
            .checked_sub(amount)
            .ok_or(IssuerError::ArithmeticOverflow)?;

        if amount > 0 {
            self.custody
                .transfer_out(&pool.deposit_asset, account, amount)
                .inspect_err(|e| warn!(pool = id, %account, amount, "engine: custody rejected: {e}"))?;
        }

        self.registry.replace(pool)?;
        self.ledger.put(id, *account, Position::default());
        warn!(pool = id, %account, amount, "engine: emergency withdraw");
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn multiplier(&self, from: u64, to: u64, current_height: u64) -> Result<u64, IssuerError> {
        self.schedule.multiplier(from, to, current_height)
    }

    pub fn pool(&self, id: PoolId) -> Result<Pool, IssuerError> {
        self.registry.get(id).copied()
    }

    /// Stored position for a known pool; empty if the account never deposited.
    pub fn position(&self, id: PoolId, account: &AccountId) -> Result<Position, IssuerError> {
        self.registry.get(id)?;
        Ok(self.ledger.get(id, account))
    }

    /// What a harvest at `height` would issue, computed on a settled copy.
    pub fn pending_reward(
        &self,
        id: PoolId,
        account: &AccountId,
        height: u64,
    ) -> Result<u128, IssuerError> {
        let pool = self.settled(id, height)?;
        pending(&self.ledger.get(id, account), pool.acc_reward_per_share)
    }

    pub fn pool_count(&self) -> usize {
        self.registry.len()
    }

    pub fn total_weight(&self) -> u64 {
        self.registry.total_weight()
    }

    pub fn pools(&self) -> Vec<Pool> {
        self.registry.iter().copied().collect()
    }
}
