//! Append-only pool registry.
//!
//! Pools live in a `Vec` indexed by [`PoolId`]; ids are dense, assigned in
//! registration order, and never reused. `total_weight` always equals the sum
//! of all pool weights.

use stax_core::error::IssuerError;
use stax_core::types::{AssetId, Pool, PoolId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
    total_weight: u64,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from stored pools, recomputing the total weight.
    ///
    /// # Errors
    ///
    /// - [`IssuerError::Snapshot`] if ids are not dense from zero
    /// - [`IssuerError::ArithmeticOverflow`] if the weights overflow `u64`
    pub fn from_pools(pools: Vec<Pool>) -> Result<Self, IssuerError> {
        let mut total_weight: u64 = 0;
        for (index, pool) in pools.iter().enumerate() {
            if pool.id != index as PoolId {
                return Err(IssuerError::Snapshot(format!(
                    "pool at slot {index} has id {}",
                    pool.id
                )));
            }
            total_weight = total_weight
                .checked_add(pool.weight)
                .ok_or(IssuerError::ArithmeticOverflow)?;
        }
        Ok(Self { pools, total_weight })
    }

    /// Append a pool whose settlement starts at `first_height`.
    pub fn register(
        &mut self,
        weight: u64,
        deposit_asset: AssetId,
        first_height: u64,
    ) -> Result<PoolId, IssuerError> {
        let total_weight = self
            .total_weight
            .checked_add(weight)
            .ok_or(IssuerError::ArithmeticOverflow)?;
        let id = self.pools.len() as PoolId;
        self.pools.push(Pool {
            id,
            weight,
            acc_reward_per_share: 0,
            last_settled_height: first_height,
            deposit_asset,
            total_deposited: 0,
        });
        self.total_weight = total_weight;
        Ok(id)
    }

    pub fn get(&self, id: PoolId) -> Result<&Pool, IssuerError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.pools.get(i))
            .ok_or(IssuerError::InvalidPool(id))
    }

    /// Overwrite a pool with a settled copy. Weight changes go through
    /// [`set_weight`](Self::set_weight) so the total stays consistent.
    pub fn replace(&mut self, pool: Pool) -> Result<(), IssuerError> {
        let slot = usize::try_from(pool.id)
            .ok()
            .and_then(|i| self.pools.get_mut(i))
            .ok_or(IssuerError::InvalidPool(pool.id))?;
        debug_assert_eq!(slot.weight, pool.weight);
        *slot = pool;
        Ok(())
    }

    /// Change a pool's weight and return the previous one.
    pub fn set_weight(&mut self, id: PoolId, weight: u64) -> Result<u64, IssuerError> {
        let old = self.get(id)?.weight;
        let total_weight = (self.total_weight - old)
            .checked_add(weight)
            .ok_or(IssuerError::ArithmeticOverflow)?;
        self.pools[id as usize].weight = weight;
        self.total_weight = total_weight;
        Ok(old)
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Pools in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter()
    }
}
