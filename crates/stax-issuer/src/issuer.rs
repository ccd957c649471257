//! Locked issuer facade.
//!
//! [`Issuer`] owns an [`AccrualEngine`] behind a single `RwLock`. Every
//! mutating call takes the write lock for its whole duration, reads the clock
//! once inside it, and runs to completion before the next writer starts.
//! Queries take the read lock and only ever see committed state.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use stax_core::config::IssuerConfig;
use stax_core::error::IssuerError;
use stax_core::traits::{Clock, CustodyService, EmissionSchedule, IssuanceService};
use stax_core::types::{AccountId, AssetId, Pool, PoolId, Position};

use crate::engine::{AccrualEngine, Receipt};
use crate::multiplier::HalvingSchedule;
use crate::snapshot::EngineSnapshot;

pub struct Issuer {
    config: IssuerConfig,
    clock: Arc<dyn Clock>,
    engine: RwLock<AccrualEngine>,
}

impl Issuer {
    /// Create an issuer using the halving schedule described by `config`.
    ///
    /// # Errors
    ///
    /// [`IssuerError::InvalidConfig`] if the config fails validation.
    pub fn new(
        config: IssuerConfig,
        clock: Arc<dyn Clock>,
        custody: Arc<dyn CustodyService>,
        issuance: Arc<dyn IssuanceService>,
    ) -> Result<Self, IssuerError> {
        let schedule: Arc<dyn EmissionSchedule> = Arc::new(HalvingSchedule::from_config(&config));
        Self::with_schedule(config, schedule, clock, custody, issuance)
    }

    /// Create an issuer with a custom emission schedule.
    pub fn with_schedule(
        config: IssuerConfig,
        schedule: Arc<dyn EmissionSchedule>,
        clock: Arc<dyn Clock>,
        custody: Arc<dyn CustodyService>,
        issuance: Arc<dyn IssuanceService>,
    ) -> Result<Self, IssuerError> {
        config.validate()?;
        let engine = AccrualEngine::new(&config, schedule, custody, issuance);
        Ok(Self {
            config,
            clock,
            engine: RwLock::new(engine),
        })
    }

    /// Create an issuer and load state from [`snapshot`](Self::snapshot) bytes.
    pub fn restore(
        config: IssuerConfig,
        clock: Arc<dyn Clock>,
        custody: Arc<dyn CustodyService>,
        issuance: Arc<dyn IssuanceService>,
        bytes: &[u8],
    ) -> Result<Self, IssuerError> {
        let issuer = Self::new(config, clock, custody, issuance)?;
        let snapshot = EngineSnapshot::decode(bytes)?;
        issuer.engine.write().load(snapshot)?;
        Ok(issuer)
    }

    /// Encode the minimal state needed to resume accrual.
    pub fn snapshot(&self) -> Result<Vec<u8>, IssuerError> {
        self.engine.read().snapshot().encode()
    }

    fn ensure_authority(&self, caller: &AccountId) -> Result<(), IssuerError> {
        if *caller != self.config.authority {
            warn!(%caller, "issuer: authority-only call rejected");
            return Err(IssuerError::Unauthorized(*caller));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutating operations
    // ------------------------------------------------------------------

    /// Register a pool. Authority only.
    pub fn register(
        &self,
        caller: &AccountId,
        weight: u64,
        deposit_asset: AssetId,
    ) -> Result<PoolId, IssuerError> {
        self.ensure_authority(caller)?;
        let mut engine = self.engine.write();
        let height = self.clock.current_height();
        engine.register(weight, deposit_asset, height)
    }

    /// Settle every pool under the old total weight, then register. Authority only.
    pub fn register_with_update(
        &self,
        caller: &AccountId,
        weight: u64,
        deposit_asset: AssetId,
    ) -> Result<PoolId, IssuerError> {
        self.ensure_authority(caller)?;
        let mut engine = self.engine.write();
        let height = self.clock.current_height();
        engine.register_with_update(weight, deposit_asset, height)
    }

    /// Change a pool's weight. Settles every pool first. Authority only.
    pub fn set_weight(&self, caller: &AccountId, pool: PoolId, weight: u64) -> Result<u64, IssuerError> {
        self.ensure_authority(caller)?;
        let mut engine = self.engine.write();
        let height = self.clock.current_height();
        engine.set_weight(pool, weight, height)
    }

    pub fn deposit(&self, caller: &AccountId, pool: PoolId, amount: u64) -> Result<Receipt, IssuerError> {
        let mut engine = self.engine.write();
        let height = self.clock.current_height();
        engine.deposit(pool, caller, amount, height)
    }

    pub fn withdraw(&self, caller: &AccountId, pool: PoolId, amount: u64) -> Result<Receipt, IssuerError> {
        let mut engine = self.engine.write();
        let height = self.clock.current_height();
        engine.withdraw(pool, caller, amount, height)
    }

    /// Return the caller's whole principal, forfeiting pending reward.
    pub fn emergency_withdraw(&self, caller: &AccountId, pool: PoolId) -> Result<u64, IssuerError> {
        self.engine.write().emergency_withdraw(pool, caller)
    }

    pub fn settle(&self, pool: PoolId) -> Result<(), IssuerError> {
        let mut engine = self.engine.write();
        let height = self.clock.current_height();
        engine.settle(pool, height)
    }

    pub fn settle_all(&self) -> Result<(), IssuerError> {
        let mut engine = self.engine.write();
        let height = self.clock.current_height();
        engine.settle_all(height)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Emission weight over `[from, to)`, clamped to the current height.
    pub fn multiplier(&self, from: u64, to: u64) -> Result<u64, IssuerError> {
        let height = self.clock.current_height();
        self.engine.read().multiplier(from, to, height)
    }

    pub fn pool_info(&self, pool: PoolId) -> Result<Pool, IssuerError> {
        self.engine.read().pool(pool)
    }

    pub fn position_info(&self, pool: PoolId, account: &AccountId) -> Result<Position, IssuerError> {
        self.engine.read().position(pool, account)
    }

    /// Reward a harvest at the current height would issue.
    pub fn pending_reward(&self, pool: PoolId, account: &AccountId) -> Result<u128, IssuerError> {
        let engine = self.engine.read();
        let height = self.clock.current_height();
        engine.pending_reward(pool, account, height)
    }

    pub fn pools(&self) -> Vec<Pool> {
        self.engine.read().pools()
    }

    pub fn pool_count(&self) -> usize {
        self.engine.read().pool_count()
    }

    pub fn total_weight(&self) -> u64 {
        self.engine.read().total_weight()
    }

    pub fn current_height(&self) -> u64 {
        self.clock.current_height()
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ManualClock, MemoryCustody, MemoryIssuance};
    use std::thread;

    const AUTHORITY: AccountId = AccountId::from_seed(0x01);
    const ALICE: AccountId = AccountId::from_seed(0xa1);
    const LP: AssetId = AssetId::from_seed(0x10);

    struct Harness {
        clock: Arc<ManualClock>,
        custody: Arc<MemoryCustody>,
        issuance: Arc<MemoryIssuance>,
        issuer: Issuer,
    }

    fn harness() -> Harness {
        let config = IssuerConfig::new(AssetId::from_seed(0xee), AUTHORITY, 10, 20, 35, 5);
        let clock = Arc::new(ManualClock::new(0));
        let custody = Arc::new(MemoryCustody::new());
        let issuance = Arc::new(MemoryIssuance::new());
        let issuer = Issuer::new(config, clock.clone(), custody.clone(), issuance.clone()).unwrap();
        Harness { clock, custody, issuance, issuer }
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = IssuerConfig::new(AssetId::default(), AUTHORITY, 10, 20, 35, 5);
        config.halving_period_length = 0;
        let result = Issuer::new(
            config,
            Arc::new(ManualClock::new(0)),
            Arc::new(MemoryCustody::new()),
            Arc::new(MemoryIssuance::new()),
        );
        assert!(matches!(result, Err(IssuerError::InvalidConfig(_))));
    }

    #[test]
    fn only_authority_registers() {
        let h = harness();
        assert_eq!(h.issuer.register(&ALICE, 10, LP), Err(IssuerError::Unauthorized(ALICE)));
        assert_eq!(h.issuer.set_weight(&ALICE, 0, 1), Err(IssuerError::Unauthorized(ALICE)));
        assert_eq!(h.issuer.pool_count(), 0);
        assert_eq!(h.issuer.register(&AUTHORITY, 10, LP).unwrap(), 0);
    }

    #[test]
    fn multiplier_uses_clock() {
        let h = harness();
        h.clock.advance_to(33);
        assert_eq!(h.issuer.multiplier(16, 54).unwrap(), 98);
        h.clock.advance_to(35);
        assert_eq!(h.issuer.multiplier(10, 25).unwrap(), 120);
    }

    #[test]
    fn pool_registered_before_start_settles_from_start() {
        let h = harness();
        let id = h.issuer.register(&AUTHORITY, 10, LP).unwrap();
        assert_eq!(h.issuer.pool_info(id).unwrap().last_settled_height, 10);
        h.clock.advance_to(50);
        let id = h.issuer.register(&AUTHORITY, 10, LP).unwrap();
        assert_eq!(h.issuer.pool_info(id).unwrap().last_settled_height, 50);
    }

    #[test]
    fn position_of_unknown_pool_is_invalid() {
        let h = harness();
        assert_eq!(h.issuer.position_info(3, &ALICE), Err(IssuerError::InvalidPool(3)));
        assert_eq!(h.issuer.deposit(&ALICE, 3, 1).unwrap_err(), IssuerError::InvalidPool(3));
    }

    #[test]
    fn concurrent_deposits_serialize() {
        let h = Arc::new(harness());
        h.issuer.register(&AUTHORITY, 1, LP).unwrap();
        let accounts: Vec<AccountId> = (0..8u8).map(|i| AccountId::from_seed(0x40 + i)).collect();
        for a in &accounts {
            h.custody.fund(LP, *a, 1_000);
        }
        let handles: Vec<_> = accounts
            .iter()
            .map(|a| {
                let h = Arc::clone(&h);
                let a = *a;
                thread::spawn(move || {
                    for _ in 0..10 {
                        h.clock.advance(1);
                        h.issuer.deposit(&a, 0, 100).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let pool = h.issuer.pool_info(0).unwrap();
        assert_eq!(pool.total_deposited, 8_000);
        assert_eq!(h.custody.held(&LP), 8_000);
        for a in &accounts {
            assert_eq!(h.issuer.position_info(0, a).unwrap().deposited, 1_000);
        }
        assert_eq!(pool.last_settled_height, h.clock.current_height());
    }

    #[test]
    fn snapshot_restores_into_new_issuer() {
        let h = harness();
        h.issuer.register(&AUTHORITY, 10, LP).unwrap();
        h.custody.fund(LP, ALICE, 500);
        h.clock.advance_to(12);
        h.issuer.deposit(&ALICE, 0, 500).unwrap();
        h.clock.advance_to(30);
        h.issuer.settle_all().unwrap();
        let bytes = h.issuer.snapshot().unwrap();

        let restored = Issuer::restore(
            h.issuer.config().clone(),
            h.clock.clone(),
            h.custody.clone(),
            h.issuance.clone(),
            &bytes,
        )
        .unwrap();
        assert_eq!(restored.pools(), h.issuer.pools());
        assert_eq!(restored.total_weight(), 10);
        assert_eq!(
            restored.position_info(0, &ALICE).unwrap(),
            h.issuer.position_info(0, &ALICE).unwrap()
        );
        assert_eq!(
            restored.pending_reward(0, &ALICE).unwrap(),
            h.issuer.pending_reward(0, &ALICE).unwrap()
        );
    }
}
