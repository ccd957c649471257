//! Scripted simulations against in-memory collaborators.
//!
//! A script is a JSON document with a list of steps:
//!
//! ```json
//! { "steps": [
//!     { "op": "register", "weight": 10, "asset": "0x1010…" },
//!     { "op": "fund", "account": "0xa1a1…", "pool": 0, "amount": 250000 },
//!     { "op": "advance_to", "height": 110 },
//!     { "op": "deposit", "account": "0xa1a1…", "pool": 0, "amount": 250000 },
//!     { "op": "advance_to", "height": 134 },
//!     { "op": "withdraw", "account": "0xa1a1…", "pool": 0, "amount": 100000 }
//! ] }
//! ```
//!
//! Authority-only steps run as the configured authority.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stax_core::config::IssuerConfig;
use stax_core::traits::Clock;
use stax_core::types::{AccountId, AssetId, Pool, PoolId, Position};
use stax_issuer::Issuer;
use stax_issuer::memory::{ManualClock, MemoryCustody, MemoryIssuance};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Register {
        weight: u64,
        asset: AssetId,
        #[serde(default)]
        with_update: bool,
    },
    SetWeight { pool: PoolId, weight: u64 },
    /// Give an account deposit-asset balance outside the issuer.
    Fund { account: AccountId, pool: PoolId, amount: u64 },
    Deposit { account: AccountId, pool: PoolId, amount: u64 },
    Withdraw { account: AccountId, pool: PoolId, amount: u64 },
    EmergencyWithdraw { account: AccountId, pool: PoolId },
    Settle { pool: PoolId },
    SettleAll,
    Advance { blocks: u64 },
    AdvanceTo { height: u64 },
}

#[derive(Debug, Serialize)]
pub struct PositionReport {
    pub pool: PoolId,
    pub account: AccountId,
    pub position: Position,
    pub pending: u128,
    pub wallet: u64,
}

#[derive(Debug, Serialize)]
pub struct RewardReport {
    pub account: AccountId,
    pub issued: u128,
}

/// Final state after a script ran.
#[derive(Debug, Serialize)]
pub struct Report {
    pub height: u64,
    pub total_weight: u64,
    pub pools: Vec<Pool>,
    pub positions: Vec<PositionReport>,
    pub rewards: Vec<RewardReport>,
    pub failed_steps: usize,
}

/// Issuer wired to in-memory collaborators.
pub struct Simulation {
    pub clock: Arc<ManualClock>,
    pub custody: Arc<MemoryCustody>,
    pub issuance: Arc<MemoryIssuance>,
    pub issuer: Issuer,
    accounts: BTreeSet<AccountId>,
}

impl Simulation {
    pub fn new(config: IssuerConfig, resume: Option<&[u8]>, start_height: u64) -> Result<Self> {
        let clock = Arc::new(ManualClock::new(start_height));
        let custody = Arc::new(MemoryCustody::new());
        let issuance = Arc::new(MemoryIssuance::new());
        let issuer = match resume {
            Some(bytes) => {
                let issuer = Issuer::restore(config, clock.clone(), custody.clone(), issuance.clone(), bytes)
                    .context("failed to restore snapshot")?;
                // Restored principal must be withdrawable from the fresh custody book.
                for pool in issuer.pools() {
                    custody.seed_held(pool.deposit_asset, pool.total_deposited);
                }
                issuer
            }
            None => Issuer::new(config, clock.clone(), custody.clone(), issuance.clone())?,
        };
        Ok(Self {
            clock,
            custody,
            issuance,
            issuer,
            accounts: BTreeSet::new(),
        })
    }

    fn apply(&mut self, step: &Step) -> Result<()> {
        let authority = self.issuer.config().authority;
        match step {
            Step::Register { weight, asset, with_update } => {
                let id = if *with_update {
                    self.issuer.register_with_update(&authority, *weight, *asset)?
                } else {
                    self.issuer.register(&authority, *weight, *asset)?
                };
                info!(pool = id, weight, "sim: registered");
            }
            Step::SetWeight { pool, weight } => {
                self.issuer.set_weight(&authority, *pool, *weight)?;
            }
            Step::Fund { account, pool, amount } => {
                let asset = self.issuer.pool_info(*pool)?.deposit_asset;
                self.custody.fund(asset, *account, *amount);
                self.accounts.insert(*account);
            }
            Step::Deposit { account, pool, amount } => {
                self.accounts.insert(*account);
                self.issuer.deposit(account, *pool, *amount)?;
            }
            Step::Withdraw { account, pool, amount } => {
                self.accounts.insert(*account);
                self.issuer.withdraw(account, *pool, *amount)?;
            }
            Step::EmergencyWithdraw { account, pool } => {
                self.accounts.insert(*account);
                self.issuer.emergency_withdraw(account, *pool)?;
            }
            Step::Settle { pool } => self.issuer.settle(*pool)?,
            Step::SettleAll => self.issuer.settle_all()?,
            Step::Advance { blocks } => {
                self.clock.advance(*blocks);
            }
            Step::AdvanceTo { height } => {
                let now = self.clock.current_height();
                if *height < now {
                    bail!("clock cannot move back from {now} to {height}");
                }
                self.clock.advance_to(*height);
            }
        }
        Ok(())
    }

    /// Run every step in order. With `keep_going`, failed steps are logged
    /// and counted instead of aborting the run.
    pub fn run(&mut self, script: &Script, keep_going: bool) -> Result<usize> {
        let mut failed = 0;
        for (index, step) in script.steps.iter().enumerate() {
            if let Err(e) = self.apply(step) {
                if !keep_going {
                    return Err(e.context(format!("step {index} ({step:?}) failed")));
                }
                warn!(index, ?step, "sim: step failed: {e:#}");
                failed += 1;
            }
        }
        Ok(failed)
    }

    pub fn report(&self, failed_steps: usize) -> Result<Report> {
        let pools = self.issuer.pools();
        let reward_asset = self.issuer.config().reward_asset;
        let mut positions = Vec::new();
        for pool in &pools {
            for account in &self.accounts {
                let position = self.issuer.position_info(pool.id, account)?;
                if position == Position::default() {
                    continue;
                }
                positions.push(PositionReport {
                    pool: pool.id,
                    account: *account,
                    position,
                    pending: self.issuer.pending_reward(pool.id, account)?,
                    wallet: self.custody.balance_of(&pool.deposit_asset, account),
                });
            }
        }
        let rewards = self
            .accounts
            .iter()
            .map(|account| RewardReport {
                account: *account,
                issued: self.issuance.balance_of(&reward_asset, account),
            })
            .collect();
        Ok(Report {
            height: self.clock.current_height(),
            total_weight: self.issuer.total_weight(),
            pools,
            positions,
            rewards,
            failed_steps,
        })
    }
}
