//! # stax-issuer: reward accrual engine.
//!
//! All reward arithmetic is integer-only and checked; overflow surfaces as
//! `IssuerError::ArithmeticOverflow` rather than wrapping.
//!
//! - [`multiplier::HalvingSchedule`]: emission weight under a halving schedule
//!   floored at rate 1
//! - [`registry::PoolRegistry`]: append-only weighted pools
//! - [`ledger::PositionLedger`]: per (pool, account) deposits and reward debt
//! - [`engine::AccrualEngine`]: lazy settlement and settle-before-mutate
//!   deposit/withdraw
//! - [`issuer::Issuer`]: single-writer locked facade reading the clock once
//!   per operation
//! - [`memory`]: in-memory clock, custody, and issuance collaborators

pub mod engine;
pub mod issuer;
pub mod ledger;
pub mod memory;
pub mod multiplier;
pub mod registry;
pub mod snapshot;

pub use engine::{AccrualEngine, Receipt};
pub use issuer::Issuer;
pub use multiplier::HalvingSchedule;
pub use snapshot::EngineSnapshot;
