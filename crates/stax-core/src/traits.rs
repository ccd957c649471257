//! Trait interfaces between the accrual engine and the outside world.
//!
//! - [`Clock`]: monotonic height source
//! - [`CustodyService`]: moves deposit assets in and out of engine custody
//! - [`IssuanceService`]: credits the reward asset to accounts
//! - [`EmissionSchedule`]: pure emission-weight math (stax-issuer implements)

use crate::error::{CollaboratorError, IssuerError};
use crate::types::{AccountId, AssetId};

/// Monotonically non-decreasing height source.
///
/// The engine reads it once per operation and never waits on it.
pub trait Clock: Send + Sync {
    fn current_height(&self) -> u64;
}

/// Custody of deposit assets.
///
/// Each call either moves the full amount or fails without moving anything.
pub trait CustodyService: Send + Sync {
    /// Move `amount` of `asset` from `from` into engine custody.
    fn transfer_in(&self, asset: &AssetId, from: &AccountId, amount: u64)
    -> Result<(), CollaboratorError>;

    /// Move `amount` of `asset` out of engine custody to `to`.
    fn transfer_out(&self, asset: &AssetId, to: &AccountId, amount: u64)
    -> Result<(), CollaboratorError>;
}

/// Issuance of the reward asset. Only the engine calls this.
pub trait IssuanceService: Send + Sync {
    /// Credit `amount` of `asset` to `to`.
    fn issue(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), CollaboratorError>;

    /// Undo a credit made earlier in the same operation.
    ///
    /// Called only when a later custody step of that operation fails.
    fn revoke(&self, asset: &AssetId, from: &AccountId, amount: u128)
    -> Result<(), CollaboratorError>;
}

/// Emission weight over height intervals.
///
/// Implementations are pure: the same inputs always give the same output.
pub trait EmissionSchedule: Send + Sync {
    /// Total emission weight over `[from, to)`, clamped to
    /// `[start_height, current_height)`. Zero when the clamped range is empty.
    fn multiplier(&self, from: u64, to: u64, current_height: u64) -> Result<u64, IssuerError>;

    /// Emission rate for the single height `height`. Zero before the start.
    fn rate_at(&self, height: u64) -> u64;
}
