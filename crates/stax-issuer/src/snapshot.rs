//! Resume state codec.
//!
//! A snapshot holds only what accrual needs to continue: every pool and every
//! stored position. Total weight is recomputed on load. Encoding is bincode
//! with the standard config.

use stax_core::error::IssuerError;
use stax_core::types::{AccountId, Pool, PoolId, Position};

#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct EngineSnapshot {
    /// Pools in id order.
    pub pools: Vec<Pool>,
    /// Positions sorted by `(pool, account)`.
    pub positions: Vec<(PoolId, AccountId, Position)>,
}

impl EngineSnapshot {
    pub fn encode(&self) -> Result<Vec<u8>, IssuerError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| IssuerError::Snapshot(e.to_string()))
    }

    /// Decode a snapshot, rejecting trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, IssuerError> {
        let (snapshot, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| IssuerError::Snapshot(e.to_string()))?;
        if read != bytes.len() {
            return Err(IssuerError::Snapshot(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(snapshot)
    }
}
