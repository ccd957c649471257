//! Error types for the Stax issuer.
use thiserror::Error;

use crate::types::{AccountId, PoolId};

/// Rejection reported by an external custody or issuance service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("custody: {0}")] Custody(String),
    #[error("issuance: {0}")] Issuance(String),
}

/// A hex account or asset identifier that failed to parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid identifier: {0}")]
pub struct ParseIdError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssuerError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u64, need: u64 },
    #[error("invalid pool: {0}")] InvalidPool(PoolId),
    #[error("unauthorized caller: {0}")] Unauthorized(AccountId),
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("collaborator failure: {0}")] CollaboratorFailure(#[from] CollaboratorError),
    #[error("zero-weight pools are disabled")] ZeroWeight,
    #[error("invalid config: {0}")] InvalidConfig(String),
    #[error("snapshot: {0}")] Snapshot(String),
}
