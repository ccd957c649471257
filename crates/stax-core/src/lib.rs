//! # stax-core
//! Foundation types, errors, and collaborator traits for the Stax issuer.

pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use config::IssuerConfig;
pub use error::{CollaboratorError, IssuerError, ParseIdError};
pub use types::{AccountId, AssetId, Pool, PoolId, Position};
