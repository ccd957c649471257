//! Scenario and adversarial test suite for the Stax issuer.
//!
//! Integration tests drive the locked [`Issuer`](stax_issuer::Issuer) facade
//! end to end against in-memory collaborators.

pub mod helpers;
