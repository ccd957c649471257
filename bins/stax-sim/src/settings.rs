//! Issuer configuration loading.
//!
//! Layers, lowest precedence first: built-in defaults, an optional config file
//! (any format the `config` crate recognizes by extension), then `STAX_*`
//! environment variables. Identifiers given through the environment should be
//! `0x`-prefixed so they are not parsed as numbers.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use stax_core::config::IssuerConfig;
use stax_core::constants::{DEFAULT_BASE_RATE, DEFAULT_REWARD_RATE};

const DEFAULT_REWARD_ASSET: &str =
    "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
const DEFAULT_AUTHORITY: &str =
    "0x0101010101010101010101010101010101010101010101010101010101010101";

/// Load and validate the issuer configuration.
pub fn load(path: Option<&Path>) -> Result<IssuerConfig> {
    load_with_env(path, Environment::with_prefix("STAX").try_parsing(true))
}

fn load_with_env(path: Option<&Path>, env: Environment) -> Result<IssuerConfig> {
    let mut builder = Config::builder()
        .set_default("reward_asset", DEFAULT_REWARD_ASSET)?
        .set_default("authority", DEFAULT_AUTHORITY)?
        .set_default("start_height", 10u64)?
        .set_default("first_bonus_end_height", 20u64)?
        .set_default("end_of_emission_height", 35u64)?
        .set_default("halving_period_length", 5u64)?
        .set_default("reward_rate_per_unit_time", DEFAULT_REWARD_RATE)?
        .set_default("base_rate", DEFAULT_BASE_RATE)?
        .set_default("allow_zero_weight", true)?;

    if let Some(path) = path {
        builder = builder.add_source(File::from(path));
    }

    let cfg: IssuerConfig = builder
        .add_source(env)
        .build()
        .context("failed to read issuer config")?
        .try_deserialize()
        .context("invalid issuer config")?;
    cfg.validate()?;
    Ok(cfg)
}
