//! Chain parameters: supply cap, emission schedule and admission policy.
//!
//! Defaults match the constants in [`crate::consensus`]. A TOML file may
//! override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consensus;
use crate::error::{ChainError, Result};
use crate::types::Address;

/// What block production does with a transfer whose sender can no longer
/// cover it (several pending transfers from one sender were each admitted
/// against the same balance).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdraftPolicy {
    /// Include it anyway; the sender's balance goes negative.
    #[default]
    Allow,
    /// Leave it in the pending pool for a later block.
    Defer,
}

/// Tunable parameters of a chain instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    pub max_supply: f64,
    pub genesis_supply: f64,
    pub base_block_reward: f64,
    pub halving_interval: u64,
    pub block_time_secs: u64,
    pub treasury: Address,
    pub overdraft_policy: OverdraftPolicy,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            max_supply: consensus::MAX_SUPPLY,
            genesis_supply: consensus::GENESIS_SUPPLY,
            base_block_reward: consensus::BASE_BLOCK_REWARD,
            halving_interval: consensus::HALVING_INTERVAL,
            block_time_secs: consensus::BLOCK_TIME_SECS,
            treasury: Address::from(consensus::TREASURY_ADDRESS),
            overdraft_policy: OverdraftPolicy::Allow,
        }
    }
}

impl ChainParams {
    /// Parse and validate parameters from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let params: Self = toml::from_str(text).map_err(|e| ChainError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Read, parse and validate a TOML parameter file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ChainError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Reject parameter sets the ledger cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.halving_interval == 0 {
            return Err(ChainError::Config("halving_interval must be at least 1".into()));
        }
        if !self.base_block_reward.is_finite() || self.base_block_reward <= 0.0 {
            return Err(ChainError::Config(format!(
                "base_block_reward must be positive, got {}",
                self.base_block_reward
            )));
        }
        if !self.max_supply.is_finite() || self.max_supply <= 0.0 {
            return Err(ChainError::Config(format!(
                "max_supply must be positive, got {}",
                self.max_supply
            )));
        }
        if !self.genesis_supply.is_finite()
            || self.genesis_supply < 0.0
            || self.genesis_supply > self.max_supply
        {
            return Err(ChainError::Config(format!(
                "genesis_supply must lie in [0, {}], got {}",
                self.max_supply, self.genesis_supply
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
