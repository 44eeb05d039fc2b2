//! Proof-of-stake simulation for the VolyaChain ledger.
//!
//! Implements the emission/halving schedule and stake-weighted validator
//! selection. The draw is a single-process simulation of leader election:
//! it is neither verifiable nor Sybil-resistant.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::types::Address;

// ---------------------------------------------------------------------------
// Protocol Parameters
// ---------------------------------------------------------------------------

/// Hard cap on total supply (in UA).
pub const MAX_SUPPLY: f64 = 21_000_000.0;

/// Supply minted into the treasury by the genesis block (in UA).
pub const GENESIS_SUPPLY: f64 = 10_000_000.0;

/// Emission per block before the first halving (in UA).
pub const BASE_BLOCK_REWARD: f64 = 10.0;

/// Emission below this floors to zero. With the default base reward,
/// issuance stops after thirty halvings.
pub const MIN_BLOCK_REWARD: f64 = 1e-8;

/// Blocks per halving epoch.
pub const HALVING_INTERVAL: u64 = 24 * 30;

/// Target seconds between blocks. Informational; nothing schedules blocks.
pub const BLOCK_TIME_SECS: u64 = 30;

/// Address credited by the genesis mint.
pub const TREASURY_ADDRESS: &str = "ua_treasury";

/// Sender of the genesis mint, producer of the genesis block, and the
/// validator returned when no validator is registered.
pub const GENESIS_IDENTITY: &str = "genesis";

/// Sender of block reward transactions.
pub const SYSTEM_SENDER: &str = "system";

// ---------------------------------------------------------------------------
// Emission schedule
// ---------------------------------------------------------------------------

/// Halving epoch reached after `blocks_produced` blocks.
pub fn halving_epoch(halving_interval: u64, blocks_produced: u64) -> u64 {
    blocks_produced / halving_interval
}

/// Emission for the next block: `base / 2^epoch`, floored to zero below
/// [`MIN_BLOCK_REWARD`].
pub fn block_reward(base_reward: f64, halving_interval: u64, blocks_produced: u64) -> f64 {
    let epoch = halving_epoch(halving_interval, blocks_produced);
    let exponent = i32::try_from(epoch).unwrap_or(i32::MAX);
    let reward = base_reward / 2f64.powi(exponent);
    if reward < MIN_BLOCK_REWARD {
        0.0
    } else {
        reward
    }
}

/// Blocks left in the current halving epoch.
pub fn blocks_until_halving(halving_interval: u64, blocks_produced: u64) -> u64 {
    halving_interval - (blocks_produced % halving_interval)
}

// ---------------------------------------------------------------------------
// Validator table entry
// ---------------------------------------------------------------------------

/// A registered validator and its selection weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub address: Address,
    pub stake: f64,
}

// ---------------------------------------------------------------------------
// Entropy
// ---------------------------------------------------------------------------

/// Source of the uniform draws used for validator selection.
pub trait EntropySource: Send {
    /// Return a value uniformly distributed in `[0, upper)`.
    fn draw(&mut self, upper: f64) -> f64;
}

/// Entropy backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<StdRng> {
    /// Generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Generator with a fixed seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> EntropySource for RngSource<R> {
    fn draw(&mut self, upper: f64) -> f64 {
        if !upper.is_finite() || upper <= 0.0 {
            return 0.0;
        }
        self.0.gen_range(0.0..upper)
    }
}

/// Replays a fixed sequence of fractions in `[0, 1)`, scaled by `upper`.
///
/// Cycles once exhausted; an empty script always draws zero.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    fractions: VecDeque<f64>,
}

impl ScriptedSource {
    pub fn new(fractions: impl IntoIterator<Item = f64>) -> Self {
        Self {
            fractions: fractions.into_iter().collect(),
        }
    }
}

impl EntropySource for ScriptedSource {
    fn draw(&mut self, upper: f64) -> f64 {
        match self.fractions.pop_front() {
            Some(fraction) => {
                self.fractions.push_back(fraction);
                fraction * upper
            }
            None => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Block Producer Selection
// ---------------------------------------------------------------------------

/// Stake-weighted draw over the validator table, in table order.
///
/// Returns the first validator whose cumulative stake reaches the draw.
/// Falls back to [`GENESIS_IDENTITY`] for an empty table and to the
/// first-inserted validator if rounding leaves the walk without a match.
pub fn select_validator(validators: &[ValidatorInfo], source: &mut dyn EntropySource) -> Address {
    let Some(first) = validators.first() else {
        return Address::from(GENESIS_IDENTITY);
    };

    let total_stake: f64 = validators.iter().map(|v| v.stake).sum();
    let point = source.draw(total_stake);

    let mut cumulative = 0.0;
    for validator in validators {
        cumulative += validator.stake;
        if cumulative >= point {
            return validator.address.clone();
        }
    }

    first.address.clone()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
