//! Transaction types for the VolyaChain ledger.
//!
//! Three kinds share one record shape:
//! - `Transfer`: value moved between two addresses, paying a fee to the block validator
//! - `Genesis`: the one-off initial mint into the treasury
//! - `BlockReward`: newly emitted supply credited to a block's validator
//!
//! Transactions are not signed. The identifier is a content digest used for
//! merkle leaves and lookups, and carries no authenticity guarantee.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};
use crate::types::{current_timestamp, Address, Hash, Hashable};

// ---------------------------------------------------------------------------
// TxKind
// ---------------------------------------------------------------------------

/// The kind of a transaction, which decides how it moves balances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Transfer,
    Genesis,
    BlockReward,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxKind::Transfer => write!(f, "transfer"),
            TxKind::Genesis => write!(f, "genesis"),
            TxKind::BlockReward => write!(f, "block_reward"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An immutable value transfer or system event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub tx_id: Hash,
    pub sender: Address,
    pub receiver: Address,
    pub amount: f64,
    pub fee: f64,
    pub tx_type: TxKind,
    /// Unix timestamp in microseconds.
    pub timestamp: u64,
}

impl Transaction {
    /// Create a transaction stamped with the current time.
    pub fn new(
        sender: impl Into<Address>,
        receiver: impl Into<Address>,
        amount: f64,
        fee: f64,
        kind: TxKind,
    ) -> Result<Self> {
        Self::at(sender, receiver, amount, fee, kind, current_timestamp())
    }

    /// Create a transaction with an explicit timestamp.
    pub fn at(
        sender: impl Into<Address>,
        receiver: impl Into<Address>,
        amount: f64,
        fee: f64,
        kind: TxKind,
        timestamp: u64,
    ) -> Result<Self> {
        check_non_negative("amount", amount)?;
        check_non_negative("fee", fee)?;

        let mut tx = Self {
            tx_id: Hash::empty(),
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            fee,
            tx_type: kind,
            timestamp,
        };
        tx.tx_id = tx.hash();
        Ok(tx)
    }

    /// Mint-style transaction created by the ledger itself (genesis, rewards).
    /// Amounts come from validated parameters or the emission schedule.
    pub(crate) fn system(
        sender: Address,
        receiver: Address,
        amount: f64,
        kind: TxKind,
        timestamp: u64,
    ) -> Self {
        let mut tx = Self {
            tx_id: Hash::empty(),
            sender,
            receiver,
            amount,
            fee: 0.0,
            tx_type: kind,
            timestamp,
        };
        tx.tx_id = tx.hash();
        tx
    }

    /// Amount plus fee: what a transfer debits from its sender.
    pub fn total_cost(&self) -> f64 {
        self.amount + self.fee
    }

    /// Whether `address` is either endpoint of this transaction.
    pub fn involves(&self, address: &Address) -> bool {
        &self.sender == address || &self.receiver == address
    }

    /// Recompute the identifier and compare it with the stored one.
    pub fn verify_id(&self) -> bool {
        self.tx_id == self.hash()
    }
}

impl Hashable for Transaction {
    /// Sender, receiver, amount and timestamp, concatenated as text.
    fn to_hash_bytes(&self) -> Vec<u8> {
        format!(
            "{}{}{}{}",
            self.sender, self.receiver, self.amount, self.timestamp
        )
        .into_bytes()
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ChainError::InvalidAmount { field, value });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// A transaction as seen from the chain: where it landed and when.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub block_hash: Hash,
    pub block_timestamp: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
