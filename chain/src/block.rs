//! Block structure for the VolyaChain ledger.
//!
//! A block commits to its transactions through a merkle root and to its
//! predecessor through `previous_hash`. Both digests are computed once at
//! construction; validation recomputes them from the stored fields.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::transaction::Transaction;
use crate::types::{compute_merkle_root, current_timestamp, Address, Hash, Hashable};

/// A hash-linked container of transactions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Unix timestamp in microseconds.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    /// Hash of the preceding block, `"0"` for genesis.
    pub previous_hash: Hash,
    /// Address of the block producer.
    pub validator: Address,
    /// Always zero; there is no proof-of-work search.
    pub nonce: u64,
    /// Amount minted by this block's reward transaction, zero when the block
    /// carries none.
    pub block_reward: f64,
    pub merkle_root: Hash,
    pub hash: Hash,
}

impl Block {
    /// Build a block stamped with the current time.
    pub fn new(
        transactions: Vec<Transaction>,
        previous_hash: Hash,
        validator: Address,
        block_reward: f64,
    ) -> Self {
        Self::at(
            transactions,
            previous_hash,
            validator,
            block_reward,
            current_timestamp(),
        )
    }

    /// Build a block with an explicit timestamp, computing merkle root and hash.
    pub fn at(
        transactions: Vec<Transaction>,
        previous_hash: Hash,
        validator: Address,
        block_reward: f64,
        timestamp: u64,
    ) -> Self {
        let mut block = Self {
            timestamp,
            transactions,
            previous_hash,
            validator,
            nonce: 0,
            block_reward,
            merkle_root: Hash::empty(),
            hash: Hash::empty(),
        };
        block.merkle_root = block.compute_merkle_root();
        block.hash = block.compute_hash();
        block
    }

    /// Merkle root over the transaction identifiers, in block order.
    pub fn compute_merkle_root(&self) -> Hash {
        let ids: Vec<Hash> = self.transactions.iter().map(|tx| tx.tx_id.clone()).collect();
        compute_merkle_root(&ids)
    }

    /// Recompute the block hash from the stored fields.
    pub fn compute_hash(&self) -> Hash {
        self.hash()
    }

    /// Whether the stored hash matches the stored fields.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Whether the stored merkle root matches the transactions.
    pub fn verify_merkle_root(&self) -> bool {
        self.merkle_root == self.compute_merkle_root()
    }

    /// Whether this block sits at the root of the chain.
    pub fn is_genesis(&self) -> bool {
        self.previous_hash.is_genesis_parent()
    }

    /// Number of transactions in the block.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the block carries no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Hashable for Block {
    /// Compact JSON with sorted keys over everything except `block_reward` and
    /// `hash` itself.
    fn to_hash_bytes(&self) -> Vec<u8> {
        // serde_json's default map is ordered by key, which keeps this canonical.
        let canonical = json!({
            "timestamp": self.timestamp,
            "transactions": self.transactions,
            "previous_hash": self.previous_hash,
            "validator": self.validator,
            "nonce": self.nonce,
            "merkle_root": self.merkle_root,
        });
        canonical.to_string().into_bytes()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
