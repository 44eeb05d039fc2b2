//! Core types used throughout the VolyaChain ledger.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ---------------------------------------------------------------------------
// Address — opaque balance-table key
// ---------------------------------------------------------------------------

/// An account address. Plain string, not derived from any key material.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address from anything string-like.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Return the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Address {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ---------------------------------------------------------------------------
// Hash — hex-encoded SHA-256 digest
// ---------------------------------------------------------------------------

/// Sentinel stored as the previous hash of the genesis block.
const GENESIS_PARENT: &str = "0";

/// A SHA-256 digest kept in its lowercase hex form.
///
/// Identifiers, merkle roots and block hashes all travel as hex strings, and
/// merkle pairing hashes the concatenated hex text, so the string form is the
/// canonical one.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash(String);

impl Hash {
    /// Compute SHA-256 of arbitrary data.
    pub fn compute(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    /// Digest of the empty byte string (merkle root of an empty block).
    pub fn empty() -> Self {
        Self::compute(b"")
    }

    /// The `"0"` sentinel used as the genesis block's previous hash.
    pub fn genesis_parent() -> Self {
        Self(GENESIS_PARENT.to_string())
    }

    /// Whether this is the genesis parent sentinel.
    pub fn is_genesis_parent(&self) -> bool {
        self.0 == GENESIS_PARENT
    }

    /// Return the hex-encoded representation.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Leading characters of the hex form, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Hashable trait
// ---------------------------------------------------------------------------

/// Trait for types that can produce a canonical byte representation for hashing.
pub trait Hashable {
    /// Serialize to canonical bytes for hashing.
    fn to_hash_bytes(&self) -> Vec<u8>;

    /// Compute the SHA-256 hash of the canonical bytes.
    fn hash(&self) -> Hash {
        Hash::compute(&self.to_hash_bytes())
    }
}

// ---------------------------------------------------------------------------
// Merkle root computation
// ---------------------------------------------------------------------------

/// Compute a merkle root from an ordered list of leaf hashes.
///
/// Each level hashes `left || right` over the hex text. A level with an odd
/// count pairs its last entry with itself, so a lone leaf still gets hashed
/// once. Returns the digest of the empty string for an empty list.
pub fn compute_merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return Hash::empty();
    }

    let mut current_level: Vec<Hash> = hashes.to_vec();

    loop {
        let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));
        for chunk in current_level.chunks(2) {
            let left = &chunk[0];
            let right = chunk.get(1).unwrap_or(left);
            let mut data = String::with_capacity(left.0.len() + right.0.len());
            data.push_str(&left.0);
            data.push_str(&right.0);
            next_level.push(Hash::compute(data.as_bytes()));
        }
        current_level = next_level;
        if current_level.len() == 1 {
            break;
        }
    }

    current_level.swap_remove(0)
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Return the current Unix timestamp in microseconds.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
