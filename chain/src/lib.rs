//! VolyaChain — a single-process proof-of-stake ledger simulation.
//!
//! This crate implements an append-only chain of hash-linked blocks carrying
//! unsigned transfer transactions, a halving emission schedule bounded by a
//! supply cap, stake-weighted block producer selection and in-memory balance
//! bookkeeping. There is no networking, persistence or signature scheme.

pub mod block;
pub mod consensus;
pub mod error;
pub mod params;
pub mod shared;
pub mod state;
pub mod transaction;
pub mod types;

pub use block::Block;
pub use error::{ChainError, ChainFault, Result};
pub use params::{ChainParams, OverdraftPolicy};
pub use shared::SharedChain;
pub use state::{ChainExport, ChainState, ChainSummary};
pub use transaction::{Transaction, TransactionRecord, TxKind};
pub use types::{Address, Hash};
