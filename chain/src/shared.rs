//! Thread-safe handle to a [`ChainState`].
//!
//! The ledger itself has no internal locking. `SharedChain` serializes every
//! call through one mutex, so admission and production from different
//! threads never interleave.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::block::Block;
use crate::error::{ChainFault, Result};
use crate::state::{ChainExport, ChainState, ChainSummary};
use crate::transaction::{Transaction, TransactionRecord};
use crate::types::Address;

/// Cloneable, lock-guarded handle to one ledger.
#[derive(Clone, Debug)]
pub struct SharedChain {
    inner: Arc<Mutex<ChainState>>,
}

impl SharedChain {
    pub fn new(state: ChainState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Run `f` with exclusive access to the ledger.
    pub fn with<T>(&self, f: impl FnOnce(&mut ChainState) -> T) -> T {
        f(&mut self.inner.lock())
    }

    pub fn add_validator(&self, address: impl Into<Address>, stake: f64) -> Result<()> {
        self.inner.lock().add_validator(address, stake)
    }

    pub fn fund(&self, address: impl Into<Address>, amount: f64) -> Result<()> {
        self.inner.lock().fund(address, amount)
    }

    pub fn submit_transaction(
        &self,
        sender: impl Into<Address>,
        receiver: impl Into<Address>,
        amount: f64,
        fee: f64,
    ) -> Result<Transaction> {
        self.inner.lock().submit_transaction(sender, receiver, amount, fee)
    }

    pub fn produce_block(&self, validator: Option<Address>) -> Block {
        self.inner.lock().produce_block(validator)
    }

    pub fn get_balance(&self, address: &Address) -> f64 {
        self.inner.lock().get_balance(address)
    }

    pub fn summary(&self) -> ChainSummary {
        self.inner.lock().summary()
    }

    pub fn validate_chain(&self) -> bool {
        self.inner.lock().validate_chain()
    }

    pub fn verify_chain(&self) -> std::result::Result<(), ChainFault> {
        self.inner.lock().verify_chain()
    }

    pub fn transaction_history(&self, address: &Address) -> Vec<TransactionRecord> {
        self.inner.lock().transaction_history(address)
    }

    pub fn export(&self) -> ChainExport {
        self.inner.lock().export()
    }
}

impl From<ChainState> for SharedChain {
    fn from(state: ChainState) -> Self {
        Self::new(state)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::consensus::ScriptedSource;
    use crate::params::ChainParams;

    fn shared() -> SharedChain {
        ChainState::with_entropy(ChainParams::default(), ScriptedSource::new([0.5]))
            .expect("valid params")
            .into()
    }

    #[test]
    fn test_concurrent_submissions_conserve_value() {
        let chain = shared();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let chain = chain.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        chain
                            .submit_transaction("ua_treasury", format!("user{i}"), 10.0, 1.0)
                            .expect("treasury can pay");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("submitter thread");
        }

        assert_eq!(chain.summary().pending_transactions, 200);
        let block = chain.produce_block(Some(Address::from("v1")));
        assert_eq!(block.len(), 201);

        assert_eq!(chain.get_balance(&Address::from("ua_treasury")), 10_000_000.0 - 2_200.0);
        assert_eq!(chain.get_balance(&Address::from("v1")), 200.0 + 10.0);
        for i in 0..8 {
            assert_eq!(chain.get_balance(&Address::from(format!("user{i}"))), 250.0);
        }
        assert!(chain.validate_chain());
    }

    #[test]
    fn test_interleaved_production_keeps_chain_linear() {
        let chain = shared();
        chain.add_validator("v1", 10.0).expect("stake");
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let chain = chain.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        chain.produce_block(None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer thread");
        }

        assert_eq!(chain.summary().chain_length, 21);
        assert!(chain.verify_chain().is_ok());
        assert_eq!(chain.with(|state| state.current_supply()), 10_000_200.0);
    }
}
