//! In-memory ledger engine for the VolyaChain simulation.
//!
//! Holds the chain, the pending pool, the validator table, balances and the
//! supply counters. All mutation goes through `&mut self`; wrap the state in
//! [`crate::shared::SharedChain`] when more than one caller needs it.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::consensus::{self, EntropySource, RngSource, ValidatorInfo};
use crate::error::{ChainError, ChainFault, Result};
use crate::params::{ChainParams, OverdraftPolicy};
use crate::transaction::{Transaction, TransactionRecord, TxKind};
use crate::types::{current_timestamp, Address, Hash};

// ---------------------------------------------------------------------------
// ChainState
// ---------------------------------------------------------------------------

/// The ledger: an append-only chain plus the balances it implies.
pub struct ChainState {
    blocks: Vec<Block>,
    pending: Vec<Transaction>,
    /// Registration order is selection order.
    validators: Vec<ValidatorInfo>,
    balances: HashMap<Address, f64>,
    current_supply: f64,
    /// Includes genesis, so the first produced block sees a count of 1.
    blocks_produced: u64,
    params: ChainParams,
    entropy: Box<dyn EntropySource>,
    /// Last timestamp handed out; every stamp is strictly greater.
    last_timestamp: u64,
}

impl std::fmt::Debug for ChainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainState")
            .field("blocks", &self.blocks.len())
            .field("pending", &self.pending.len())
            .field("validators", &self.validators.len())
            .field("accounts", &self.balances.len())
            .field("current_supply", &self.current_supply)
            .field("blocks_produced", &self.blocks_produced)
            .finish()
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainState {
    /// Create a chain with default parameters and OS-seeded validator draws.
    pub fn new() -> Self {
        Self::bootstrap(ChainParams::default(), Box::new(RngSource::from_entropy()))
    }

    /// Create a chain with custom parameters.
    pub fn with_params(params: ChainParams) -> Result<Self> {
        Self::with_entropy(params, RngSource::from_entropy())
    }

    /// Create a chain with custom parameters and a custom entropy source.
    pub fn with_entropy(
        params: ChainParams,
        entropy: impl EntropySource + 'static,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self::bootstrap(params, Box::new(entropy)))
    }

    /// Mint the genesis supply into the treasury. This is the only place a
    /// genesis transaction is created and it skips admission and production.
    fn bootstrap(params: ChainParams, entropy: Box<dyn EntropySource>) -> Self {
        let timestamp = current_timestamp();
        let mint = Transaction::system(
            Address::from(consensus::GENESIS_IDENTITY),
            params.treasury.clone(),
            params.genesis_supply,
            TxKind::Genesis,
            timestamp,
        );
        let genesis = Block::at(
            vec![mint],
            Hash::genesis_parent(),
            Address::from(consensus::GENESIS_IDENTITY),
            0.0,
            timestamp,
        );

        let mut balances = HashMap::new();
        balances.insert(Address::from(consensus::GENESIS_IDENTITY), 0.0);
        balances.insert(params.treasury.clone(), params.genesis_supply);

        info!(
            hash = %genesis.hash.short(),
            treasury = %params.treasury,
            supply = params.genesis_supply,
            "genesis block created"
        );

        Self {
            blocks: vec![genesis],
            pending: Vec::new(),
            validators: Vec::new(),
            balances,
            current_supply: params.genesis_supply,
            blocks_produced: 1,
            params,
            entropy,
            last_timestamp: timestamp,
        }
    }

    /// Wall-clock microseconds, bumped past the previous stamp when the clock
    /// has not advanced (or went backwards), so transaction ids stay unique.
    fn next_timestamp(&mut self) -> u64 {
        let timestamp = current_timestamp().max(self.last_timestamp.saturating_add(1));
        self.last_timestamp = timestamp;
        timestamp
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The most recently appended block (genesis on a fresh chain).
    pub fn latest_block(&self) -> &Block {
        // bootstrap always pushes genesis and blocks are never removed
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn validators(&self) -> &[ValidatorInfo] {
        &self.validators
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn current_supply(&self) -> f64 {
        self.current_supply
    }

    pub fn blocks_produced(&self) -> u64 {
        self.blocks_produced
    }

    /// Stake registered for `address`, if it is a validator.
    pub fn stake_of(&self, address: &Address) -> Option<f64> {
        self.validators
            .iter()
            .find(|v| &v.address == address)
            .map(|v| v.stake)
    }

    // -----------------------------------------------------------------------
    // Account helpers
    // -----------------------------------------------------------------------

    /// Get the balance of an address (0 if it has never been seen).
    pub fn get_balance(&self, address: &Address) -> f64 {
        self.balances.get(address).copied().unwrap_or(0.0)
    }

    fn balance_entry(&mut self, address: &Address) -> &mut f64 {
        self.balances.entry(address.clone()).or_insert(0.0)
    }

    /// Credit an address outside of any block. Seeds test and demo accounts;
    /// the amount is not counted against the supply.
    pub fn fund(&mut self, address: impl Into<Address>, amount: f64) -> Result<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ChainError::InvalidAmount {
                field: "amount",
                value: amount,
            });
        }
        let address = address.into();
        *self.balance_entry(&address) += amount;
        debug!(%address, amount, "account funded");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Validators
    // -----------------------------------------------------------------------

    /// Register a validator, or replace the stake of an existing one.
    pub fn add_validator(&mut self, address: impl Into<Address>, stake: f64) -> Result<()> {
        if !stake.is_finite() || stake <= 0.0 {
            return Err(ChainError::InvalidStake { stake });
        }
        let address = address.into();

        let others: f64 = self
            .validators
            .iter()
            .filter(|v| v.address != address)
            .map(|v| v.stake)
            .sum();
        if !(others + stake).is_finite() {
            return Err(ChainError::InvalidStake { stake });
        }

        match self.validators.iter_mut().find(|v| v.address == address) {
            Some(existing) => existing.stake = stake,
            None => self.validators.push(ValidatorInfo {
                address: address.clone(),
                stake,
            }),
        }
        self.balance_entry(&address);

        info!(%address, stake, "validator registered");
        Ok(())
    }

    /// Draw the next block producer, weighted by stake.
    pub fn select_validator(&mut self) -> Address {
        consensus::select_validator(&self.validators, self.entropy.as_mut())
    }

    // -----------------------------------------------------------------------
    // Emission
    // -----------------------------------------------------------------------

    /// Emission the next produced block would mint.
    pub fn current_block_reward(&self) -> f64 {
        consensus::block_reward(
            self.params.base_block_reward,
            self.params.halving_interval,
            self.blocks_produced,
        )
    }

    pub fn blocks_until_halving(&self) -> u64 {
        consensus::blocks_until_halving(self.params.halving_interval, self.blocks_produced)
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Admit a transfer into the pending pool.
    ///
    /// The sender must hold `amount + fee` right now. Other pending transfers
    /// from the same sender are not taken into account.
    pub fn submit_transaction(
        &mut self,
        sender: impl Into<Address>,
        receiver: impl Into<Address>,
        amount: f64,
        fee: f64,
    ) -> Result<Transaction> {
        let timestamp = self.next_timestamp();
        let tx = Transaction::at(sender, receiver, amount, fee, TxKind::Transfer, timestamp)?;

        let have = self.get_balance(&tx.sender);
        let need = tx.total_cost();
        if have < need {
            return Err(ChainError::InsufficientBalance {
                address: tx.sender.to_string(),
                have,
                need,
            });
        }

        debug!(
            tx_id = %tx.tx_id.short(),
            sender = %tx.sender,
            receiver = %tx.receiver,
            amount,
            fee,
            "transaction admitted"
        );
        self.pending.push(tx.clone());
        Ok(tx)
    }

    // -----------------------------------------------------------------------
    // Block production
    // -----------------------------------------------------------------------

    /// Produce one block from the whole pending pool.
    ///
    /// Uses `validator` when given, otherwise draws one. Appends a reward
    /// transaction unless it would push supply past the cap, applies every
    /// balance delta and appends the block.
    pub fn produce_block(&mut self, validator: Option<Address>) -> Block {
        let validator = match validator {
            Some(validator) => validator,
            None => self.select_validator(),
        };

        let mut transactions = std::mem::take(&mut self.pending);
        if self.params.overdraft_policy == OverdraftPolicy::Defer {
            let (included, deferred) = self.split_affordable(transactions, &validator);
            if !deferred.is_empty() {
                warn!(count = deferred.len(), "transfers deferred: sender would overdraw");
            }
            self.pending = deferred;
            transactions = included;
        }

        let scheduled = self.current_block_reward();
        let mut minted = 0.0;
        if scheduled <= 0.0 {
            debug!("emission schedule exhausted, block carries no reward");
        } else if self.current_supply + scheduled <= self.params.max_supply {
            let timestamp = self.next_timestamp();
            transactions.push(Transaction::system(
                Address::from(consensus::SYSTEM_SENDER),
                validator.clone(),
                scheduled,
                TxKind::BlockReward,
                timestamp,
            ));
            self.current_supply += scheduled;
            minted = scheduled;
        } else {
            warn!(
                current_supply = self.current_supply,
                reward = scheduled,
                max_supply = self.params.max_supply,
                "supply cap reached, block carries no reward"
            );
        }

        let previous_hash = self.latest_block().hash.clone();
        let timestamp = self.next_timestamp();
        let block = Block::at(transactions, previous_hash, validator, minted, timestamp);

        self.apply_block(&block);
        self.blocks.push(block.clone());
        self.blocks_produced += 1;

        info!(
            height = self.blocks.len() - 1,
            hash = %block.hash.short(),
            validator = %block.validator,
            transactions = block.len(),
            "block produced"
        );
        block
    }

    /// Split a pool snapshot into transfers that stay solvent when applied in
    /// order and transfers that would overdraw their sender.
    fn split_affordable(
        &self,
        transactions: Vec<Transaction>,
        validator: &Address,
    ) -> (Vec<Transaction>, Vec<Transaction>) {
        let mut projected: HashMap<&Address, f64> = HashMap::new();
        let mut included = Vec::with_capacity(transactions.len());
        let mut deferred = Vec::new();

        for tx in &transactions {
            let available = *projected
                .entry(&tx.sender)
                .or_insert_with(|| self.get_balance(&tx.sender));
            if tx.tx_type == TxKind::Transfer && available < tx.total_cost() {
                deferred.push(tx.clone());
                continue;
            }
            if tx.tx_type == TxKind::Transfer {
                *projected.entry(&tx.sender).or_insert(0.0) -= tx.total_cost();
                *projected
                    .entry(&tx.receiver)
                    .or_insert_with(|| self.get_balance(&tx.receiver)) += tx.amount;
                *projected
                    .entry(validator)
                    .or_insert_with(|| self.get_balance(validator)) += tx.fee;
            }
            included.push(tx.clone());
        }

        (included, deferred)
    }

    /// Apply the balance deltas of a freshly built block.
    fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.balance_entry(&tx.sender);
            self.balance_entry(&tx.receiver);

            match tx.tx_type {
                // Minted at bootstrap.
                TxKind::Genesis => {}
                TxKind::BlockReward => {
                    *self.balance_entry(&tx.receiver) += tx.amount;
                }
                TxKind::Transfer => {
                    let sender = self.balance_entry(&tx.sender);
                    *sender -= tx.total_cost();
                    if *sender < 0.0 {
                        warn!(
                            address = %tx.sender,
                            balance = *sender,
                            tx_id = %tx.tx_id.short(),
                            "balance went negative"
                        );
                    }
                    *self.balance_entry(&tx.receiver) += tx.amount;
                    *self.balance_entry(&block.validator) += tx.fee;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Whether every block links to its predecessor and matches its own hash.
    pub fn validate_chain(&self) -> bool {
        self.verify_chain().is_ok()
    }

    /// Walk the chain from genesis and report the first integrity fault.
    pub fn verify_chain(&self) -> std::result::Result<(), ChainFault> {
        for (index, block) in self.blocks.iter().enumerate() {
            if index > 0 {
                let previous = &self.blocks[index - 1];
                if block.previous_hash != previous.hash {
                    return Err(ChainFault::BrokenLink {
                        index,
                        expected: previous.hash.to_string(),
                        found: block.previous_hash.to_string(),
                    });
                }
            }

            let computed = block.compute_hash();
            if computed != block.hash {
                return Err(ChainFault::HashMismatch {
                    index,
                    stored: block.hash.to_string(),
                    computed: computed.to_string(),
                });
            }

            let root = block.compute_merkle_root();
            if root != block.merkle_root {
                return Err(ChainFault::MerkleMismatch {
                    index,
                    stored: block.merkle_root.to_string(),
                    computed: root.to_string(),
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Every included transaction touching `address`, newest first.
    pub fn transaction_history(&self, address: &Address) -> Vec<TransactionRecord> {
        let mut records: Vec<TransactionRecord> = self
            .blocks
            .iter()
            .rev()
            .flat_map(|block| {
                block
                    .transactions
                    .iter()
                    .rev()
                    .filter(|tx| tx.involves(address))
                    .map(move |tx| TransactionRecord {
                        transaction: tx.clone(),
                        block_hash: block.hash.clone(),
                        block_timestamp: block.timestamp,
                    })
            })
            .collect();
        // Stable, so equal timestamps keep the later chain position first.
        records.sort_by(|a, b| b.transaction.timestamp.cmp(&a.transaction.timestamp));
        records
    }

    /// Look up an included transaction by identifier.
    pub fn find_transaction(&self, tx_id: &Hash) -> Option<TransactionRecord> {
        self.blocks.iter().find_map(|block| {
            block
                .transactions
                .iter()
                .find(|tx| &tx.tx_id == tx_id)
                .map(|tx| TransactionRecord {
                    transaction: tx.clone(),
                    block_hash: block.hash.clone(),
                    block_timestamp: block.timestamp,
                })
        })
    }

    /// Counts and supply figures for display.
    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            chain_length: self.blocks.len(),
            current_supply: self.current_supply,
            max_supply: self.params.max_supply,
            pending_transactions: self.pending.len(),
            validators: self.validators.len(),
            current_block_reward: self.current_block_reward(),
            blocks_until_halving: self.blocks_until_halving(),
        }
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Structured snapshot of the whole ledger.
    pub fn export(&self) -> ChainExport {
        ChainExport {
            chain: self.blocks.clone(),
            validators: self
                .validators
                .iter()
                .map(|v| (v.address.clone(), v.stake))
                .collect(),
            balances: self
                .balances
                .iter()
                .map(|(address, balance)| (address.clone(), *balance))
                .collect(),
            chain_info: self.summary(),
        }
    }

    /// The export snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export())
            .map_err(|e| ChainError::Serialization(e.to_string()))
    }
}

/// Summary of chain state for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub chain_length: usize,
    pub current_supply: f64,
    pub max_supply: f64,
    pub pending_transactions: usize,
    pub validators: usize,
    pub current_block_reward: f64,
    pub blocks_until_halving: u64,
}

/// Full ledger snapshot, shaped for JSON export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainExport {
    pub chain: Vec<Block>,
    pub validators: BTreeMap<Address, f64>,
    pub balances: BTreeMap<Address, f64>,
    pub chain_info: ChainSummary,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
