//! Integration tests for the VolyaChain ledger: end-to-end scenarios.

use proptest::prelude::*;

use volya_chain::consensus::{self, RngSource, ScriptedSource};
use volya_chain::types::compute_merkle_root;
use volya_chain::{
    Address, ChainError, ChainParams, ChainState, Hash, OverdraftPolicy, TxKind,
};

/// A chain with default parameters whose validator draws replay `fractions`.
fn setup(fractions: &[f64]) -> ChainState {
    ChainState::with_entropy(
        ChainParams::default(),
        ScriptedSource::new(fractions.iter().copied()),
    )
    .expect("default params are valid")
}

fn addr(s: &str) -> Address {
    Address::from(s)
}

// ---------------------------------------------------------------------------
// Test: Reference scenario
// ---------------------------------------------------------------------------

#[test]
fn test_treasury_transfer_scenario() {
    let mut state = setup(&[0.0]);
    assert_eq!(state.get_balance(&addr("ua_treasury")), 10_000_000.0);

    state.add_validator("v1", 100.0).expect("stake");
    state.fund("v1", 100.0).expect("fund");

    state
        .submit_transaction("ua_treasury", "alice", 1_000.0, 1.0)
        .expect("treasury covers amount + fee");
    let block = state.produce_block(Some(addr("v1")));

    assert_eq!(block.validator, "v1");
    assert_eq!(state.get_balance(&addr("alice")), 1_000.0);
    assert_eq!(state.get_balance(&addr("ua_treasury")), 10_000_000.0 - 1_001.0);
    assert_eq!(state.get_balance(&addr("v1")), 111.0);
    assert_eq!(state.blocks().len(), 2);
    assert!(state.validate_chain());
}

// ---------------------------------------------------------------------------
// Test: Multi-block demo run
// ---------------------------------------------------------------------------

#[test]
fn test_two_block_demo_run() {
    // Draws land on alice first, then ua_foundation.
    let mut state = setup(&[0.1, 0.99]);
    let validators = [
        ("validator_alice", 1_500_000.0),
        ("validator_bob", 1_200_000.0),
        ("validator_carol", 800_000.0),
        ("ua_foundation", 2_500_000.0),
    ];
    for (validator, stake) in validators {
        state.add_validator(validator, stake).expect("stake");
        state.fund(validator, stake).expect("fund");
    }

    state.submit_transaction("ua_treasury", "user_alice", 10_000.0, 5.0).expect("tx1");
    state.submit_transaction("ua_treasury", "user_bob", 7_500.0, 5.0).expect("tx2");
    state.submit_transaction("ua_treasury", "validator_alice", 2_500.0, 5.0).expect("tx3");

    let block1 = state.produce_block(None);
    assert_eq!(block1.validator, "validator_alice");
    assert_eq!(block1.len(), 4);
    assert_eq!(state.get_balance(&addr("user_alice")), 10_000.0);
    assert_eq!(
        state.get_balance(&addr("validator_alice")),
        1_500_000.0 + 2_500.0 + 15.0 + 10.0
    );

    state.submit_transaction("user_alice", "user_bob", 1_000.0, 2.0).expect("tx4");
    state.submit_transaction("validator_alice", "user_alice", 500.0, 2.0).expect("tx5");

    let block2 = state.produce_block(None);
    assert_eq!(block2.validator, "ua_foundation");
    assert_eq!(block2.previous_hash, block1.hash);
    assert_eq!(state.get_balance(&addr("user_alice")), 10_000.0 - 1_002.0 + 500.0);
    assert_eq!(state.get_balance(&addr("user_bob")), 7_500.0 + 1_000.0);
    assert_eq!(state.get_balance(&addr("ua_foundation")), 2_500_000.0 + 4.0 + 10.0);

    let summary = state.summary();
    assert_eq!(summary.chain_length, 3);
    assert_eq!(summary.current_supply, 10_000_020.0);
    assert_eq!(summary.validators, 4);
    assert_eq!(summary.pending_transactions, 0);
    assert!(state.validate_chain());

    let history = state.transaction_history(&addr("user_alice"));
    assert_eq!(history.len(), 3);
    assert!(history
        .windows(2)
        .all(|w| w[0].transaction.timestamp >= w[1].transaction.timestamp));
}

// ---------------------------------------------------------------------------
// Test: Genesis and hash stability
// ---------------------------------------------------------------------------

#[test]
fn test_fresh_chain_has_single_genesis_block() {
    let state = ChainState::new();
    let blocks = state.blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].previous_hash, Hash::genesis_parent());
    assert_eq!(blocks[0].transactions.len(), 1);
    assert_eq!(blocks[0].transactions[0].tx_type, TxKind::Genesis);
    assert_eq!(state.current_supply(), consensus::GENESIS_SUPPLY);

    let id = &blocks[0].transactions[0].tx_id;
    assert_eq!(blocks[0].merkle_root, Hash::compute(format!("{id}{id}").as_bytes()));
}

#[test]
fn test_every_block_hash_recomputes() {
    let mut state = setup(&[0.3, 0.7]);
    state.add_validator("a", 1.0).expect("stake");
    state.add_validator("b", 1.0).expect("stake");
    for round in 0..10 {
        state
            .submit_transaction("ua_treasury", format!("user{round}"), 1.0 + round as f64, 0.25)
            .expect("admit");
        state.produce_block(None);
    }

    for (i, block) in state.blocks().iter().enumerate() {
        assert_eq!(block.compute_hash(), block.hash, "block {i}");
        assert!(block.verify_merkle_root(), "block {i}");
        if i > 0 {
            assert_eq!(block.previous_hash, state.blocks()[i - 1].hash);
        }
    }
    assert!(state.verify_chain().is_ok());
}

#[test]
fn test_export_roundtrip_keeps_hashes_valid() {
    let mut state = setup(&[0.0]);
    state.add_validator("v1", 5.0).expect("stake");
    state.submit_transaction("ua_treasury", "alice", 12.5, 0.5).expect("admit");
    state.produce_block(None);

    let json = state.to_json().expect("export");
    let export: volya_chain::ChainExport = serde_json::from_str(&json).expect("parse");
    assert_eq!(export.chain.len(), 2);
    assert!(export.chain.iter().all(|block| block.verify_hash()));
    assert_eq!(export.balances[&addr("alice")], 12.5);
    assert_eq!(export.chain_info, state.summary());
}

// ---------------------------------------------------------------------------
// Test: Admission failures
// ---------------------------------------------------------------------------

#[test]
fn test_insufficient_balance_changes_nothing() {
    let mut state = setup(&[0.0]);
    state.fund("alice", 50.0).expect("fund");
    let before = state.export();

    let err = state.submit_transaction("alice", "bob", 50.0, 0.01).unwrap_err();
    assert!(matches!(err, ChainError::InsufficientBalance { .. }));
    assert_eq!(state.export(), before);
}

#[test]
fn test_invalid_stake_rejected() {
    let mut state = setup(&[0.0]);
    assert!(matches!(
        state.add_validator("v1", 0.0),
        Err(ChainError::InvalidStake { .. })
    ));
    assert_eq!(state.summary().validators, 0);
}

// ---------------------------------------------------------------------------
// Test: Overdraft policies
// ---------------------------------------------------------------------------

#[test]
fn test_defer_policy_never_overdraws() {
    let params = ChainParams {
        overdraft_policy: OverdraftPolicy::Defer,
        ..ChainParams::default()
    };
    let mut state = ChainState::with_entropy(params, RngSource::seeded(11)).expect("params");
    state.fund("alice", 30.0).expect("fund");
    for _ in 0..3 {
        state.submit_transaction("alice", "bob", 20.0, 1.0).expect("admitted against 30");
    }

    state.produce_block(Some(addr("v1")));
    assert_eq!(state.get_balance(&addr("alice")), 9.0);
    assert_eq!(state.pending().len(), 2);

    state.produce_block(Some(addr("v1")));
    assert_eq!(state.pending().len(), 2, "still unaffordable");
    assert!(state.get_balance(&addr("alice")) >= 0.0);
}

// ---------------------------------------------------------------------------
// Test: Supply cap over a long run
// ---------------------------------------------------------------------------

#[test]
fn test_supply_cap_reached_then_silent() {
    let params = ChainParams {
        max_supply: 10_000_050.0,
        halving_interval: 4,
        ..ChainParams::default()
    };
    let mut state = ChainState::with_entropy(params, ScriptedSource::default()).expect("params");

    let mut rewards = 0;
    for _ in 0..200 {
        let block = state.produce_block(None);
        if block.transactions.iter().any(|tx| tx.tx_type == TxKind::BlockReward) {
            rewards += 1;
        }
        assert!(state.current_supply() <= 10_000_050.0);
    }
    // Three blocks at 10 and four at 5 land exactly on the cap; nothing after.
    assert_eq!(rewards, 7);
    assert_eq!(state.current_supply(), 10_000_050.0);
    assert_eq!(state.get_balance(&addr("genesis")), 50.0);
    assert_eq!(state.blocks().len(), 201);
    let recorded: f64 = state.blocks().iter().map(|block| block.block_reward).sum();
    assert_eq!(recorded, 50.0);
    assert!(state.validate_chain());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    /// Property: the reward at block count k is the base reward halved once
    /// per completed interval.
    #[test]
    fn prop_halving_schedule(k in 0u64..100_000, interval in 1u64..5_000) {
        let reward = consensus::block_reward(10.0, interval, k);
        let halved = 10.0 / 2f64.powi((k / interval) as i32);
        let expected = if halved < consensus::MIN_BLOCK_REWARD { 0.0 } else { halved };
        prop_assert_eq!(reward, expected);
        prop_assert!(reward <= consensus::block_reward(10.0, interval, 0));
    }

    /// Property: merkle roots are a pure function of the ordered leaves.
    #[test]
    fn prop_merkle_root_deterministic(leaves in prop::collection::vec(any::<u64>(), 1..40)) {
        let hashes: Vec<Hash> = leaves.iter().map(|l| Hash::compute(&l.to_le_bytes())).collect();
        prop_assert_eq!(compute_merkle_root(&hashes), compute_merkle_root(&hashes));
    }

    /// Property: production never pushes supply past the cap, whatever the cap.
    #[test]
    fn prop_supply_never_exceeds_cap(headroom in 0.0f64..100.0, blocks in 1usize..60) {
        let params = ChainParams {
            max_supply: consensus::GENESIS_SUPPLY + headroom,
            halving_interval: 7,
            ..ChainParams::default()
        };
        let mut state = ChainState::with_entropy(params, ScriptedSource::default())
            .expect("params");
        for _ in 0..blocks {
            state.produce_block(None);
            prop_assert!(state.current_supply() <= state.params().max_supply);
        }
    }

    /// Property: an included transfer moves exactly amount, fee and reward.
    #[test]
    fn prop_transfer_conserves_value(balance in 1u32..1_000_000, amount_pct in 0u32..=90, fee_pct in 0u32..=10) {
        let balance = balance as f64;
        let amount = (balance * amount_pct as f64 / 100.0).floor();
        let fee = (balance * fee_pct as f64 / 100.0).floor();

        let mut state = setup(&[0.0]);
        state.fund("sender", balance).expect("fund");
        state.submit_transaction("sender", "receiver", amount, fee).expect("affordable");
        state.produce_block(Some(addr("validator")));

        prop_assert_eq!(state.get_balance(&addr("sender")), balance - amount - fee);
        prop_assert_eq!(state.get_balance(&addr("receiver")), amount);
        prop_assert_eq!(state.get_balance(&addr("validator")), fee + 10.0);
    }
}
