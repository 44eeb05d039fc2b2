//! VolyaChain CLI — command-line driver for the in-memory ledger simulation.
//!
//! Every invocation starts from a fresh chain with the default validator set;
//! nothing is persisted between runs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use volya_chain::consensus::{self, RngSource};
use volya_chain::{Address, ChainError, ChainParams, ChainState, Result};

/// Validators registered on every fresh chain, with their stakes.
const DEFAULT_VALIDATORS: [(&str, f64); 4] = [
    ("validator1", 1_000_000.0),
    ("validator2", 750_000.0),
    ("validator3", 500_000.0),
    (consensus::TREASURY_ADDRESS, 2_000_000.0),
];

#[derive(Parser)]
#[command(name = "volya")]
#[command(about = "VolyaChain CLI — proof-of-stake ledger simulation")]
#[command(version)]
struct Cli {
    /// TOML file overriding chain parameters
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    /// Seed for validator selection, for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a chain with the default validators and print its state
    Init,
    /// Run a scripted two-block demo
    Demo,
    /// Print chain summary
    Info,
    /// List registered validators and their stakes
    Validators,
    /// Submit a transfer, optionally producing a block with it
    Send {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value_t = 0.1)]
        fee: f64,
        /// Produce a block right after admission
        #[arg(long)]
        mine: bool,
    },
    /// Produce one block from the pending pool
    Mine {
        /// Producer address; drawn by stake when omitted
        #[arg(long)]
        validator: Option<String>,
    },
    /// Print the balance of an address
    Balance {
        #[arg(long)]
        address: String,
    },
    /// Print every included transaction touching an address, newest first
    History {
        #[arg(long)]
        address: String,
    },
    /// Check hash links, block hashes and merkle roots
    Validate,
    /// Print the whole ledger as JSON
    Export,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut state = create_chain(cli.params.as_deref(), cli.seed)?;

    match cli.command {
        Commands::Init => cmd_init(&state),
        Commands::Demo => cmd_demo(&mut state)?,
        Commands::Info => print_summary(&state),
        Commands::Validators => cmd_validators(&state),
        Commands::Send {
            from,
            to,
            amount,
            fee,
            mine,
        } => cmd_send(&mut state, from, to, amount, fee, mine)?,
        Commands::Mine { validator } => cmd_mine(&mut state, validator.map(Address::from)),
        Commands::Balance { address } => {
            let address = Address::from(address);
            println!("{address}: {:.8} UA", state.get_balance(&address));
        }
        Commands::History { address } => {
            let records = state.transaction_history(&Address::from(address));
            let json = serde_json::to_string_pretty(&records)
                .map_err(|e| ChainError::Serialization(e.to_string()))?;
            println!("{json}");
        }
        Commands::Validate => cmd_validate(&state),
        Commands::Export => println!("{}", state.to_json()?),
    }
    Ok(())
}

/// Build a fresh chain, register the default validators and seed their
/// balances with their stake (the treasury already holds the genesis mint).
fn create_chain(params: Option<&std::path::Path>, seed: Option<u64>) -> Result<ChainState> {
    let params = match params {
        Some(path) => ChainParams::from_file(path)?,
        None => ChainParams::default(),
    };
    let mut state = match seed {
        Some(seed) => ChainState::with_entropy(params, RngSource::seeded(seed))?,
        None => ChainState::with_params(params)?,
    };

    for (address, stake) in DEFAULT_VALIDATORS {
        state.add_validator(address, stake)?;
        if address != state.params().treasury.as_str() {
            state.fund(address, stake)?;
        }
    }
    info!(validators = state.validators().len(), "default validators registered");
    Ok(state)
}

fn cmd_init(state: &ChainState) {
    println!("=== VolyaChain — Chain Initialization ===\n");
    let genesis = &state.blocks()[0];
    println!("Genesis block: {}", genesis.hash);
    println!(
        "Treasury:      {} ({} UA)",
        state.params().treasury,
        state.get_balance(&state.params().treasury)
    );
    println!();
    print_summary(state);
    println!();
    cmd_validators(state);
    println!("\nRun `volya demo` to produce a few blocks.");
}

fn cmd_demo(state: &mut ChainState) -> Result<()> {
    println!("=== VolyaChain — Demo ===\n");
    let treasury = state.params().treasury.clone();

    println!("[Block 1] Treasury payouts...");
    state.submit_transaction(treasury.clone(), "user_alice", 10_000.0, 5.0)?;
    state.submit_transaction(treasury.clone(), "user_bob", 7_500.0, 5.0)?;
    state.submit_transaction(treasury, "validator1", 2_500.0, 5.0)?;
    let block = state.produce_block(None);
    println!(
        "  Produced by {} with {} transactions, hash {}",
        block.validator,
        block.len(),
        block.hash.short()
    );

    println!("\n[Block 2] User transfers...");
    state.submit_transaction("user_alice", "user_bob", 1_000.0, 2.0)?;
    state.submit_transaction("validator1", "user_alice", 500.0, 2.0)?;
    let block = state.produce_block(None);
    println!(
        "  Produced by {} with {} transactions, hash {}",
        block.validator,
        block.len(),
        block.hash.short()
    );

    println!("\n=== Balances ===");
    for name in ["user_alice", "user_bob", "validator1", "validator2", "validator3"] {
        let address = Address::from(name);
        println!("  {:<12} {:>16.2} UA", name, state.get_balance(&address));
    }

    println!("\n=== Chain Summary ===");
    print_summary(state);
    println!();
    cmd_validate(state);
    Ok(())
}

fn cmd_validators(state: &ChainState) {
    let total: f64 = state.validators().iter().map(|v| v.stake).sum();
    println!("Validators ({}):", state.validators().len());
    for v in state.validators() {
        let share = if total > 0.0 { v.stake / total * 100.0 } else { 0.0 };
        println!("  {:<14} stake {:>12.2}  ({share:.1}%)", v.address, v.stake);
    }
}

fn cmd_send(
    state: &mut ChainState,
    from: String,
    to: String,
    amount: f64,
    fee: f64,
    mine: bool,
) -> Result<()> {
    let tx = state.submit_transaction(from, to, amount, fee)?;
    println!("Transaction admitted: {}", tx.tx_id);
    println!("  {} -> {}: {} UA (fee {})", tx.sender, tx.receiver, tx.amount, tx.fee);

    if mine {
        cmd_mine(state, None);
        println!("  Sender balance:   {:.8} UA", state.get_balance(&tx.sender));
        println!("  Receiver balance: {:.8} UA", state.get_balance(&tx.receiver));
    } else {
        println!("  Pending transactions: {}", state.pending().len());
    }
    Ok(())
}

fn cmd_mine(state: &mut ChainState, validator: Option<Address>) {
    let block = state.produce_block(validator);
    println!("Block {} produced", state.blocks().len() - 1);
    println!("  Hash:         {}", block.hash);
    println!("  Validator:    {}", block.validator);
    println!("  Transactions: {}", block.len());
    println!("  Reward:       {} UA", block.block_reward);
}

fn cmd_validate(state: &ChainState) {
    match state.verify_chain() {
        Ok(()) => println!("Chain valid: {} blocks", state.blocks().len()),
        Err(fault) => println!("Chain INVALID: {fault}"),
    }
}

/// Print a summary of the chain state.
fn print_summary(state: &ChainState) {
    let summary = state.summary();
    println!("  Chain length:         {}", summary.chain_length);
    println!(
        "  Supply:               {} / {} UA",
        summary.current_supply, summary.max_supply
    );
    println!("  Block reward:         {} UA", summary.current_block_reward);
    println!("  Blocks until halving: {}", summary.blocks_until_halving);
    println!("  Validators:           {}", summary.validators);
    println!("  Pending transactions: {}", summary.pending_transactions);
}
