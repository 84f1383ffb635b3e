//! CLI commands for the multisig relay
//!
//! Implements all command handlers for the CLI interface.

use crate::crypto::selector_from_name;
use crate::multicall::Call;
use crate::multisig::{
    BatchReceipt, CallOutcome, EngineCall, MultisigConfig, MultisigEngine, Transaction, TxIndex,
};
use crate::storage::{Storage, StorageConfig};
use crate::target::TargetRegistry;
use crate::wallet::WalletManager;
use crate::Felt;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub engine: MultisigEngine,
    pub targets: TargetRegistry,
    pub storage: Storage,
    pub wallet_manager: WalletManager,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load application state from an initialized data directory
    pub fn load(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;

        if !storage.ledger_exists() {
            return Err(format!(
                "no ledger in {:?}; run `quorum-relay init` first",
                data_dir
            )
            .into());
        }

        log::debug!("Loading ledger from {:?}", data_dir);
        let engine = storage.load_ledger()?;
        let targets = storage.load_targets()?;
        let wallet_manager = WalletManager::new(&data_dir.join("wallets"))?;

        Ok(Self {
            engine,
            targets,
            storage,
            wallet_manager,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save_ledger(&self.engine)?;
        self.storage.save_targets(&self.targets)?;
        Ok(())
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(config)?)
}

/// Parse a felt given as decimal or `0x` hex
pub fn parse_felt(value: &str) -> CliResult<Felt> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => Felt::from_str_radix(hex, 16),
        None => value.parse::<Felt>(),
    };
    parsed.map_err(|e| format!("invalid number {:?}: {}", value, e).into())
}

/// Parse a comma-separated felt list; empty input is an empty list
pub fn parse_felt_list(value: &str) -> CliResult<Vec<Felt>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_felt)
        .collect()
}

/// Entry point given as a number or as a name
pub fn parse_selector(value: &str) -> Felt {
    parse_felt(value).unwrap_or_else(|_| selector_from_name(value))
}

/// Initialize a new multisig ledger
pub fn cmd_init(
    data_dir: &Path,
    owners: Vec<String>,
    threshold: Option<u8>,
    config_file: Option<&Path>,
    label: Option<String>,
) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.ledger_exists() {
        println!("⚠️  Ledger already exists at {:?}", data_dir);
        return Ok(());
    }

    let config = match config_file {
        Some(path) => MultisigConfig::load(path)?,
        None => {
            let threshold = threshold.ok_or("--threshold is required without --config")?;
            MultisigConfig::new(threshold, owners, label)?
        }
    };

    let engine = MultisigEngine::new(&config)?;
    storage.save_ledger(&engine)?;
    storage.save_targets(&TargetRegistry::new())?;

    println!("✅ Multisig initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   📍 Engine address: 0x{:x}", engine.address());
    println!("   🔐 Policy: {}", config.description());

    Ok(())
}

/// Create a new owner wallet
pub fn cmd_wallet_new(data_dir: &Path, label: Option<&str>) -> CliResult<()> {
    let manager = WalletManager::new(&data_dir.join("wallets"))?;
    let wallet = manager.create_wallet(label)?;

    println!("🔐 New owner wallet created!");
    println!("   🔑 Public Key: {}", wallet.public_key());
    if let Some(l) = &wallet.label {
        println!("   🏷️  Label: {}", l);
    }
    println!("\n   ⚠️  IMPORTANT: The private key is stored in the wallets directory.");

    Ok(())
}

/// List owner wallets
pub fn cmd_wallet_list(data_dir: &Path) -> CliResult<()> {
    let manager = WalletManager::new(&data_dir.join("wallets"))?;
    let wallets = manager.list_wallets()?;

    if wallets.is_empty() {
        println!("📭 No wallets found. Create one with: quorum-relay wallet new");
        return Ok(());
    }

    println!("📋 Wallets:");
    for info in &wallets {
        println!("   {} ({})", info.public_key, info.label.as_deref().unwrap_or("-"));
    }

    Ok(())
}

/// Deploy a balance contract target
pub fn cmd_target_deploy(state: &mut AppState, initial_balance: Felt) -> CliResult<()> {
    let deployer = format!("0x{:x}", state.engine.address());
    let address = state.targets.deploy(&deployer, initial_balance);
    state.save()?;

    println!("📦 Target deployed at 0x{:x}", address);
    Ok(())
}

/// Show a target's balance
pub fn cmd_target_balance(state: &AppState, address: Felt) -> CliResult<()> {
    let contract = state
        .targets
        .get(address)
        .ok_or_else(|| format!("no target at 0x{:x}", address))?;

    println!("💰 Target 0x{:x}", contract.address);
    println!("   Balance: {}", contract.balance);
    println!("   Array sum: {}", contract.array_sum);
    println!("   Writes: {}", contract.writes);
    Ok(())
}

/// Sign one batch with a stored owner wallet and apply it
pub fn run_batch(state: &mut AppState, signer: &str, ops: &[EngineCall]) -> CliResult<BatchReceipt> {
    let wallet = state.wallet_manager.load_wallet(signer)?;
    let request = wallet.sign_batch(
        state.engine.address(),
        state.engine.entry_points(),
        ops,
        state.engine.nonce(),
    )?;

    match state.engine.execute_batch(&request, &mut state.targets) {
        Ok(receipt) => {
            state.save()?;
            Ok(receipt)
        }
        // Nonce advanced, so the batch left durable effects
        Err(err) if state.engine.nonce() != request.nonce => {
            state.save()?;
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

fn print_receipt(receipt: &BatchReceipt) {
    println!("✅ Batch applied (nonce {})", receipt.nonce);
    for outcome in &receipt.outcomes {
        match outcome {
            CallOutcome::Submitted { tx_index } => {
                println!("   └─ Submitted transaction {}", tx_index)
            }
            CallOutcome::Confirmed {
                tx_index,
                confirmations,
            } => println!(
                "   └─ Confirmed transaction {} ({} confirmation(s))",
                tx_index, confirmations
            ),
            CallOutcome::Revoked {
                tx_index,
                confirmations,
            } => println!(
                "   └─ Revoked confirmation on {} ({} left)",
                tx_index, confirmations
            ),
            CallOutcome::Executed { tx_index, output } => {
                println!("   └─ Executed transaction {} -> {:?}", tx_index, output)
            }
        }
    }
}

/// Submit a call to a target
pub fn cmd_submit(
    state: &mut AppState,
    signer: &str,
    to: Felt,
    entry_point: &str,
    calldata: Vec<Felt>,
) -> CliResult<()> {
    let call = Call::new(to, parse_selector(entry_point), calldata);
    let receipt = run_batch(state, signer, &[EngineCall::Submit(call)])?;
    print_receipt(&receipt);
    Ok(())
}

/// Confirm a pending transaction
pub fn cmd_confirm(state: &mut AppState, signer: &str, tx_index: TxIndex) -> CliResult<()> {
    let receipt = run_batch(state, signer, &[EngineCall::Confirm(tx_index)])?;
    print_receipt(&receipt);
    Ok(())
}

/// Revoke an earlier confirmation
pub fn cmd_revoke(state: &mut AppState, signer: &str, tx_index: TxIndex) -> CliResult<()> {
    let receipt = run_batch(state, signer, &[EngineCall::Revoke(tx_index)])?;
    print_receipt(&receipt);
    Ok(())
}

/// Execute a sufficiently confirmed transaction
pub fn cmd_execute(state: &mut AppState, signer: &str, tx_index: TxIndex) -> CliResult<()> {
    let receipt = run_batch(state, signer, &[EngineCall::Execute(tx_index)])?;
    print_receipt(&receipt);
    Ok(())
}

fn print_transaction(tx: &Transaction, threshold: u8) {
    let status = if tx.executed { "executed" } else { "pending" };
    println!(
        "   #{} -> 0x{:x} selector 0x{:x} [{}] {}/{} confirmations",
        tx.index,
        tx.to,
        tx.selector,
        status,
        tx.num_confirmations(),
        threshold
    );
}

/// Show one transaction in detail
pub fn cmd_show(state: &AppState, tx_index: TxIndex) -> CliResult<()> {
    let tx = state.engine.transaction(tx_index)?;

    println!("📄 Transaction {}", tx.index);
    print_transaction(tx, state.engine.threshold());
    println!("   Calldata: {:?}", tx.calldata);
    println!("   Submitted by {} at {}", tx.submitted_by, tx.submitted_at);
    if let Some(at) = tx.executed_at {
        println!("   Executed at {}", at);
    }
    for owner in &tx.confirmations {
        println!("   ✔ {}", owner);
    }

    Ok(())
}

/// List all transactions
pub fn cmd_list(state: &AppState) -> CliResult<()> {
    let transactions = state.engine.transactions();

    if transactions.is_empty() {
        println!("📭 No transactions yet");
        return Ok(());
    }

    println!("📋 Transactions:");
    for tx in transactions {
        print_transaction(tx, state.engine.threshold());
    }

    Ok(())
}

/// Display engine status
pub fn cmd_status(state: &AppState) -> CliResult<()> {
    let engine = &state.engine;
    let stats = state.storage.stats()?;

    println!("🔐 Multisig 0x{:x}", engine.address());
    if let Some(label) = engine.label() {
        println!("   🏷️  Label: {}", label);
    }
    println!("   Threshold: {}-of-{}", engine.threshold(), engine.owners().len());
    println!("   Next nonce: {}", engine.nonce());
    println!("   Transactions: {}", engine.transactions_len());
    println!("   Targets: {}", state.targets.len());
    println!("   Created: {}", engine.created_at());
    println!("   Ledger size: {} bytes ({} backups)", stats.file_size, stats.backup_count);
    for owner in engine.owners() {
        println!("   👤 {}", owner);
    }

    Ok(())
}
