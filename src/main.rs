//! Quorum relay CLI application
//!
//! A command-line interface for operating a multisig ledger.

use clap::{Parser, Subcommand};
use quorum_relay::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quorum-relay")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A quorum-gated multisig transaction relay", long_about = None)]
struct Cli {
    /// Data directory for ledger storage
    #[arg(short, long, default_value = ".multisig_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new multisig ledger
    Init {
        /// Owner public keys (comma-separated hex)
        #[arg(short, long, value_delimiter = ',')]
        owners: Vec<String>,

        /// Confirmations required before execution
        #[arg(short, long)]
        threshold: Option<u8>,

        /// JSON config file with `threshold` and `owners`
        #[arg(short, long, conflicts_with_all = ["owners", "threshold"])]
        config: Option<PathBuf>,

        /// Optional label
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Owner wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Target contract operations
    Target {
        #[command(subcommand)]
        action: TargetCommands,
    },

    /// Submit a call for approval
    Submit {
        /// Signing owner's public key
        #[arg(short, long)]
        signer: String,

        /// Target address (decimal or 0x hex)
        #[arg(long)]
        to: String,

        /// Entry point name or selector
        #[arg(short, long)]
        entry_point: String,

        /// Calldata (comma-separated numbers)
        #[arg(long, default_value = "")]
        calldata: String,
    },

    /// Confirm a pending transaction
    Confirm {
        #[arg(short, long)]
        signer: String,

        #[arg(long)]
        tx: u64,
    },

    /// Revoke a confirmation
    Revoke {
        #[arg(short, long)]
        signer: String,

        #[arg(long)]
        tx: u64,
    },

    /// Execute a confirmed transaction
    Execute {
        #[arg(short, long)]
        signer: String,

        #[arg(long)]
        tx: u64,
    },

    /// Show one transaction
    Show {
        #[arg(long)]
        tx: u64,
    },

    /// List all transactions
    List,

    /// Display engine status
    Status,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a new owner wallet
    New {
        /// Optional label for the wallet
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List all wallets
    List,
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Deploy a balance contract
    Deploy {
        /// Starting balance
        #[arg(long, default_value = "0")]
        initial_balance: String,
    },

    /// Show a target's balance
    Balance {
        /// Target address
        #[arg(short, long)]
        address: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that run before a ledger exists
    match &cli.command {
        Commands::Init {
            owners,
            threshold,
            config,
            label,
        } => {
            return cli::cmd_init(
                &cli.data_dir,
                owners.clone(),
                *threshold,
                config.as_deref(),
                label.clone(),
            );
        }
        Commands::Wallet { action } => {
            return match action {
                WalletCommands::New { label } => cli::cmd_wallet_new(&cli.data_dir, label.as_deref()),
                WalletCommands::List => cli::cmd_wallet_list(&cli.data_dir),
            };
        }
        _ => {}
    }

    let mut state = AppState::load(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init { .. } | Commands::Wallet { .. } => unreachable!(),

        Commands::Target { action } => match action {
            TargetCommands::Deploy { initial_balance } => {
                cli::cmd_target_deploy(&mut state, cli::parse_felt(&initial_balance)?)?;
            }
            TargetCommands::Balance { address } => {
                cli::cmd_target_balance(&state, cli::parse_felt(&address)?)?;
            }
        },

        Commands::Submit {
            signer,
            to,
            entry_point,
            calldata,
        } => {
            let to = cli::parse_felt(&to)?;
            let calldata = cli::parse_felt_list(&calldata)?;
            cli::cmd_submit(&mut state, &signer, to, &entry_point, calldata)?;
        }

        Commands::Confirm { signer, tx } => {
            cli::cmd_confirm(&mut state, &signer, tx)?;
        }

        Commands::Revoke { signer, tx } => {
            cli::cmd_revoke(&mut state, &signer, tx)?;
        }

        Commands::Execute { signer, tx } => {
            cli::cmd_execute(&mut state, &signer, tx)?;
        }

        Commands::Show { tx } => {
            cli::cmd_show(&state, tx)?;
        }

        Commands::List => {
            cli::cmd_list(&state)?;
        }

        Commands::Status => {
            cli::cmd_status(&state)?;
        }
    }

    Ok(())
}
