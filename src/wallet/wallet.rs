//! Owner wallets
//!
//! Holds an owner's key pair and signs multicall batches for the engine.

use crate::crypto::{KeyError, KeyPair};
use crate::multicall::{encode, Call};
use crate::multisig::{batch_message_hash, BatchRequest, EngineCall, EntryPoints};
use crate::Felt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Nothing to sign: batch is empty")]
    EmptyBatch,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// Serializable wallet data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct WalletData {
    private_key_hex: String,
    public_key: String,
    label: Option<String>,
}

/// An owner's signing wallet
pub struct Wallet {
    key_pair: KeyPair,
    /// Optional label for the wallet
    pub label: Option<String>,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: None,
        }
    }

    /// Create a wallet with a label
    pub fn with_label(label: &str) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: Some(label.to_string()),
        }
    }

    /// Import a wallet from a private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        let key_pair = KeyPair::from_private_key_hex(private_key_hex)?;
        Ok(Self {
            key_pair,
            label: None,
        })
    }

    /// Owner identity: compressed public key (hex)
    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Get the wallet's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    /// Build and sign a batch of engine operations
    ///
    /// The operations become self-addressed calls, packed with the
    /// multicall encoder; the signature covers the batch digest.
    pub fn sign_batch(
        &self,
        engine_address: Felt,
        entry_points: &EntryPoints,
        ops: &[EngineCall],
        nonce: u64,
    ) -> Result<BatchRequest, WalletError> {
        let digest = batch_message_hash(engine_address, entry_points, ops, nonce)
            .ok_or(WalletError::EmptyBatch)?;
        let calls: Vec<Call> = ops
            .iter()
            .map(|op| op.to_call(engine_address, entry_points))
            .collect();
        let (descriptors, calldata) = encode(&calls);

        Ok(BatchRequest {
            descriptors,
            calldata,
            nonce,
            signer: self.public_key(),
            signature: self.key_pair.sign_hex(&digest)?,
        })
    }

    /// Save wallet to file
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let data = WalletData {
            private_key_hex: self.private_key(),
            public_key: self.public_key(),
            label: self.label.clone(),
        };

        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load wallet from file
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let json = fs::read_to_string(path)?;
        let data: WalletData = serde_json::from_str(&json)?;

        let mut wallet = Self::from_private_key(&data.private_key_hex)?;
        wallet.label = data.label;
        Ok(wallet)
    }

    /// Export wallet info (without private key)
    pub fn export_public_info(&self) -> WalletInfo {
        WalletInfo {
            public_key: self.public_key(),
            label: self.label.clone(),
        }
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

/// Public wallet information (safe to share)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub public_key: String,
    pub label: Option<String>,
}

/// Wallet manager for handling multiple owner wallets
pub struct WalletManager {
    wallets_dir: std::path::PathBuf,
}

impl WalletManager {
    /// Create a new wallet manager
    pub fn new(wallets_dir: &Path) -> Result<Self, WalletError> {
        fs::create_dir_all(wallets_dir)?;
        Ok(Self {
            wallets_dir: wallets_dir.to_path_buf(),
        })
    }

    /// Create and save a new wallet
    pub fn create_wallet(&self, label: Option<&str>) -> Result<Wallet, WalletError> {
        let wallet = match label {
            Some(l) => Wallet::with_label(l),
            None => Wallet::new(),
        };

        wallet.save(&self.wallet_path(&wallet.public_key()))?;
        Ok(wallet)
    }

    /// List public info of all stored wallets
    pub fn list_wallets(&self) -> Result<Vec<WalletInfo>, WalletError> {
        let mut wallets = Vec::new();

        for entry in fs::read_dir(&self.wallets_dir)? {
            let path = entry?.path();

            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Wallet::load(&path) {
                    Ok(wallet) => wallets.push(wallet.export_public_info()),
                    Err(e) => log::warn!("Skipping unreadable wallet {:?}: {}", path, e),
                }
            }
        }

        wallets.sort_by(|a, b| a.public_key.cmp(&b.public_key));
        Ok(wallets)
    }

    /// Load a specific wallet by public key
    pub fn load_wallet(&self, public_key: &str) -> Result<Wallet, WalletError> {
        Wallet::load(&self.wallet_path(&public_key.to_lowercase()))
    }

    fn wallet_path(&self, public_key: &str) -> std::path::PathBuf {
        self.wallets_dir.join(format!("{}.json", public_key))
    }
}
