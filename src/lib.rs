//! Quorum Relay: a quorum-gated multisig transaction relay in Rust
//!
//! This crate provides a multisig account featuring:
//! - M-of-N owner confirmation before any call reaches its target
//! - ECDSA authorization (secp256k1) bound to the exact call content
//! - Nonce-based replay protection with rollback on failed batches
//! - Multicall batches: many calls, one signature, one shared calldata buffer
//! - JSON persistence of the ledger with backups
//!
//! # Example
//!
//! ```rust
//! use quorum_relay::multisig::{EngineCall, MultisigConfig, MultisigEngine};
//! use quorum_relay::target::TargetRegistry;
//! use quorum_relay::wallet::Wallet;
//! use quorum_relay::multicall::Call;
//! use quorum_relay::crypto::selector_from_name;
//!
//! // A 1-of-1 multisig
//! let owner = Wallet::new();
//! let config = MultisigConfig::new(1, vec![owner.public_key()], None).unwrap();
//! let mut engine = MultisigEngine::new(&config).unwrap();
//!
//! // A target to call
//! let mut targets = TargetRegistry::new();
//! let target = targets.deploy("deployer", 0);
//!
//! // Submit a call to it
//! let submit = EngineCall::Submit(Call::new(target, selector_from_name("set_balance"), vec![8]));
//! let request = owner
//!     .sign_batch(engine.address(), engine.entry_points(), &[submit], engine.nonce())
//!     .unwrap();
//! engine.execute_batch(&request, &mut targets).unwrap();
//!
//! assert_eq!(engine.transactions_len(), 1);
//! assert_eq!(engine.nonce(), 1);
//! ```

pub mod cli;
pub mod crypto;
pub mod multicall;
pub mod multisig;
pub mod storage;
pub mod target;
pub mod wallet;

/// Integer domain of addresses, selectors and calldata words
pub type Felt = u128;

// Re-export commonly used types
pub use crypto::KeyPair;
pub use multicall::{Call, CallDescriptor};
pub use multisig::{
    BatchReceipt, BatchRequest, EngineCall, MultisigConfig, MultisigEngine, MultisigError,
    OwnerRegistry, TransactionRegistry,
};
pub use storage::{Storage, StorageConfig};
pub use target::{CallDispatcher, TargetRegistry};
pub use wallet::Wallet;
