//! Quorum-gated multisig transactions
//!
//! Owners submit calls to third-party targets; a call runs only after a
//! threshold of distinct owners has confirmed it. Every owner action is an
//! authorized, nonce-protected multicall batch.
//!
//! # Example
//!
//! ```rust
//! use quorum_relay::multicall::Call;
//! use quorum_relay::multisig::{EngineCall, MultisigConfig, MultisigEngine};
//! use quorum_relay::target::TargetRegistry;
//! use quorum_relay::crypto::selector_from_name;
//! use quorum_relay::wallet::Wallet;
//!
//! let owner = Wallet::new();
//! let config = MultisigConfig::new(1, vec![owner.public_key()], None).unwrap();
//! let mut engine = MultisigEngine::new(&config).unwrap();
//! let mut targets = TargetRegistry::new();
//! let target = targets.deploy("owner", 0);
//!
//! let ops = [
//!     EngineCall::Submit(Call::new(target, selector_from_name("set_balance"), vec![8])),
//!     EngineCall::Confirm(0),
//!     EngineCall::Execute(0),
//! ];
//! let request = owner
//!     .sign_batch(engine.address(), engine.entry_points(), &ops, engine.nonce())
//!     .unwrap();
//! engine.execute_batch(&request, &mut targets).unwrap();
//!
//! assert_eq!(targets.get(target).unwrap().balance, 8);
//! ```

pub mod auth;
pub mod engine;
pub mod error;
pub mod nonce;
pub mod owners;
pub mod transaction;

pub use auth::{authorize, index_message_hash, submit_message_hash, verify};
pub use engine::{
    batch_message_hash, BatchReceipt, BatchRequest, CallOutcome, EngineCall, EntryPoints,
    MultisigEngine,
};
pub use error::MultisigError;
pub use nonce::{NonceGuard, NonceReservation};
pub use owners::{MultisigConfig, OwnerRegistry};
pub use transaction::{EventKind, LedgerEvent, Transaction, TransactionRegistry, TxIndex, TxStatus};
