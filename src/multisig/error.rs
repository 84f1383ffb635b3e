//! Errors raised by the multisig engine

use thiserror::Error;

use crate::multicall::MulticallError;
use crate::target::TargetError;
use crate::Felt;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Authorization failed: {0}")]
    Auth(String),
    #[error("Invalid nonce: expected {expected}, got {presented}")]
    Nonce { expected: u64, presented: u64 },
    #[error("Transaction not found: {0}")]
    NotFound(u64),
    #[error("Transaction {0} already executed")]
    AlreadyExecuted(u64),
    #[error("Transaction {tx_index} already confirmed by {owner}")]
    AlreadyConfirmed { tx_index: u64, owner: String },
    #[error("Transaction {tx_index} not confirmed by {owner}")]
    NotConfirmed { tx_index: u64, owner: String },
    #[error("Insufficient confirmations for transaction {tx_index}: have {have}, need {need}")]
    InsufficientConfirmations { tx_index: u64, have: usize, need: u8 },
    #[error("Malformed multicall: {0}")]
    Range(#[from] MulticallError),
    #[error("Execution of transaction {tx_index} failed: {source}")]
    Execution {
        tx_index: u64,
        #[source]
        source: TargetError,
    },
    #[error("Malformed call: {0}")]
    MalformedCall(String),
    #[error("Call addressed to 0x{0:x}, not to this engine")]
    ForeignTarget(Felt),
    #[error("Unknown entry point selector 0x{0:x}")]
    UnknownSelector(Felt),
}

impl MultisigError {
    /// True when the failing batch has already made durable changes.
    ///
    /// Only a failed downstream call qualifies: `executed` is set before
    /// the target runs and is never reverted.
    pub fn commits_effects(&self) -> bool {
        matches!(self, MultisigError::Execution { .. })
    }
}
