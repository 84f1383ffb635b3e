//! Downstream call targets
//!
//! `execute` hands an approved call to a [`CallDispatcher`]. The relay
//! propagates whatever the target reports; it never retries.

pub mod balance;
pub mod registry;

use thiserror::Error;

use crate::Felt;

pub use balance::BalanceContract;
pub use registry::TargetRegistry;

/// Errors reported by a downstream target
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("No target deployed at 0x{0:x}")]
    UnknownTarget(Felt),
    #[error("Target 0x{address:x} has no entry point 0x{selector:x}")]
    UnknownSelector { address: Felt, selector: Felt },
    #[error("Expected {expected} argument(s), got {found}")]
    BadArguments { expected: usize, found: usize },
    #[error("Call rejected: {0}")]
    Rejected(String),
}

/// Something that can receive `(to, selector, calldata)`
pub trait CallDispatcher {
    fn dispatch(&mut self, to: Felt, selector: Felt, calldata: &[Felt]) -> Result<Vec<Felt>, TargetError>;
}
