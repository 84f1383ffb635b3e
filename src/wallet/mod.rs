//! Owner key storage and batch signing

pub mod wallet;

pub use wallet::{Wallet, WalletError, WalletInfo, WalletManager};
