//! Cryptographic utilities for the relay
//!
//! This module provides:
//! - SHA-256 hashing and the felt hash chain
//! - ECDSA key management (secp256k1)
//! - Entry-point selector derivation

pub mod hash;
pub mod keys;
pub mod selector;

pub use hash::{chain_digest, chain_felt, fold_felts, sha256, sha256_hex, MessageHash, ZERO_HASH};
pub use keys::{public_key_from_hex, sign_message, verify_signature, KeyError, KeyPair};
pub use selector::{selector_from_name, SelectorCodec, Sha256SelectorCodec};
