//! Hashing utilities for the relay
//!
//! SHA-256 plus the felt hash chain that binds signatures to call content.

use sha2::{Digest, Sha256};

use crate::Felt;

/// A 32-byte digest that owners sign
pub type MessageHash = [u8; 32];

/// Seed of every hash chain (the "0" the chain starts from)
pub const ZERO_HASH: MessageHash = [0u8; 32];

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// One step of the felt chain: `SHA-256(acc || value)`
///
/// The value is appended as 16 big-endian bytes.
pub fn chain_felt(acc: &MessageHash, value: Felt) -> MessageHash {
    let mut hasher = Sha256::new();
    hasher.update(acc);
    hasher.update(value.to_be_bytes());
    hasher.finalize().into()
}

/// Combine two digests: `SHA-256(acc || next)`
pub fn chain_digest(acc: &MessageHash, next: &MessageHash) -> MessageHash {
    let mut hasher = Sha256::new();
    hasher.update(acc);
    hasher.update(next);
    hasher.finalize().into()
}

/// Left fold of [`chain_felt`] over `values`, starting from [`ZERO_HASH`]
pub fn fold_felts<I>(values: I) -> MessageHash
where
    I: IntoIterator<Item = Felt>,
{
    values
        .into_iter()
        .fold(ZERO_HASH, |acc, value| chain_felt(&acc, value))
}

/// Interpret the first 16 bytes of a digest as a felt
pub fn truncate_to_felt(digest: &[u8]) -> Felt {
    let mut bytes = [0u8; 16];
    let len = digest.len().min(16);
    bytes[..len].copy_from_slice(&digest[..len]);
    Felt::from_be_bytes(bytes)
}
