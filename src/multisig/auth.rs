//! Signature verification and message hashes
//!
//! Two per-call hash shapes exist. `submit` binds the signature to the full
//! call content; `confirm`, `revoke` and `execute` bind only the transaction
//! index, whose content was fixed at submission. A batch digest tags each
//! call hash with its entry-point selector, then seals the batch to one
//! engine and one nonce.

use crate::crypto::hash::{chain_digest, chain_felt, fold_felts, MessageHash, ZERO_HASH};
use crate::crypto::{public_key_from_hex, verify_signature};
use crate::multisig::{MultisigError, OwnerRegistry};
use crate::Felt;

/// Hash an owner signs to submit `(to, selector, calldata)`
pub fn submit_message_hash(to: Felt, selector: Felt, calldata: &[Felt]) -> MessageHash {
    fold_felts([to, selector].into_iter().chain(calldata.iter().copied()))
}

/// Hash an owner signs to confirm, revoke or execute `tx_index`
pub fn index_message_hash(tx_index: u64) -> MessageHash {
    chain_felt(&ZERO_HASH, Felt::from(tx_index))
}

/// Bind a per-call hash to the entry point it is sent to
pub fn tagged_call_hash(selector: Felt, call_hash: &MessageHash) -> MessageHash {
    chain_digest(&chain_felt(&ZERO_HASH, selector), call_hash)
}

/// Seal a batch digest to an engine address and a nonce
pub fn envelope_hash(engine_address: Felt, nonce: u64, batch: &MessageHash) -> MessageHash {
    chain_felt(&chain_felt(batch, engine_address), Felt::from(nonce))
}

/// Combine per-call hashes left to right
///
/// A single hash is returned unchanged; an empty batch has no digest.
pub fn batch_digest(hashes: &[MessageHash]) -> Option<MessageHash> {
    let (first, rest) = hashes.split_first()?;
    Some(rest.iter().fold(*first, |acc, h| chain_digest(&acc, h)))
}

/// Check a hex signature over `message_hash` against a hex public key
///
/// Malformed keys or signatures simply fail verification.
pub fn verify(message_hash: &MessageHash, signature: &str, pubkey: &str) -> bool {
    let Ok(key) = public_key_from_hex(pubkey) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature) else {
        return false;
    };
    verify_signature(&key, message_hash, &sig_bytes).unwrap_or(false)
}

/// Authorize a request: valid signature by a registered owner
///
/// Returns the signer's normalized key, which is its owner identity.
pub fn authorize(
    owners: &OwnerRegistry,
    message_hash: &MessageHash,
    signature: &str,
    pubkey: &str,
) -> Result<String, MultisigError> {
    let key = public_key_from_hex(pubkey)
        .map_err(|_| MultisigError::Auth(format!("invalid signer key: {}", pubkey)))?;
    let owner = hex::encode(key.serialize());

    if !owners.is_owner(&owner) {
        return Err(MultisigError::Auth(format!("{} is not an owner", owner)));
    }

    if !verify(message_hash, signature, &owner) {
        return Err(MultisigError::Auth("invalid signature".to_string()));
    }

    Ok(owner)
}
