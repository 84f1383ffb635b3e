//! ECDSA key management for owners
//!
//! Provides key pair generation, signing, and verification using
//! the secp256k1 elliptic curve. Owners are identified by their
//! compressed public key in hex.

use rand::rngs::OsRng;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::MessageHash;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a message hash, returning the compact signature in hex
    pub fn sign_hex(&self, message_hash: &MessageHash) -> Result<String, KeyError> {
        Ok(hex::encode(sign_message(&self.secret_key, message_hash)?))
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message_hash: &MessageHash, signature: &[u8]) -> Result<bool, KeyError> {
        verify_signature(&self.public_key, message_hash, signature)
    }
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign a message hash with a secret key
pub fn sign_message(secret_key: &SecretKey, message_hash: &MessageHash) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(message_hash)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message_hash: &MessageHash,
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(message_hash)?;
    let sig = Signature::from_compact(signature).map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}
