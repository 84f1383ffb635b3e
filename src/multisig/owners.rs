//! Owner set and confirmation threshold
//!
//! Fixed at construction; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::crypto::hash::{sha256, truncate_to_felt};
use crate::crypto::public_key_from_hex;
use crate::multisig::MultisigError;
use crate::Felt;

/// Configuration for a multisig engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MultisigConfig {
    /// Minimum confirmations required (M in M-of-N)
    pub threshold: u8,
    /// Public keys of all owners (hex-encoded, compressed)
    pub owners: Vec<String>,
    /// Optional human-readable label
    #[serde(default)]
    pub label: Option<String>,
    /// Fixed engine address; derived from the owner set when absent
    #[serde(default)]
    pub engine_address: Option<Felt>,
}

impl MultisigConfig {
    /// Create a new configuration
    ///
    /// # Errors
    /// Returns `Config` if the owner set or threshold is invalid
    pub fn new(threshold: u8, owners: Vec<String>, label: Option<String>) -> Result<Self, MultisigError> {
        let config = Self {
            threshold,
            owners,
            label,
            engine_address: None,
        };
        OwnerRegistry::from_config(&config)?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, MultisigError> {
        let json = fs::read_to_string(path)
            .map_err(|e| MultisigError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| MultisigError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        OwnerRegistry::from_config(&config)?;
        Ok(config)
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }
}

/// Immutable owner set plus threshold
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerRegistry {
    owners: Vec<String>,
    threshold: u8,
}

impl OwnerRegistry {
    /// Build the registry from owner public keys
    ///
    /// Keys are normalized to lowercase compressed hex. Fails with `Config`
    /// on an empty set, an unparsable or duplicate key, or a threshold
    /// outside `1..=owners`.
    pub fn new(owners: &[String], threshold: u8) -> Result<Self, MultisigError> {
        if owners.is_empty() {
            return Err(MultisigError::Config("at least one owner is required".to_string()));
        }

        if threshold == 0 {
            return Err(MultisigError::Config("threshold must be at least 1".to_string()));
        }

        if threshold as usize > owners.len() {
            return Err(MultisigError::Config(format!(
                "threshold {} exceeds owner count {}",
                threshold,
                owners.len()
            )));
        }

        let mut normalized = Vec::with_capacity(owners.len());
        for owner in owners {
            let key = public_key_from_hex(owner)
                .map_err(|_| MultisigError::Config(format!("invalid owner key: {}", owner)))?;
            let key_hex = hex::encode(key.serialize());
            if normalized.contains(&key_hex) {
                return Err(MultisigError::Config(format!("duplicate owner key: {}", owner)));
            }
            normalized.push(key_hex);
        }

        Ok(Self {
            owners: normalized,
            threshold,
        })
    }

    pub fn from_config(config: &MultisigConfig) -> Result<Self, MultisigError> {
        Self::new(&config.owners, config.threshold)
    }

    /// Check if a normalized public key is a registered owner
    pub fn is_owner(&self, pubkey: &str) -> bool {
        self.owners.iter().any(|o| o == pubkey)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Deterministic address for this owner set
    ///
    /// SHA-256 over the threshold byte and the sorted keys.
    pub fn derive_address(&self) -> Felt {
        let mut sorted = self.owners.clone();
        sorted.sort();

        let mut data = vec![self.threshold];
        for key in &sorted {
            data.extend_from_slice(key.as_bytes());
        }

        truncate_to_felt(&sha256(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn sample_owners(n: usize) -> Vec<String> {
        (0..n).map(|_| KeyPair::generate().public_key_hex()).collect()
    }

    #[test]
    fn test_registry_creation() {
        let owners = sample_owners(3);
        let registry = OwnerRegistry::new(&owners, 2).unwrap();

        assert_eq!(registry.threshold(), 2);
        assert_eq!(registry.len(), 3);
        assert!(registry.is_owner(&owners[0]));
        assert!(!registry.is_owner(&KeyPair::generate().public_key_hex()));
    }

    #[test]
    fn test_single_owner_allowed() {
        let registry = OwnerRegistry::new(&sample_owners(1), 1).unwrap();
        assert_eq!(registry.threshold(), 1);
    }

    #[test]
    fn test_validation() {
        let owners = sample_owners(3);

        assert!(matches!(OwnerRegistry::new(&owners, 0), Err(MultisigError::Config(_))));
        assert!(matches!(OwnerRegistry::new(&owners, 4), Err(MultisigError::Config(_))));
        assert!(matches!(OwnerRegistry::new(&[], 1), Err(MultisigError::Config(_))));
        assert!(matches!(
            OwnerRegistry::new(&["not a key".to_string()], 1),
            Err(MultisigError::Config(_))
        ));

        let dup = vec![owners[0].clone(), owners[0].to_uppercase()];
        assert!(matches!(OwnerRegistry::new(&dup, 1), Err(MultisigError::Config(_))));
    }

    #[test]
    fn test_keys_are_normalized() {
        let owners = sample_owners(1);
        let registry = OwnerRegistry::new(&[owners[0].to_uppercase()], 1).unwrap();
        assert!(registry.is_owner(&owners[0]));
    }

    #[test]
    fn test_address_determinism() {
        let owners = sample_owners(3);
        let mut reversed = owners.clone();
        reversed.reverse();

        let a = OwnerRegistry::new(&owners, 2).unwrap();
        let b = OwnerRegistry::new(&reversed, 2).unwrap();
        let c = OwnerRegistry::new(&owners, 3).unwrap();

        assert_eq!(a.derive_address(), b.derive_address());
        assert_ne!(a.derive_address(), c.derive_address());
    }

    #[test]
    fn test_config_description_and_load() {
        let config = MultisigConfig::new(2, sample_owners(3), Some("Treasury".to_string())).unwrap();
        assert_eq!(config.description(), "2-of-3");

        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("multisig.json");
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(MultisigConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_config_load_rejects_bad_threshold() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("multisig.json");
        let json = serde_json::json!({ "threshold": 5, "owners": sample_owners(2) });
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(MultisigConfig::load(&path), Err(MultisigError::Config(_))));
    }
}
