//! Ledger persistence layer
//!
//! Saves and loads the engine ledger and the deployed targets as JSON.

use crate::multisig::MultisigEngine;
use crate::target::TargetRegistry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub targets_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".multisig_data"),
            ledger_file: "ledger.json".to_string(),
            targets_file: "targets.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Ledger storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default())
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    fn ledger_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.ledger_file)
    }

    fn targets_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.targets_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.ledger_file, index))
    }

    /// Save the ledger, rotating backups
    pub fn save_ledger(&self, engine: &MultisigEngine) -> Result<(), StorageError> {
        let path = self.ledger_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        self.write_atomic(&path, engine)
    }

    /// Load the ledger from disk
    pub fn load_ledger(&self) -> Result<MultisigEngine, StorageError> {
        let path = self.ledger_path();

        if !path.exists() {
            return Err(StorageError::InvalidData("Ledger file not found".to_string()));
        }

        load_from_file(&path)
    }

    /// Check if a saved ledger exists
    pub fn ledger_exists(&self) -> bool {
        self.ledger_path().exists()
    }

    /// Save the deployed targets
    pub fn save_targets(&self, targets: &TargetRegistry) -> Result<(), StorageError> {
        self.write_atomic(&self.targets_path(), targets)
    }

    /// Load the deployed targets; empty when none were saved yet
    pub fn load_targets(&self) -> Result<TargetRegistry, StorageError> {
        let path = self.targets_path();
        if !path.exists() {
            return Ok(TargetRegistry::new());
        }
        read_json(&path)
    }

    /// Write to a temporary file first, then rename over the target
    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StorageError::InvalidData(format!("bad path {:?}", path)))?;
        let temp_path = self.config.data_dir.join(format!("{}.tmp", file_name));

        let writer = BufWriter::new(fs::File::create(&temp_path)?);
        serde_json::to_writer_pretty(writer, value)?;

        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore the ledger from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<MultisigEngine, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        load_from_file(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats, StorageError> {
        let path = self.ledger_path();

        let file_size = if path.exists() {
            fs::metadata(&path)?.len()
        } else {
            0
        };

        Ok(StorageStats {
            file_size,
            backup_count: self.list_backups().len(),
            data_dir: self.config.data_dir.clone(),
        })
    }
}

/// Storage statistics
#[derive(Debug)]
pub struct StorageStats {
    pub file_size: u64,
    pub backup_count: usize,
    pub data_dir: PathBuf,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let reader = BufReader::new(fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Save a ledger to a specific file path
pub fn save_to_file(engine: &MultisigEngine, path: &Path) -> Result<(), StorageError> {
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, engine)?;
    Ok(())
}

/// Load a ledger from a specific file path
pub fn load_from_file(path: &Path) -> Result<MultisigEngine, StorageError> {
    read_json(path)
}
