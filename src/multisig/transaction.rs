//! Pending transactions and their lifecycle
//!
//! A transaction starts `Pending` when submitted and becomes `Executed`
//! exactly once. Nothing is ever deleted; indices are dense from 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::multisig::MultisigError;
use crate::target::CallDispatcher;
use crate::Felt;

/// Position of a transaction in the registry
pub type TxIndex = u64;

/// Lifecycle state of a transaction
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TxStatus {
    /// Collecting confirmations
    Pending,
    /// Dispatched to its target (terminal)
    Executed,
}

/// A call awaiting owner confirmations
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub index: TxIndex,
    /// Target address
    pub to: Felt,
    /// Target entry point
    pub selector: Felt,
    pub calldata: Vec<Felt>,
    pub executed: bool,
    /// Owners that currently confirm this transaction
    pub confirmations: BTreeSet<String>,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn num_confirmations(&self) -> usize {
        self.confirmations.len()
    }

    pub fn status(&self) -> TxStatus {
        if self.executed {
            TxStatus::Executed
        } else {
            TxStatus::Pending
        }
    }

    pub fn is_confirmed_by(&self, owner: &str) -> bool {
        self.confirmations.contains(owner)
    }
}

/// What happened to a transaction
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    Submitted,
    Confirmed,
    Revoked,
    Executed { succeeded: bool },
}

/// Audit record of a registry operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerEvent {
    pub kind: EventKind,
    pub tx_index: TxIndex,
    pub owner: String,
    pub at: DateTime<Utc>,
}

/// Undo record of an open batch
#[derive(Clone, Debug)]
struct Journal {
    tx_len: usize,
    events_len: usize,
    /// First-touch copies of transactions that existed before the batch
    saved: BTreeMap<usize, Transaction>,
}

/// The transaction state machine
///
/// Callers must have authorized `owner` before invoking any operation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransactionRegistry {
    transactions: Vec<Transaction>,
    events: Vec<LedgerEvent>,
    #[serde(skip)]
    journal: Option<Journal>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording changes so they can be undone with [`Self::rollback`]
    ///
    /// Only transactions that are actually touched get copied.
    pub fn begin(&mut self) {
        self.journal = Some(Journal {
            tx_len: self.transactions.len(),
            events_len: self.events.len(),
            saved: BTreeMap::new(),
        });
    }

    /// Keep every change since [`Self::begin`]
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every change since [`Self::begin`]
    pub fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };

        self.transactions.truncate(journal.tx_len);
        self.events.truncate(journal.events_len);
        for (i, tx) in journal.saved {
            self.transactions[i] = tx;
        }
        log::debug!("Registry rolled back to {} transaction(s)", journal.tx_len);
    }

    /// Append a new pending transaction with no confirmations
    pub fn submit(&mut self, owner: &str, to: Felt, selector: Felt, calldata: Vec<Felt>) -> TxIndex {
        let index = self.transactions.len() as TxIndex;

        self.transactions.push(Transaction {
            index,
            to,
            selector,
            calldata,
            executed: false,
            confirmations: BTreeSet::new(),
            submitted_by: owner.to_string(),
            submitted_at: Utc::now(),
            executed_at: None,
        });
        self.record(EventKind::Submitted, index, owner);

        log::info!("Transaction {} submitted by {} to 0x{:x}", index, owner, to);
        index
    }

    /// Add `owner` to the confirmations; returns the new count
    pub fn confirm(&mut self, tx_index: TxIndex, owner: &str) -> Result<usize, MultisigError> {
        let tx = self.pending_mut(tx_index)?;

        if !tx.confirmations.insert(owner.to_string()) {
            return Err(MultisigError::AlreadyConfirmed {
                tx_index,
                owner: owner.to_string(),
            });
        }
        let count = tx.num_confirmations();
        self.record(EventKind::Confirmed, tx_index, owner);

        log::info!("Transaction {} confirmed by {} ({} total)", tx_index, owner, count);
        Ok(count)
    }

    /// Remove `owner` from the confirmations; returns the new count
    pub fn revoke(&mut self, tx_index: TxIndex, owner: &str) -> Result<usize, MultisigError> {
        let tx = self.pending_mut(tx_index)?;

        if !tx.confirmations.remove(owner) {
            return Err(MultisigError::NotConfirmed {
                tx_index,
                owner: owner.to_string(),
            });
        }
        let count = tx.num_confirmations();
        self.record(EventKind::Revoked, tx_index, owner);

        log::info!("Transaction {} revoked by {} ({} left)", tx_index, owner, count);
        Ok(count)
    }

    /// Mark the transaction executed and dispatch it once
    ///
    /// `executed` is set before the target runs and stays set if the
    /// target fails; that failure comes back as `Execution`.
    pub fn execute(
        &mut self,
        tx_index: TxIndex,
        owner: &str,
        threshold: u8,
        targets: &mut dyn CallDispatcher,
    ) -> Result<Vec<Felt>, MultisigError> {
        let tx = self.pending_mut(tx_index)?;

        let have = tx.num_confirmations();
        if have < threshold as usize {
            return Err(MultisigError::InsufficientConfirmations {
                tx_index,
                have,
                need: threshold,
            });
        }

        tx.executed = true;
        tx.executed_at = Some(Utc::now());
        let (to, selector, calldata) = (tx.to, tx.selector, tx.calldata.clone());

        let result = targets.dispatch(to, selector, &calldata);
        self.record(
            EventKind::Executed {
                succeeded: result.is_ok(),
            },
            tx_index,
            owner,
        );

        match result {
            Ok(output) => {
                log::info!("Transaction {} executed by {}", tx_index, owner);
                Ok(output)
            }
            Err(source) => {
                log::warn!("Transaction {} target call failed: {}", tx_index, source);
                Err(MultisigError::Execution { tx_index, source })
            }
        }
    }

    /// Look up a transaction
    pub fn get(&self, tx_index: TxIndex) -> Result<&Transaction, MultisigError> {
        usize::try_from(tx_index)
            .ok()
            .and_then(|i| self.transactions.get(i))
            .ok_or(MultisigError::NotFound(tx_index))
    }

    /// Whether `owner` currently confirms `tx_index`
    pub fn is_confirmed(&self, tx_index: TxIndex, owner: &str) -> Result<bool, MultisigError> {
        Ok(self.get(tx_index)?.is_confirmed_by(owner))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn list(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Existing, not yet executed transaction
    fn pending_mut(&mut self, tx_index: TxIndex) -> Result<&mut Transaction, MultisigError> {
        let i = usize::try_from(tx_index)
            .ok()
            .filter(|i| *i < self.transactions.len())
            .ok_or(MultisigError::NotFound(tx_index))?;

        if self.transactions[i].executed {
            return Err(MultisigError::AlreadyExecuted(tx_index));
        }

        if let Some(journal) = self.journal.as_mut() {
            if i < journal.tx_len {
                journal
                    .saved
                    .entry(i)
                    .or_insert_with(|| self.transactions[i].clone());
            }
        }
        Ok(&mut self.transactions[i])
    }

    fn record(&mut self, kind: EventKind, tx_index: TxIndex, owner: &str) {
        self.events.push(LedgerEvent {
            kind,
            tx_index,
            owner: owner.to_string(),
            at: Utc::now(),
        });
    }
}
