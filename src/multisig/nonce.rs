//! Replay protection
//!
//! One counter per engine. A batch presents the current value; the
//! counter moves forward only if the batch is allowed to stand.

use serde::{Deserialize, Serialize};

use crate::multisig::MultisigError;

/// Monotonic nonce counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceGuard {
    current: u64,
}

/// A consumed nonce that is still pending commit or rollback
#[must_use = "a reservation must be committed or rolled back"]
#[derive(Debug, PartialEq, Eq)]
pub struct NonceReservation {
    consumed: u64,
}

impl NonceReservation {
    /// Keep the nonce consumed
    pub fn commit(self) -> u64 {
        self.consumed
    }
}

impl NonceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the next batch must present
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Consume `presented` if it equals the current value
    pub fn check_and_consume(&mut self, presented: u64) -> Result<NonceReservation, MultisigError> {
        let mismatch = MultisigError::Nonce {
            expected: self.current,
            presented,
        };
        if presented != self.current {
            return Err(mismatch);
        }

        self.current = self.current.checked_add(1).ok_or(mismatch)?;
        Ok(NonceReservation { consumed: presented })
    }

    /// Give back a reservation whose guarded operation failed
    pub fn rollback(&mut self, reservation: NonceReservation) {
        if self.current == reservation.consumed + 1 {
            self.current = reservation.consumed;
        } else {
            log::warn!(
                "Nonce rollback of {} skipped, counter already at {}",
                reservation.consumed,
                self.current
            );
        }
    }
}
