//! In-process balance contract
//!
//! The downstream target used by the CLI: one stored balance with
//! `set_balance`, `increase_balance` and `get_balance`, plus
//! `complex_inputs`, which sums a plain array and an array of pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TargetError;
use crate::crypto::selector_from_name;
use crate::Felt;

pub const SET_BALANCE: &str = "set_balance";
pub const INCREASE_BALANCE: &str = "increase_balance";
pub const GET_BALANCE: &str = "get_balance";
pub const COMPLEX_INPUTS: &str = "complex_inputs";
pub const GET_ARRAY_SUM: &str = "get_array_sum";

/// A deployed balance contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceContract {
    /// Contract address
    pub address: Felt,
    /// Stored balance
    pub balance: Felt,
    /// Sum stored by the last `complex_inputs` call
    #[serde(default)]
    pub array_sum: Felt,
    /// Number of successful state-changing calls
    pub writes: u64,
    /// Deployment timestamp
    pub deployed_at: DateTime<Utc>,
}

impl BalanceContract {
    pub fn new(address: Felt, initial_balance: Felt) -> Self {
        Self {
            address,
            balance: initial_balance,
            array_sum: 0,
            writes: 0,
            deployed_at: Utc::now(),
        }
    }

    /// Run one entry point
    pub fn invoke(&mut self, selector: Felt, calldata: &[Felt]) -> Result<Vec<Felt>, TargetError> {
        if selector == selector_from_name(SET_BALANCE) {
            let [value] = expect_args::<1>(calldata)?;
            self.balance = value;
            self.writes += 1;
            Ok(Vec::new())
        } else if selector == selector_from_name(INCREASE_BALANCE) {
            let [amount] = expect_args::<1>(calldata)?;
            self.balance = self
                .balance
                .checked_add(amount)
                .ok_or(TargetError::Rejected("balance overflow".to_string()))?;
            self.writes += 1;
            Ok(Vec::new())
        } else if selector == selector_from_name(GET_BALANCE) {
            expect_args::<0>(calldata)?;
            Ok(vec![self.balance])
        } else if selector == selector_from_name(COMPLEX_INPUTS) {
            self.array_sum = complex_sum(calldata)?;
            self.writes += 1;
            Ok(vec![self.array_sum])
        } else if selector == selector_from_name(GET_ARRAY_SUM) {
            expect_args::<0>(calldata)?;
            Ok(vec![self.array_sum])
        } else {
            Err(TargetError::UnknownSelector {
                address: self.address,
                selector,
            })
        }
    }
}

/// `[n, values..n, m, (first, second)..m]`, summed
fn complex_sum(calldata: &[Felt]) -> Result<Felt, TargetError> {
    let (values, rest) = split_prefixed(calldata, 1)?;
    let (pairs, rest) = split_prefixed(rest, 2)?;
    if !rest.is_empty() {
        return Err(TargetError::BadArguments {
            expected: calldata.len() - rest.len(),
            found: calldata.len(),
        });
    }

    values
        .iter()
        .chain(pairs)
        .try_fold(0 as Felt, |acc, v| acc.checked_add(*v))
        .ok_or(TargetError::Rejected("array sum overflow".to_string()))
}

/// Split off a length-prefixed array of `len * width` words
fn split_prefixed(words: &[Felt], width: usize) -> Result<(&[Felt], &[Felt]), TargetError> {
    let (len, rest) = words.split_first().ok_or(TargetError::BadArguments {
        expected: 1,
        found: 0,
    })?;
    let needed = usize::try_from(*len)
        .ok()
        .and_then(|n| n.checked_mul(width))
        .filter(|n| *n <= rest.len())
        .ok_or(TargetError::Rejected(format!(
            "array length {} exceeds {} remaining words",
            len,
            rest.len()
        )))?;
    Ok(rest.split_at(needed))
}

fn expect_args<const N: usize>(calldata: &[Felt]) -> Result<[Felt; N], TargetError> {
    <[Felt; N]>::try_from(calldata).map_err(|_| TargetError::BadArguments {
        expected: N,
        found: calldata.len(),
    })
}
