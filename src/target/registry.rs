//! Registry of deployed targets
//!
//! Resolves an address to its contract and forwards the call.

use serde::{Deserialize, Serialize};

use super::balance::BalanceContract;
use super::{CallDispatcher, TargetError};
use crate::crypto::hash::{sha256, truncate_to_felt};
use crate::Felt;

/// All targets reachable from `execute`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetRegistry {
    contracts: Vec<BalanceContract>,
    /// Deployment counter for address generation
    nonce: u64,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a balance contract and return its address
    pub fn deploy(&mut self, deployer: &str, initial_balance: Felt) -> Felt {
        let address = self.generate_address(deployer);
        self.nonce += 1;

        self.contracts
            .push(BalanceContract::new(address, initial_balance));
        log::info!("Target deployed at 0x{:x} by {}", address, deployer);
        address
    }

    /// Address from deployer and deployment counter
    fn generate_address(&self, deployer: &str) -> Felt {
        let input = format!("{}:{}", deployer, self.nonce);
        truncate_to_felt(&sha256(input.as_bytes()))
    }

    pub fn get(&self, address: Felt) -> Option<&BalanceContract> {
        self.contracts.iter().find(|c| c.address == address)
    }

    pub fn list(&self) -> &[BalanceContract] {
        &self.contracts
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl CallDispatcher for TargetRegistry {
    fn dispatch(&mut self, to: Felt, selector: Felt, calldata: &[Felt]) -> Result<Vec<Felt>, TargetError> {
        let contract = self
            .contracts
            .iter_mut()
            .find(|c| c.address == to)
            .ok_or(TargetError::UnknownTarget(to))?;
        contract.invoke(selector, calldata)
    }
}
