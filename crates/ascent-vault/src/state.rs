//! Persisted vault state.

use ascent_core::AccountId;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::milestone::Milestone;

/// Scalar vault record
#[derive(Debug, Clone, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct VaultState {
    pub total_deposited: u128,
    pub per_milestone_amount: u128,
    pub total_distributed: u128,
    pub last_unlock_time: u64,
    pub last_unlock_price: u128,
    /// Identity of the configured price source, settable once
    pub oracle_reference: Option<AccountId>,
    pub oracle_frozen: bool,
    pub initialized: bool,
}

impl VaultState {
    /// Deposit not yet paid out
    pub fn remaining(&self) -> u128 {
        self.total_deposited.saturating_sub(self.total_distributed)
    }
}

/// Everything a host must persist to restore a vault
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct VaultSnapshot {
    pub state: VaultState,
    /// Milestones `1..=18` in id order
    pub milestones: Vec<Milestone>,
}

impl VaultSnapshot {
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    pub fn from_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        Self::try_from_slice(bytes)
    }
}
