use std::collections::{HashMap, HashSet};

use ascent_core::AccountId;
use ascent_vault::{Ledger, LedgerError};

/// Single-token ledger with failure injection
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: HashMap<AccountId, u128>,
    rejected: HashSet<AccountId>,
    transfers: Vec<(AccountId, AccountId, u128)>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, holder: AccountId, amount: u128) {
        *self.balances.entry(holder).or_default() += amount;
    }

    /// Fail every later transfer into `recipient`
    pub fn reject_transfers_to(&mut self, recipient: AccountId) {
        self.rejected.insert(recipient);
    }

    pub fn accept_transfers_to(&mut self, recipient: &AccountId) {
        self.rejected.remove(recipient);
    }

    /// Successful transfers in order, including reversals
    pub fn transfers(&self) -> &[(AccountId, AccountId, u128)] {
        &self.transfers
    }

    pub fn total_supply(&self) -> u128 {
        self.balances.values().sum()
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, holder: &AccountId) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), LedgerError> {
        if self.rejected.contains(to) {
            return Err(LedgerError::Rejected(format!("recipient {} blocked", to)));
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.balances.insert(*from, available - amount);
        // Self-transfers net to zero
        if from != to {
            self.balances.insert(*to, credited);
        } else {
            self.balances.insert(*to, available);
        }
        self.transfers.push((*from, *to, amount));
        Ok(())
    }
}
