//! Token ledger capability.
//!
//! The vault never holds balances itself; it moves tokens between holders of
//! a single fungible token through this trait.

use ascent_core::AccountId;

use crate::error::LedgerError;

pub trait Ledger {
    /// Balance held by `holder`, zero for unknown holders
    fn balance_of(&self, holder: &AccountId) -> u128;

    /// Move `amount` from `from` to `to`. A failed transfer leaves balances unchanged.
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), LedgerError>;
}

impl<L: Ledger + ?Sized> Ledger for &mut L {
    fn balance_of(&self, holder: &AccountId) -> u128 {
        (**self).balance_of(holder)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<(), LedgerError> {
        (**self).transfer(from, to, amount)
    }
}
