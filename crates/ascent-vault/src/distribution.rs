//! # Distribution Engine
//!
//! Splits a released amount across the four recipients by ratio and pays
//! it out as one logical unit:
//! 1. Shares are floored; the rounding shortfall goes to the treasury
//! 2. The payer's balance is checked before any transfer is issued
//! 3. If a transfer fails, completed transfers are reversed newest first
//!
//! A reversal can itself fail. The shares it leaves with their recipients are
//! reported back so the caller can account for them.

use ascent_core::math::{mul_div_floor, to_u128};
use ascent_core::AccountId;
use ethnum::U256;
use tracing::{debug, error};

use crate::config::{RecipientRole, RecipientTable};
use crate::error::{LedgerError, VaultError, VaultResult};
use crate::ledger::Ledger;

/// One recipient's part of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionShare {
    pub role: RecipientRole,
    pub recipient: AccountId,
    pub ratio_numerator: u32,
    pub computed_amount: u128,
}

/// Shares for one release; they always sum to `amount`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionPlan {
    amount: u128,
    shares: [DistributionShare; 4],
}

impl DistributionPlan {
    pub fn compute(amount: u128, table: &RecipientTable) -> VaultResult<Self> {
        if table.denominator == 0 {
            return Err(VaultError::invalid_config("ratio denominator must be greater than 0"));
        }
        let denominator = U256::from(table.denominator);

        let mut shares = table.entries().map(|(role, recipient)| DistributionShare {
            role,
            recipient: recipient.account,
            ratio_numerator: recipient.ratio,
            computed_amount: 0,
        });

        let mut allocated: u128 = 0;
        for share in shares.iter_mut() {
            let raw = mul_div_floor(U256::new(amount), U256::from(share.ratio_numerator), denominator)?;
            share.computed_amount = to_u128(raw)?;
            allocated = allocated
                .checked_add(share.computed_amount)
                .ok_or_else(|| VaultError::invalid_config("ratios exceed denominator"))?;
        }

        let dust = amount
            .checked_sub(allocated)
            .ok_or_else(|| VaultError::invalid_config("ratios exceed denominator"))?;
        // Treasury is always first
        shares[0].computed_amount += dust;

        Ok(Self { amount, shares })
    }

    pub fn amount(&self) -> u128 {
        self.amount
    }

    pub fn shares(&self) -> &[DistributionShare; 4] {
        &self.shares
    }

    /// Pay every share from `from`. Either all transfers land or, unless a
    /// reversal fails, none do.
    pub fn execute<L: Ledger + ?Sized>(&self, ledger: &mut L, from: &AccountId) -> Result<(), PayoutFailure> {
        let available = ledger.balance_of(from);
        if available < self.amount {
            return Err(PayoutFailure {
                cause: LedgerError::InsufficientBalance {
                    available,
                    required: self.amount,
                },
                stranded: Vec::new(),
            });
        }

        let mut completed: Vec<&DistributionShare> = Vec::with_capacity(self.shares.len());
        for share in self.shares.iter().filter(|s| s.computed_amount > 0) {
            match ledger.transfer(from, &share.recipient, share.computed_amount) {
                Ok(()) => {
                    debug!(role = %share.role, recipient = %share.recipient, amount = share.computed_amount, "Share paid");
                    completed.push(share);
                }
                Err(cause) => {
                    let stranded = Self::compensate(ledger, from, &completed);
                    return Err(PayoutFailure { cause, stranded });
                }
            }
        }

        Ok(())
    }

    /// Reverse `completed` newest first; returns the shares that stayed paid
    fn compensate<L: Ledger + ?Sized>(
        ledger: &mut L,
        from: &AccountId,
        completed: &[&DistributionShare],
    ) -> Vec<DistributionShare> {
        let mut stranded = Vec::new();
        for share in completed.iter().rev() {
            if let Err(e) = ledger.transfer(&share.recipient, from, share.computed_amount) {
                error!(
                    role = %share.role,
                    recipient = %share.recipient,
                    amount = share.computed_amount,
                    error = %e,
                    "Failed to reverse distribution transfer"
                );
                stranded.push(**share);
            }
        }
        stranded
    }
}

/// Why a payout stopped, and what it could not take back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutFailure {
    /// The transfer error that stopped the payout
    pub cause: LedgerError,
    /// Shares still held by their recipients after reversal
    pub stranded: Vec<DistributionShare>,
}

impl PayoutFailure {
    /// Whether the ledger is back where the payout started
    pub fn rolled_back(&self) -> bool {
        self.stranded.is_empty()
    }

    pub fn stranded_amount(&self) -> u128 {
        self.stranded.iter().map(|s| s.computed_amount).sum()
    }
}
