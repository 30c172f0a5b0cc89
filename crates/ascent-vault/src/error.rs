//! Error types for the milestone vault

use ascent_core::errors::{MathError, SourceError};
use thiserror::Error;

/// Failure reported by the token ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u128, required: u128 },

    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Balance overflow")]
    Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    // Configuration
    #[error("Zero identity")]
    ZeroAddress,

    #[error("Invalid milestone id: {0}")]
    InvalidMilestone(u8),

    #[error("Price source not set")]
    PriceSourceNotSet,

    #[error("Price source already set")]
    PriceSourceAlreadySet,

    #[error("Price source is frozen")]
    PriceSourceFrozen,

    #[error("Caller is not the owner")]
    Unauthorized,

    #[error("Vault already initialized")]
    AlreadyInitialized,

    #[error("Vault not initialized")]
    NotInitialized,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Preconditions
    #[error("Unlock cooldown active until {ready_at}")]
    CooldownActive { ready_at: u64 },

    #[error("Price {price} below target {target}")]
    PriceBelowTarget { price: u128, target: u128 },

    #[error("Good periods {have} of {need}")]
    InsufficientGoodPeriods { have: u64, need: u64 },

    #[error("Milestone {0} already unlocked")]
    AlreadyUnlocked(u8),

    // External failures
    #[error("Price unavailable: {0}")]
    PriceUnavailable(#[from] SourceError),

    #[error("Deposit failed: {0}")]
    DepositFailed(LedgerError),

    #[error("Distribution failed: {0}")]
    DistributionFailed(#[from] LedgerError),

    /// Part of the payout could not be reversed; the unlock stays committed
    #[error("Milestone {milestone} distribution incomplete, {paid} left paid out: {cause}")]
    DistributionIncomplete {
        milestone: u8,
        paid: u128,
        cause: LedgerError,
    },

    #[error(transparent)]
    Math(#[from] MathError),
}

impl VaultError {
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig(reason.to_string())
    }

    pub fn invalid_amount(reason: &str) -> Self {
        Self::InvalidAmount(reason.to_string())
    }

    /// Whether this is an unmet finalize precondition, which soft paths absorb
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::CooldownActive { .. }
                | Self::PriceBelowTarget { .. }
                | Self::InsufficientGoodPeriods { .. }
                | Self::AlreadyUnlocked(_)
        )
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
