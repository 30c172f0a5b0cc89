//! Events emitted by vault operations, queued until the host drains them.

use ascent_core::AccountId;
use serde::{Deserialize, Serialize};

use crate::config::RecipientRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultEvent {
    Initialized {
        total_deposited: u128,
        per_milestone_amount: u128,
    },
    PriceSourceSet {
        reference: AccountId,
    },
    PriceSourceFrozen {
        reference: AccountId,
    },
    GoodPeriodRecorded {
        milestone: u8,
        good_periods: u64,
        price: u128,
        timestamp: u64,
    },
    MilestoneUnlocked {
        milestone: u8,
        price: u128,
        amount: u128,
        timestamp: u64,
    },
    Distributed {
        milestone: u8,
        role: RecipientRole,
        recipient: AccountId,
        amount: u128,
    },
}
