//! # Milestones
//!
//! Eighteen price milestones with geometrically increasing targets. Each
//! milestone accumulates debounced "good periods" while the price holds at or
//! above its target and unlocks exactly once.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Number of milestones in the schedule
pub const MILESTONE_COUNT: u8 = 18;

/// Target of milestone 1, in 1e6-scaled price units
pub const FIRST_TARGET: u128 = 10;

/// Growth ratio between consecutive targets
pub const TARGET_GROWTH_NUMERATOR: u128 = 3;
pub const TARGET_GROWTH_DENOMINATOR: u128 = 2;

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Milestone {
    /// 1-based milestone number
    pub id: u8,
    pub price_target: u128,
    pub good_periods: u64,
    pub last_good_timestamp: u64,
    pub unlocked: bool,
}

impl Milestone {
    pub fn new(id: u8, price_target: u128) -> Self {
        Self {
            id,
            price_target,
            good_periods: 0,
            last_good_timestamp: 0,
            unlocked: false,
        }
    }

    /// Whether `interval` seconds have passed since the last counted period
    pub fn period_elapsed(&self, now: u64, interval: u64) -> bool {
        now >= self.last_good_timestamp.saturating_add(interval)
    }

    /// Count a good period at `now`
    pub fn record_good_period(&mut self, now: u64) -> u64 {
        self.good_periods = self.good_periods.saturating_add(1);
        self.last_good_timestamp = now;
        self.good_periods
    }
}

/// Price targets for milestones `1..=MILESTONE_COUNT`:
/// `t[1] = 10`, `t[i] = floor(t[i-1] * 3 / 2)`.
pub fn target_schedule() -> Vec<u128> {
    let mut targets = Vec::with_capacity(MILESTONE_COUNT as usize);
    let mut target = FIRST_TARGET;
    for _ in 0..MILESTONE_COUNT {
        targets.push(target);
        target = target * TARGET_GROWTH_NUMERATOR / TARGET_GROWTH_DENOMINATOR;
    }
    targets
}

/// A fresh milestone table with precomputed targets
pub fn milestone_table() -> Vec<Milestone> {
    target_schedule()
        .into_iter()
        .zip(1..=MILESTONE_COUNT)
        .map(|(target, id)| Milestone::new(id, target))
        .collect()
}

/// Map a milestone id to its table index
pub fn milestone_index(id: u8) -> VaultResult<usize> {
    if id == 0 || id > MILESTONE_COUNT {
        return Err(VaultError::InvalidMilestone(id));
    }
    Ok(usize::from(id - 1))
}
