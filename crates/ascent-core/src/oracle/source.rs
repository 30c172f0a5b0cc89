//! Capabilities the price engine consumes.
//!
//! Every call returns a `Result`, so each call site decides explicitly
//! whether a failure is absorbed or propagated.

use std::sync::Arc;

use ethnum::U256;

use crate::errors::SourceError;
use crate::types::AccountId;

/// Anything that can quote the tracked asset in 1e6-scaled units.
pub trait PriceSource: Send + Sync {
    fn get_price(&self) -> Result<u128, SourceError>;
}

impl<T: PriceSource + ?Sized> PriceSource for Arc<T> {
    fn get_price(&self) -> Result<u128, SourceError> {
        (**self).get_price()
    }
}

impl<T: PriceSource + ?Sized> PriceSource for Box<T> {
    fn get_price(&self) -> Result<u128, SourceError> {
        (**self).get_price()
    }
}

/// Instantaneous pool state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot0 {
    /// Current Q64.96 sqrt ratio
    pub sqrt_ratio: U256,
    /// Current tick
    pub tick: i32,
}

/// A concentrated-liquidity pool with an observation history.
pub trait Pool: Send + Sync {
    /// Cumulative tick values at each `seconds_ago` offset, in request order
    fn observe(&self, seconds_agos: &[u32]) -> Result<Vec<i64>, SourceError>;

    /// Current sqrt ratio and tick
    fn slot0(&self) -> Result<Slot0, SourceError>;

    /// Pool token order as `(token0, token1)`
    fn tokens(&self) -> (AccountId, AccountId);
}

impl<T: Pool + ?Sized> Pool for Arc<T> {
    fn observe(&self, seconds_agos: &[u32]) -> Result<Vec<i64>, SourceError> {
        (**self).observe(seconds_agos)
    }

    fn slot0(&self) -> Result<Slot0, SourceError> {
        (**self).slot0()
    }

    fn tokens(&self) -> (AccountId, AccountId) {
        (**self).tokens()
    }
}
