//! # TWAP (Time-Weighted Average Price) Reader
//!
//! Derives an average tick from two cumulative-tick samples spaced by a
//! window. Reading degrades instead of failing: a pool without enough
//! history falls back to its spot tick, and a pool that cannot report a spot
//! tick falls back to tick 0.
//!
//! The tick 0 fallback fabricates a price of 1.0 rather than signalling
//! "unknown". It is kept so the reader always answers; callers that need to
//! know can inspect `TwapTick::source`.

use tracing::{debug, warn};

use crate::constants::DEFAULT_TWAP_WINDOW;
use crate::errors::SourceError;
use crate::oracle::source::Pool;

/// Which read produced a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum TickSource {
    /// Time-weighted average over the configured window
    Twap,
    /// Instantaneous pool tick
    Spot,
    /// Neither read succeeded; tick 0 was substituted
    Fallback,
}

/// Result of a tick read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwapTick {
    pub tick: i32,
    pub source: TickSource,
}

/// Reads average ticks from a pool over a fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwapReader {
    window: u32,
}

impl Default for TwapReader {
    fn default() -> Self {
        Self::new(DEFAULT_TWAP_WINDOW)
    }
}

impl TwapReader {
    /// A window of zero reads the spot tick directly
    pub fn new(window: u32) -> Self {
        Self { window }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// Read the average tick, degrading to spot and then to tick 0.
    pub fn read_tick<P: Pool + ?Sized>(&self, pool: &P) -> TwapTick {
        if self.window > 0 {
            match self.observe_average(pool) {
                Ok(tick) => {
                    return TwapTick {
                        tick,
                        source: TickSource::Twap,
                    }
                }
                Err(e) => {
                    debug!(window = self.window, error = %e, "TWAP observation failed, using spot tick");
                }
            }
        }

        match pool.slot0() {
            Ok(slot0) => TwapTick {
                tick: slot0.tick,
                source: TickSource::Spot,
            },
            Err(e) => {
                warn!(error = %e, "Spot tick unavailable, substituting tick 0");
                TwapTick {
                    tick: 0,
                    source: TickSource::Fallback,
                }
            }
        }
    }

    /// Average tick over the window from the pool's cumulative observations
    pub fn observe_average<P: Pool + ?Sized>(&self, pool: &P) -> Result<i32, SourceError> {
        if self.window == 0 {
            return Err(SourceError::InsufficientHistory);
        }

        let cumulatives = pool.observe(&[self.window, 0])?;
        let (then, now) = match cumulatives.as_slice() {
            [then, now] => (*then, *now),
            _ => return Err(SourceError::MalformedObservation),
        };

        let delta = now
            .checked_sub(then)
            .ok_or(SourceError::MalformedObservation)?;
        let average = floor_div(delta, i64::from(self.window));

        // Out-of-range averages are passed through for tick math to reject
        Ok(i32::try_from(average).unwrap_or(if average < 0 { i32::MIN } else { i32::MAX }))
    }
}

/// Integer division rounding toward negative infinity.
///
/// `floor_div(-7, 2) == -4`, where truncating division would give `-3`.
pub fn floor_div(delta: i64, window: i64) -> i64 {
    let quotient = delta / window;
    if delta < 0 && delta % window != 0 {
        quotient - 1
    } else {
        quotient
    }
}
