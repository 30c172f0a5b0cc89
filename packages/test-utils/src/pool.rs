use std::sync::Mutex;

use ascent_core::errors::SourceError;
use ascent_core::math::sqrt_ratio_at_tick;
use ascent_core::oracle::{Pool, Slot0};
use ascent_core::AccountId;

#[derive(Debug)]
struct PoolState {
    /// Pool creation time
    genesis: u64,
    now: u64,
    /// `(timestamp, cumulative tick, tick from then on)`
    checkpoints: Vec<(u64, i64, i32)>,
    observe_fails: bool,
    slot0_fails: bool,
}

impl PoolState {
    fn current_tick(&self) -> i32 {
        self.checkpoints.last().map(|c| c.2).unwrap_or(0)
    }

    fn cumulative_at(&self, timestamp: u64) -> i64 {
        let (at, cumulative, tick) = self
            .checkpoints
            .iter()
            .rev()
            .find(|c| c.0 <= timestamp)
            .copied()
            .unwrap_or((self.genesis, 0, 0));
        cumulative + i64::from(tick) * (timestamp - at) as i64
    }
}

/// Pool that accumulates ticks over simulated time
#[derive(Debug)]
pub struct MockPool {
    token0: AccountId,
    token1: AccountId,
    state: Mutex<PoolState>,
}

impl MockPool {
    /// A pool created at `genesis` trading at `tick`
    pub fn new(token0: AccountId, token1: AccountId, tick: i32, genesis: u64) -> Self {
        Self {
            token0,
            token1,
            state: Mutex::new(PoolState {
                genesis,
                now: genesis,
                checkpoints: vec![(genesis, 0, tick)],
                observe_fails: false,
                slot0_fails: false,
            }),
        }
    }

    /// Move the clock forward at the current tick
    pub fn advance(&self, seconds: u64) {
        self.state.lock().unwrap().now += seconds;
    }

    /// Change the tick from the current time on
    pub fn swap_to(&self, tick: i32) {
        let mut state = self.state.lock().unwrap();
        let now = state.now;
        let cumulative = state.cumulative_at(now);
        state.checkpoints.push((now, cumulative, tick));
    }

    pub fn now(&self) -> u64 {
        self.state.lock().unwrap().now
    }

    pub fn set_observe_fails(&self, fails: bool) {
        self.state.lock().unwrap().observe_fails = fails;
    }

    pub fn set_slot0_fails(&self, fails: bool) {
        self.state.lock().unwrap().slot0_fails = fails;
    }
}

impl Pool for MockPool {
    fn observe(&self, seconds_agos: &[u32]) -> Result<Vec<i64>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.observe_fails {
            return Err(SourceError::unavailable("observe reverted"));
        }

        seconds_agos
            .iter()
            .map(|ago| {
                let ago = u64::from(*ago);
                if ago > state.now - state.genesis {
                    return Err(SourceError::InsufficientHistory);
                }
                Ok(state.cumulative_at(state.now - ago))
            })
            .collect()
    }

    fn slot0(&self) -> Result<Slot0, SourceError> {
        let state = self.state.lock().unwrap();
        if state.slot0_fails {
            return Err(SourceError::unavailable("slot0 reverted"));
        }
        let tick = state.current_tick();
        Ok(Slot0 {
            sqrt_ratio: sqrt_ratio_at_tick(tick)?,
            tick,
        })
    }

    fn tokens(&self) -> (AccountId, AccountId) {
        (self.token0, self.token1)
    }
}
