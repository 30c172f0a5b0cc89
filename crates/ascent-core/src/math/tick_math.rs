//! # Tick Math
//!
//! Conversions between ticks and Q64.96 sqrt ratios. The constant ladder is
//! bit-for-bit identical to the one used by the pools the oracle reads, so a
//! tick observed on-chain maps to exactly the ratio the pool itself uses.

use ethnum::U256;

use crate::constants::{MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
use crate::errors::{MathError, MathResult};

/// sqrt(1.0001)^-1 in Q128, the starting ratio for odd ticks
const RATIO_TICK_1: U256 = U256::from_words(0, 0xfffcb933bd6fad37aa2d162d1a594001);

/// 1.0 in Q128, the starting ratio for even ticks
const RATIO_ONE: U256 = U256::from_words(1, 0);

/// sqrt(1.0001)^-(2^i) in Q128 for bit positions 0x2 through 0x80000
const RATIO_LADDER: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

/// Get the Q64.96 sqrt ratio at `tick`.
///
/// Fails with `TickOutOfRange` if `|tick| > MAX_TICK`; the tick is never clamped.
pub fn sqrt_ratio_at_tick(tick: i32) -> MathResult<U256> {
    if !is_tick_valid(tick) {
        return Err(MathError::TickOutOfRange(tick));
    }

    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        RATIO_TICK_1
    } else {
        RATIO_ONE
    };

    // Binary decomposition: both factors are below 2^129, so the product fits
    for &(bit, constant) in RATIO_LADDER.iter() {
        if abs_tick & bit != 0 {
            ratio = (ratio * U256::new(constant)) >> 128u32;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the ratio never undershoots the tick
    let shifted = ratio >> 32u32;
    if ratio % (U256::ONE << 32u32) == U256::ZERO {
        Ok(shifted)
    } else {
        Ok(shifted + U256::ONE)
    }
}

/// Get the greatest tick whose sqrt ratio is less than or equal to `sqrt_ratio`.
///
/// Valid input range is `[MIN_SQRT_RATIO, MAX_SQRT_RATIO)`.
pub fn tick_at_sqrt_ratio(sqrt_ratio: U256) -> MathResult<i32> {
    if sqrt_ratio < MIN_SQRT_RATIO || sqrt_ratio >= MAX_SQRT_RATIO {
        return Err(MathError::SqrtRatioOutOfRange);
    }

    // Invariant: ratio(low) <= sqrt_ratio < ratio(high)
    let mut low = MIN_TICK;
    let mut high = MAX_TICK;

    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if sqrt_ratio_at_tick(mid)? <= sqrt_ratio {
            low = mid;
        } else {
            high = mid;
        }
    }

    Ok(low)
}

/// Check if a tick is within the supported range
pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}

/// Check if a sqrt ratio is within the supported range
pub fn is_sqrt_ratio_valid(sqrt_ratio: U256) -> bool {
    sqrt_ratio >= MIN_SQRT_RATIO && sqrt_ratio <= MAX_SQRT_RATIO
}
