//! Property tests for tick / sqrt-ratio conversion.

use ascent_core::constants::{MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
use ascent_core::errors::MathError;
use ascent_core::math::{sqrt_ratio_at_tick, tick_at_sqrt_ratio};
use ethnum::U256;
use proptest::prelude::*;

proptest! {
    /// tick -> sqrt ratio -> tick recovers the tick to within one step
    #[test]
    fn prop_tick_round_trip(tick in MIN_TICK..MAX_TICK) {
        let sqrt = sqrt_ratio_at_tick(tick).unwrap();
        let recovered = tick_at_sqrt_ratio(sqrt).unwrap();
        prop_assert!((recovered - tick).abs() <= 1, "tick {} recovered as {}", tick, recovered);
    }

    /// Ratios are strictly increasing in the tick
    #[test]
    fn prop_ratio_monotonic(tick in MIN_TICK..MAX_TICK) {
        let lower = sqrt_ratio_at_tick(tick).unwrap();
        let upper = sqrt_ratio_at_tick(tick + 1).unwrap();
        prop_assert!(lower < upper);
    }

    /// Any in-range ratio maps to the greatest tick at or below it
    #[test]
    fn prop_tick_brackets_ratio(offset in 0u128..u128::MAX) {
        let span = MAX_SQRT_RATIO - MIN_SQRT_RATIO;
        let sqrt = MIN_SQRT_RATIO + U256::new(offset) % span;
        let tick = tick_at_sqrt_ratio(sqrt).unwrap();
        prop_assert!(sqrt_ratio_at_tick(tick).unwrap() <= sqrt);
        prop_assert!(sqrt_ratio_at_tick(tick + 1).unwrap() > sqrt);
    }

    #[test]
    fn prop_out_of_range_ticks_rejected(excess in 1i32..1_000_000) {
        prop_assert_eq!(
            sqrt_ratio_at_tick(MAX_TICK + excess),
            Err(MathError::TickOutOfRange(MAX_TICK + excess))
        );
        prop_assert_eq!(
            sqrt_ratio_at_tick(MIN_TICK - excess),
            Err(MathError::TickOutOfRange(MIN_TICK - excess))
        );
    }
}

#[test]
fn test_ratio_bounds_are_exclusive_at_the_top() {
    assert_eq!(tick_at_sqrt_ratio(MIN_SQRT_RATIO).unwrap(), MIN_TICK);
    assert_eq!(tick_at_sqrt_ratio(MAX_SQRT_RATIO - U256::ONE).unwrap(), MAX_TICK - 1);
    assert_eq!(tick_at_sqrt_ratio(MAX_SQRT_RATIO), Err(MathError::SqrtRatioOutOfRange));
    assert_eq!(
        tick_at_sqrt_ratio(MIN_SQRT_RATIO - U256::ONE),
        Err(MathError::SqrtRatioOutOfRange)
    );
}
