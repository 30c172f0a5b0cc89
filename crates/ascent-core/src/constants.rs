//! # Protocol Constants
//!
//! Fundamental constants for the price engine:
//! - Fixed-point scales (Q64, Q96, Q128, Q192)
//! - Tick and sqrt-ratio bounds of the pools the oracle reads from
//! - Output price scale and aggregation limits

use ethnum::U256;

// ============================================================================
// Fixed-Point Scales
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: U256 = U256::from_words(0, 1u128 << 64);

/// Q96 fixed-point scale factor used by pool sqrt ratios: 2^96
pub const Q96: U256 = U256::from_words(0, 1u128 << 96);

/// Q128 fixed-point scale factor: 2^128
pub const Q128: U256 = U256::from_words(1, 0);

/// Q192 scale of a squared Q96 ratio: 2^192
pub const Q192: U256 = U256::from_words(1u128 << 64, 0);

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

// ============================================================================
// Tick Bounds
// ============================================================================

/// Minimum tick supported by the pool price curve
pub const MIN_TICK: i32 = -887_272;

/// Maximum tick supported by the pool price curve
pub const MAX_TICK: i32 = 887_272;

/// Sqrt ratio at `MIN_TICK` (Q64.96)
pub const MIN_SQRT_RATIO: U256 = U256::from_words(0, 4_295_128_739);

/// Sqrt ratio at `MAX_TICK` (Q64.96, 160 bits)
pub const MAX_SQRT_RATIO: U256 =
    U256::from_words(4_294_805_859, 318_775_800_626_314_356_294_205_765_087_544_249_638);

// ============================================================================
// Price Output
// ============================================================================

/// Prices leave the oracle scaled by 1e6 (a true price of 0.000010 is `10`)
pub const PRICE_OUTPUT_MULTIPLIER: u128 = 1_000_000;

/// Largest decimal difference a `PriceScale` accepts
pub const MAX_DECIMAL_DIFF: u8 = 30;

// ============================================================================
// Aggregation
// ============================================================================

/// Maximum number of sources an aggregator will hold
pub const MAX_SOURCES: usize = 10;

/// Default minimum number of valid sources
pub const DEFAULT_MIN_SOURCES: usize = 1;

/// Default TWAP window in seconds (30 minutes)
pub const DEFAULT_TWAP_WINDOW: u32 = 1_800;
