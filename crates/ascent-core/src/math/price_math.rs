//! # Price Math
//!
//! Turns a Q64.96 sqrt ratio into a human-scaled integer price.
//!
//! The squared ratio of a pool is always "token1 per token0" in raw units.
//! When the tracked asset is token0 that is already quote-per-asset and is
//! scaled directly; when it is token1 the relationship must be inverted.
//! Squaring and converting the same way for both orders gives wrong prices.

use ethnum::U256;

use crate::constants::{MAX_DECIMAL_DIFF, Q128, Q192, Q64};
use crate::errors::{MathError, MathResult};
use crate::math::full_math::{mul_div_floor, pow10, to_u128};

/// Precomputed decimal and output scaling.
///
/// `factor = output_multiplier * 10^(asset_decimals - quote_decimals)`. A
/// negative exponent is carried as `divisor` and applied after conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceScale {
    factor: U256,
    divisor: U256,
}

impl PriceScale {
    pub fn new(output_multiplier: u128, asset_decimals: u8, quote_decimals: u8) -> MathResult<Self> {
        if output_multiplier == 0 {
            return Err(MathError::InvalidDecimals);
        }
        let diff = asset_decimals.abs_diff(quote_decimals);
        if diff > MAX_DECIMAL_DIFF {
            return Err(MathError::InvalidDecimals);
        }

        let power = pow10(u32::from(diff))?;
        let multiplier = U256::new(output_multiplier);

        if asset_decimals >= quote_decimals {
            Ok(Self {
                factor: multiplier.checked_mul(power).ok_or(MathError::Overflow)?,
                divisor: U256::ONE,
            })
        } else {
            Ok(Self {
                factor: multiplier,
                divisor: power,
            })
        }
    }

    pub fn factor(&self) -> U256 {
        self.factor
    }

    pub fn divisor(&self) -> U256 {
        self.divisor
    }
}

/// Convert a sqrt ratio into a price scaled by `scale`.
pub fn price_from_sqrt_ratio(
    sqrt_ratio: U256,
    asset_is_token0: bool,
    scale: &PriceScale,
) -> MathResult<u128> {
    let scaled = if asset_is_token0 {
        quote_per_token0(sqrt_ratio, scale.factor)?
    } else {
        quote_per_token1(sqrt_ratio, scale.factor)?
    };

    to_u128(scaled / scale.divisor)
}

/// `sqrt^2 * factor / 2^192`
fn quote_per_token0(sqrt_ratio: U256, factor: U256) -> MathResult<U256> {
    if sqrt_ratio == U256::ZERO {
        return Ok(U256::ZERO);
    }

    if sqrt_ratio <= U256::new(u128::MAX) {
        // Small ratio: the square fits in 256 bits, multiply then shift
        let ratio_x192 = sqrt_ratio * sqrt_ratio;
        let fast = (ratio_x192 >> 96u32)
            .checked_mul(factor)
            .map(|product| product >> 96u32);

        match fast {
            Some(price) if price != U256::ZERO => Ok(price),
            // Overflowed or lost everything to the early shift
            _ => mul_div_floor(ratio_x192, factor, Q192),
        }
    } else {
        // Large ratio: shift the square down first so it stays in range
        let ratio_x128 = mul_div_floor(sqrt_ratio, sqrt_ratio, Q64)?;
        mul_div_floor(ratio_x128, factor, Q128)
    }
}

/// `2^192 * factor / sqrt^2`, with both operands reduced by 2^64
fn quote_per_token1(sqrt_ratio: U256, factor: U256) -> MathResult<U256> {
    if sqrt_ratio == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }

    let reduced_square = mul_div_floor(sqrt_ratio, sqrt_ratio, Q64)?;
    if reduced_square == U256::ZERO {
        // sqrt < 2^32: the unreduced square is small enough to divide by directly
        return mul_div_floor(Q192, factor, sqrt_ratio * sqrt_ratio);
    }

    mul_div_floor(Q128, factor, reduced_square)
}
