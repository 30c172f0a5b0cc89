//! Full-precision multiply/divide on 256-bit operands.
//!
//! Intermediate products are kept in 512 bits so `a * b / denominator` is
//! exact (floor) whenever the final quotient fits in 256 bits.

use ethnum::U256;

use crate::errors::{MathError, MathResult};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round towards zero
    Down,
    /// Round away from zero
    Up,
}

/// 512-bit product of two U256 values as `(hi, lo)`
pub fn full_mul(a: U256, b: U256) -> (U256, U256) {
    let (a_hi, a_lo) = a.into_words();
    let (b_hi, b_lo) = b.into_words();

    let ll = U256::from(a_lo) * U256::from(b_lo);
    let lh = U256::from(a_lo) * U256::from(b_hi);
    let hl = U256::from(a_hi) * U256::from(b_lo);
    let hh = U256::from(a_hi) * U256::from(b_hi);

    // Middle terms straddle the 128-bit boundary
    let (mid, mid_carry) = lh.overflowing_add(hl);

    let (lo, lo_carry) = ll.overflowing_add(mid << 128u32);
    let mut hi = hh + (mid >> 128u32);
    if mid_carry {
        hi += Q128_WORD;
    }
    if lo_carry {
        hi += U256::ONE;
    }

    (hi, lo)
}

/// 2^128 expressed as a U256, the carry weight of `mid` in the high word
const Q128_WORD: U256 = U256::from_words(1, 0);

/// Compute `a * b / denominator` with a 512-bit intermediate
pub fn mul_div(a: U256, b: U256, denominator: U256, rounding: Rounding) -> MathResult<U256> {
    if denominator == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }

    let (hi, lo) = full_mul(a, b);

    let (quotient, remainder) = if hi == U256::ZERO {
        (lo / denominator, lo % denominator)
    } else {
        // Quotient must fit in 256 bits
        if hi >= denominator {
            return Err(MathError::Overflow);
        }
        div_512_by_256(hi, lo, denominator)
    };

    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up if remainder == U256::ZERO => Ok(quotient),
        Rounding::Up => quotient.checked_add(U256::ONE).ok_or(MathError::Overflow),
    }
}

/// Shorthand for `mul_div` rounding down
pub fn mul_div_floor(a: U256, b: U256, denominator: U256) -> MathResult<U256> {
    mul_div(a, b, denominator, Rounding::Down)
}

/// Restoring long division of `(hi, lo)` by `d`. Requires `hi < d`.
fn div_512_by_256(hi: U256, lo: U256, d: U256) -> (U256, U256) {
    let mut remainder = hi;
    let mut quotient = U256::ZERO;

    for i in (0..256u32).rev() {
        let carry = remainder >> 255u32;
        let bit = (lo >> i) & U256::ONE;
        remainder = (remainder << 1u32) | bit;
        quotient <<= 1u32;

        if carry == U256::ONE || remainder >= d {
            remainder = remainder.wrapping_sub(d);
            quotient |= U256::ONE;
        }
    }

    (quotient, remainder)
}

/// Narrow a U256 to u128
pub fn to_u128(value: U256) -> MathResult<u128> {
    let (hi, lo) = value.into_words();
    if hi != 0 {
        return Err(MathError::Overflow);
    }
    Ok(lo)
}

/// Ten to the power `exp` as U256
pub fn pow10(exp: u32) -> MathResult<U256> {
    let mut result = U256::ONE;
    for _ in 0..exp {
        result = result
            .checked_mul(U256::new(10))
            .ok_or(MathError::Overflow)?;
    }
    Ok(result)
}
