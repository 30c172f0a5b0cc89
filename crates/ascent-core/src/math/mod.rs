//! # Mathematical Functions
//!
//! Pure fixed-point numerics shared by every oracle variant.

pub mod full_math;
pub mod price_math;
pub mod tick_math;

// Re-export commonly used functions
pub use full_math::*;
pub use price_math::*;
pub use tick_math::*;
