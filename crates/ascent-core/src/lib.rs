//! # Ascent Core - Price Engine
//!
//! Fixed-point numerics and oracles shared by the milestone vault and its
//! hosts. It provides:
//!
//! - Tick / sqrt-ratio conversion over the full pool tick range
//! - Sqrt-ratio to scaled price conversion for either token order
//! - A fail-open TWAP reader and a single-pool price oracle
//! - A median-filtered multi-source aggregator
//!
//! ## Feature Flags
//!
//! - `client`: Enables serde serialization for off-chain hosts and config files

pub mod constants;
pub mod errors;
pub mod math;
pub mod oracle;
pub mod types;

// Re-export commonly used items
pub use constants::*;
pub use errors::{MathError, MathResult, OracleError, OracleResult, SourceError};
pub use types::*;
