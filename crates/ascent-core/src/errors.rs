//! # Core Error Types
//!
//! Errors raised by the numeric layer, by price capabilities and by the
//! aggregator's administrative surface.

use thiserror::Error;

/// Fixed-point arithmetic failures. The numeric layer never swallows these.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum MathError {
    #[error("Math overflow")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Tick {0} out of range")]
    TickOutOfRange(i32),

    #[error("Sqrt ratio out of range")]
    SqrtRatioOutOfRange,

    #[error("Decimal difference too large")]
    InvalidDecimals,
}

/// Result type for the numeric layer
pub type MathResult<T> = Result<T, MathError>;

/// Failure reported by an external price or pool capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Insufficient observation history")]
    InsufficientHistory,

    #[error("Malformed observation data")]
    MalformedObservation,

    #[error("Price computation failed: {0}")]
    Math(#[from] MathError),
}

impl SourceError {
    /// Create an unavailable error with a reason
    pub fn unavailable(reason: &str) -> Self {
        Self::Unavailable(reason.to_string())
    }
}

/// Configuration errors from oracle construction and aggregator administration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Caller is not the owner")]
    Unauthorized,

    #[error("Aggregator is frozen")]
    Frozen,

    #[error("Zero identity")]
    ZeroAddress,

    #[error("Source already registered")]
    DuplicateSource,

    #[error("Source not found")]
    SourceNotFound,

    #[error("Too many sources: {0} (max {1})")]
    TooManySources(usize, usize),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Tracked asset is not one of the pool tokens")]
    AssetNotInPool,

    #[error(transparent)]
    Math(#[from] MathError),
}

impl OracleError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(name: &'static str, reason: &str) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.to_string(),
        }
    }
}

/// Result type for oracle configuration
pub type OracleResult<T> = Result<T, OracleError>;
