//! # Oracle Module
//!
//! Price capabilities and the oracles built on them: a TWAP tick reader,
//! a single-pool oracle and a multi-source aggregator. All of them implement
//! `PriceSource`, so an aggregator can stand anywhere a pool oracle can.

pub mod aggregator;
pub mod pool_oracle;
pub mod source;
pub mod twap;

pub use aggregator::*;
pub use pool_oracle::*;
pub use source::*;
pub use twap::*;
