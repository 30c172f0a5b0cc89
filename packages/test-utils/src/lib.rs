//! Test doubles shared by the Ascent integration tests.

pub mod ledger;
pub mod pool;
pub mod sources;

use std::sync::Once;

use ascent_core::AccountId;
use tracing_subscriber::EnvFilter;

pub use ledger::InMemoryLedger;
pub use pool::MockPool;
pub use sources::{FailingPriceSource, StaticPriceSource, SwitchablePriceSource};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Deterministic non-zero identity
pub fn account(n: u8) -> AccountId {
    let mut bytes = [n; 32];
    bytes[0] = 0xA5;
    AccountId::new(bytes)
}

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`, once per process
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
