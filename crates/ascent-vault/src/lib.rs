//! # Ascent Vault
//!
//! A milestone-gated release vault. The deposit is split across eighteen
//! price milestones; each unlock pays one share to four fixed recipients.
//!
//! The vault consumes two capabilities supplied by its host: a
//! `PriceSource` (from `ascent-core`) and a `Ledger` that moves tokens.
//! Time is always passed in by the caller.

pub mod config;
pub mod distribution;
pub mod error;
pub mod events;
pub mod ledger;
pub mod milestone;
pub mod state;
pub mod vault;

// Re-export commonly used items
pub use config::{Recipient, RecipientRole, RecipientTable, VaultConfig};
pub use distribution::{DistributionPlan, DistributionShare, PayoutFailure};
pub use error::{LedgerError, VaultError, VaultResult};
pub use events::VaultEvent;
pub use ledger::Ledger;
pub use milestone::{Milestone, MILESTONE_COUNT};
pub use state::{VaultSnapshot, VaultState};
pub use vault::{MilestoneStatus, MilestoneVault, ProgressOutcome, TryProgressOutcome, VaultInfo};
