//! # Milestone Vault
//!
//! Holds a pre-allocated balance and releases it in eighteen steps as the
//! tracked price climbs. Each step requires the price to hold at or above
//! the milestone's target for several debounced periods, and unlocks are
//! spaced by a global cooldown.
//!
//! ## Entry points
//!
//! - `record_progress` counts a good period and never fails on unmet
//!   preconditions
//! - `finalize` unlocks a milestone or reports exactly which condition failed
//! - `try_progress` records and then finalizes when possible, absorbing unmet
//!   preconditions
//!
//! Every mutating path reads the price first, then writes state, then talks
//! to the ledger. A failed payout restores the state the call started from.
//! The one exception is a payout whose reversal also failed: tokens have
//! left the vault, so the unlock stays committed and only the amount still
//! paid out is counted as distributed.

use std::fmt;
use std::sync::Arc;

use ascent_core::oracle::PriceSource;
use ascent_core::AccountId;
use tracing::{debug, error, info, warn};

use crate::config::VaultConfig;
use crate::distribution::DistributionPlan;
use crate::error::{VaultError, VaultResult};
use crate::events::VaultEvent;
use crate::ledger::Ledger;
use crate::milestone::{milestone_index, milestone_table, target_schedule, Milestone, MILESTONE_COUNT};
use crate::state::{VaultSnapshot, VaultState};

/// What a soft progress call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    /// A good period was counted
    Recorded { good_periods: u64 },
    /// Price is below the milestone target
    BelowTarget { price: u128, target: u128 },
    /// The previous good period is too recent
    TooSoon { next_at: u64 },
    AlreadyUnlocked,
    /// The price source failed; nothing changed
    PriceUnavailable,
}

/// Result of `try_progress`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryProgressOutcome {
    pub progress: ProgressOutcome,
    /// The payout, when the milestone unlocked during this call
    pub unlocked: Option<DistributionPlan>,
}

/// Read-only milestone view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneStatus {
    pub unlocked: bool,
    pub good_periods: u64,
    pub price_target: u128,
    /// Zero when the price cannot be read
    pub current_price: u128,
    /// Whether a good period could be counted at the queried time
    pub period_ready: bool,
}

/// Read-only aggregate view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultInfo {
    pub token: AccountId,
    pub balance: u128,
    pub total_deposited: u128,
    pub per_milestone_amount: u128,
    pub total_distributed: u128,
    pub unlocked_count: u8,
    pub initialized: bool,
}

pub struct MilestoneVault {
    owner: AccountId,
    /// Ledger holder of the vault's own balance
    account: AccountId,
    token: AccountId,
    config: VaultConfig,
    state: VaultState,
    milestones: Vec<Milestone>,
    price_source: Option<Arc<dyn PriceSource>>,
    events: Vec<VaultEvent>,
}

impl fmt::Debug for MilestoneVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MilestoneVault")
            .field("owner", &self.owner)
            .field("account", &self.account)
            .field("token", &self.token)
            .field("state", &self.state)
            .field("unlocked", &self.unlocked_count())
            .finish()
    }
}

impl MilestoneVault {
    pub fn new(owner: AccountId, account: AccountId, token: AccountId, config: VaultConfig) -> VaultResult<Self> {
        if owner.is_zero() || account.is_zero() || token.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        config.validate()?;

        Ok(Self {
            owner,
            account,
            token,
            config,
            state: VaultState::default(),
            milestones: milestone_table(),
            price_source: None,
            events: Vec::new(),
        })
    }

    /// Rebuild a vault from a persisted snapshot.
    ///
    /// `price_source` must be supplied exactly when the snapshot records a
    /// price source reference.
    pub fn restore(
        owner: AccountId,
        account: AccountId,
        token: AccountId,
        config: VaultConfig,
        snapshot: VaultSnapshot,
        price_source: Option<Arc<dyn PriceSource>>,
    ) -> VaultResult<Self> {
        let mut vault = Self::new(owner, account, token, config)?;

        if snapshot.milestones.len() != usize::from(MILESTONE_COUNT) {
            return Err(VaultError::invalid_config(&format!(
                "snapshot holds {} milestones, expected {}",
                snapshot.milestones.len(),
                MILESTONE_COUNT
            )));
        }
        for (expected, milestone) in vault.milestones.iter().zip(&snapshot.milestones) {
            if milestone.id != expected.id || milestone.price_target != expected.price_target {
                return Err(VaultError::invalid_config(&format!(
                    "snapshot milestone {} does not match the target schedule",
                    milestone.id
                )));
            }
        }

        match (&snapshot.state.oracle_reference, &price_source) {
            (Some(_), None) => return Err(VaultError::PriceSourceNotSet),
            (None, Some(_)) => {
                return Err(VaultError::invalid_config("price source supplied without a reference"))
            }
            _ => {}
        }
        if snapshot.state.oracle_frozen && snapshot.state.oracle_reference.is_none() {
            return Err(VaultError::invalid_config("frozen without a price source reference"));
        }
        if snapshot.state.total_distributed > snapshot.state.total_deposited {
            return Err(VaultError::invalid_config("distributed exceeds deposited"));
        }

        vault.state = snapshot.state;
        vault.milestones = snapshot.milestones;
        vault.price_source = price_source;
        Ok(vault)
    }

    pub fn snapshot(&self) -> VaultSnapshot {
        VaultSnapshot {
            state: self.state.clone(),
            milestones: self.milestones.clone(),
        }
    }

    // ========================================================================
    // Administration
    // ========================================================================

    fn ensure_owner(&self, caller: &AccountId) -> VaultResult<()> {
        if *caller != self.owner {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    /// Configure the price source. Allowed once, and never after freezing.
    pub fn set_price_source(
        &mut self,
        caller: &AccountId,
        reference: AccountId,
        source: Arc<dyn PriceSource>,
    ) -> VaultResult<()> {
        self.ensure_owner(caller)?;
        if self.state.oracle_frozen {
            return Err(VaultError::PriceSourceFrozen);
        }
        if reference.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        if self.state.oracle_reference.is_some() {
            return Err(VaultError::PriceSourceAlreadySet);
        }

        self.state.oracle_reference = Some(reference);
        self.price_source = Some(source);
        self.events.push(VaultEvent::PriceSourceSet { reference });
        info!(reference = %reference, "Price source set");
        Ok(())
    }

    /// Permanently lock the configured price source
    pub fn freeze_price_source(&mut self, caller: &AccountId) -> VaultResult<()> {
        self.ensure_owner(caller)?;
        if self.state.oracle_frozen {
            return Err(VaultError::PriceSourceFrozen);
        }
        let reference = self.state.oracle_reference.ok_or(VaultError::PriceSourceNotSet)?;

        self.state.oracle_frozen = true;
        self.events.push(VaultEvent::PriceSourceFrozen { reference });
        info!(reference = %reference, "Price source frozen");
        Ok(())
    }

    /// Record a deposit that has already been transferred to the vault account
    pub fn initialize<L: Ledger + ?Sized>(&mut self, caller: &AccountId, amount: u128, ledger: &L) -> VaultResult<()> {
        self.check_initialize(caller, amount)?;

        let balance = ledger.balance_of(&self.account);
        if balance < amount {
            return Err(VaultError::invalid_amount(&format!(
                "vault balance {} below deposit {}",
                balance, amount
            )));
        }

        self.apply_initialize(amount);
        Ok(())
    }

    /// Pull `amount` from the caller into the vault account and initialize
    pub fn deposit_and_initialize<L: Ledger + ?Sized>(
        &mut self,
        caller: &AccountId,
        amount: u128,
        ledger: &mut L,
    ) -> VaultResult<()> {
        self.check_initialize(caller, amount)?;

        let saved = self.state.clone();
        let event_mark = self.events.len();
        self.apply_initialize(amount);

        if let Err(e) = ledger.transfer(caller, &self.account, amount) {
            self.state = saved;
            self.events.truncate(event_mark);
            warn!(amount, error = %e, "Deposit transfer failed");
            return Err(VaultError::DepositFailed(e));
        }
        Ok(())
    }

    fn check_initialize(&self, caller: &AccountId, amount: u128) -> VaultResult<()> {
        self.ensure_owner(caller)?;
        if self.state.initialized {
            return Err(VaultError::AlreadyInitialized);
        }
        if amount < u128::from(MILESTONE_COUNT) {
            return Err(VaultError::invalid_amount(&format!(
                "deposit {} cannot fund {} milestones",
                amount, MILESTONE_COUNT
            )));
        }
        Ok(())
    }

    fn apply_initialize(&mut self, amount: u128) {
        let per_milestone_amount = amount / u128::from(MILESTONE_COUNT);
        self.state.total_deposited = amount;
        self.state.per_milestone_amount = per_milestone_amount;
        self.state.initialized = true;
        self.events.push(VaultEvent::Initialized {
            total_deposited: amount,
            per_milestone_amount,
        });
        info!(amount, per_milestone_amount, "Vault initialized");
    }

    // ========================================================================
    // Progress
    // ========================================================================

    fn source(&self) -> VaultResult<&Arc<dyn PriceSource>> {
        self.price_source.as_ref().ok_or(VaultError::PriceSourceNotSet)
    }

    fn read_price(&self) -> VaultResult<u128> {
        Ok(self.source()?.get_price()?)
    }

    /// Count a good period for milestone `id` if the price holds its target
    pub fn record_progress(&mut self, id: u8, now: u64) -> VaultResult<ProgressOutcome> {
        let index = milestone_index(id)?;
        if !self.state.initialized {
            return Err(VaultError::NotInitialized);
        }
        self.source()?;

        if self.milestones[index].unlocked {
            return Ok(ProgressOutcome::AlreadyUnlocked);
        }

        match self.read_price() {
            Ok(price) => Ok(self.apply_progress(index, price, now)),
            Err(e) => {
                debug!(milestone = id, error = %e, "Price unavailable, progress skipped");
                Ok(ProgressOutcome::PriceUnavailable)
            }
        }
    }

    fn apply_progress(&mut self, index: usize, price: u128, now: u64) -> ProgressOutcome {
        let interval = self.config.period_interval;
        let milestone = &mut self.milestones[index];

        if milestone.unlocked {
            return ProgressOutcome::AlreadyUnlocked;
        }
        if price < milestone.price_target {
            return ProgressOutcome::BelowTarget {
                price,
                target: milestone.price_target,
            };
        }
        if !milestone.period_elapsed(now, interval) {
            let next_at = milestone.last_good_timestamp.saturating_add(interval);
            debug!(milestone = milestone.id, now, next_at, "Good period debounced");
            return ProgressOutcome::TooSoon { next_at };
        }

        let good_periods = milestone.record_good_period(now);
        let id = milestone.id;
        self.events.push(VaultEvent::GoodPeriodRecorded {
            milestone: id,
            good_periods,
            price,
            timestamp: now,
        });
        debug!(milestone = id, good_periods, price, "Good period recorded");
        ProgressOutcome::Recorded { good_periods }
    }

    /// Unlock milestone `id` and pay it out, or fail with the unmet condition
    pub fn finalize<L: Ledger + ?Sized>(&mut self, id: u8, now: u64, ledger: &mut L) -> VaultResult<DistributionPlan> {
        let index = milestone_index(id)?;
        self.check_ready(index)?;
        self.check_cooldown(now)?;
        let price = self.read_price()?;
        self.check_price_and_periods(index, price)?;
        self.unlock(index, now, price, ledger)
    }

    /// Record progress, then finalize when every condition holds.
    ///
    /// Unmet preconditions and price failures are absorbed. Configuration
    /// errors and payout failures are returned.
    pub fn try_progress<L: Ledger + ?Sized>(
        &mut self,
        id: u8,
        now: u64,
        ledger: &mut L,
    ) -> VaultResult<TryProgressOutcome> {
        let index = milestone_index(id)?;
        if !self.state.initialized {
            return Err(VaultError::NotInitialized);
        }
        self.source()?;

        if self.milestones[index].unlocked {
            return Ok(TryProgressOutcome {
                progress: ProgressOutcome::AlreadyUnlocked,
                unlocked: None,
            });
        }

        // One price read serves both steps
        let price = match self.read_price() {
            Ok(price) => price,
            Err(e) => {
                debug!(milestone = id, error = %e, "Price unavailable, progress skipped");
                return Ok(TryProgressOutcome {
                    progress: ProgressOutcome::PriceUnavailable,
                    unlocked: None,
                });
            }
        };

        let saved_milestone = self.milestones[index].clone();
        let event_mark = self.events.len();
        let progress = self.apply_progress(index, price, now);

        let ready = self
            .check_cooldown(now)
            .and_then(|_| self.check_price_and_periods(index, price));
        let unlocked = match ready {
            Ok(()) => self.unlock(index, now, price, ledger),
            Err(e) if e.is_precondition() => {
                debug!(milestone = id, reason = %e, "Milestone not ready");
                return Ok(TryProgressOutcome {
                    progress,
                    unlocked: None,
                });
            }
            Err(e) => Err(e),
        };

        match unlocked {
            Ok(plan) => Ok(TryProgressOutcome {
                progress,
                unlocked: Some(plan),
            }),
            // Tokens left the vault; the period and the unlock both stand
            Err(e @ VaultError::DistributionIncomplete { .. }) => Err(e),
            Err(e) => {
                self.milestones[index] = saved_milestone;
                self.events.truncate(event_mark);
                Err(e)
            }
        }
    }

    fn check_ready(&self, index: usize) -> VaultResult<()> {
        if !self.state.initialized {
            return Err(VaultError::NotInitialized);
        }
        let milestone = &self.milestones[index];
        if milestone.unlocked {
            return Err(VaultError::AlreadyUnlocked(milestone.id));
        }
        self.source()?;
        Ok(())
    }

    fn check_cooldown(&self, now: u64) -> VaultResult<()> {
        // No cooldown before the first unlock
        if self.unlocked_count() == 0 {
            return Ok(());
        }
        let ready_at = self.state.last_unlock_time.saturating_add(self.config.unlock_cooldown);
        if now < ready_at {
            return Err(VaultError::CooldownActive { ready_at });
        }
        Ok(())
    }

    fn check_price_and_periods(&self, index: usize, price: u128) -> VaultResult<()> {
        let milestone = &self.milestones[index];
        if price < milestone.price_target {
            return Err(VaultError::PriceBelowTarget {
                price,
                target: milestone.price_target,
            });
        }
        if milestone.good_periods < self.config.required_periods {
            return Err(VaultError::InsufficientGoodPeriods {
                have: milestone.good_periods,
                need: self.config.required_periods,
            });
        }
        Ok(())
    }

    /// Amount the milestone at `index` releases. The last one sweeps the remainder.
    fn release_amount(&self, index: usize) -> u128 {
        let others_locked = self
            .milestones
            .iter()
            .enumerate()
            .any(|(i, m)| i != index && !m.unlocked);
        if others_locked {
            self.state.per_milestone_amount.min(self.state.remaining())
        } else {
            self.state.remaining()
        }
    }

    fn unlock<L: Ledger + ?Sized>(
        &mut self,
        index: usize,
        now: u64,
        price: u128,
        ledger: &mut L,
    ) -> VaultResult<DistributionPlan> {
        let amount = self.release_amount(index);
        let plan = DistributionPlan::compute(amount, &self.config.distribution)?;
        let id = self.milestones[index].id;

        let saved_state = self.state.clone();
        let saved_milestone = self.milestones[index].clone();
        let event_mark = self.events.len();

        self.milestones[index].unlocked = true;
        self.state.last_unlock_time = now;
        self.state.last_unlock_price = price;
        self.state.total_distributed = self.state.total_distributed.saturating_add(amount);
        self.events.push(VaultEvent::MilestoneUnlocked {
            milestone: id,
            price,
            amount,
            timestamp: now,
        });

        if let Err(failure) = plan.execute(ledger, &self.account) {
            if failure.rolled_back() {
                self.state = saved_state;
                self.milestones[index] = saved_milestone;
                self.events.truncate(event_mark);
                warn!(milestone = id, amount, error = %failure.cause, "Distribution failed, unlock rolled back");
                return Err(VaultError::DistributionFailed(failure.cause));
            }

            // Count only what recipients still hold
            let paid = failure.stranded_amount();
            self.state.total_distributed = saved_state.total_distributed.saturating_add(paid);
            for share in &failure.stranded {
                self.events.push(VaultEvent::Distributed {
                    milestone: id,
                    role: share.role,
                    recipient: share.recipient,
                    amount: share.computed_amount,
                });
            }
            error!(
                milestone = id,
                amount,
                paid,
                error = %failure.cause,
                "Distribution could not be reversed, unlock kept"
            );
            return Err(VaultError::DistributionIncomplete {
                milestone: id,
                paid,
                cause: failure.cause,
            });
        }

        for share in plan.shares() {
            self.events.push(VaultEvent::Distributed {
                milestone: id,
                role: share.role,
                recipient: share.recipient,
                amount: share.computed_amount,
            });
        }
        info!(milestone = id, price, amount, "Milestone unlocked");
        Ok(plan)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Whether `finalize(id, now)` would currently succeed, and why not
    pub fn can_finalize(&self, id: u8, now: u64) -> (bool, String) {
        let readiness = milestone_index(id).and_then(|index| {
            self.check_ready(index)?;
            self.check_cooldown(now)?;
            let price = self.read_price()?;
            self.check_price_and_periods(index, price)
        });

        match readiness {
            Ok(()) => (true, "Ready to finalize".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }

    pub fn milestone_status(&self, id: u8, now: u64) -> VaultResult<MilestoneStatus> {
        let milestone = &self.milestones[milestone_index(id)?];
        Ok(MilestoneStatus {
            unlocked: milestone.unlocked,
            good_periods: milestone.good_periods,
            price_target: milestone.price_target,
            current_price: self.current_price(),
            period_ready: !milestone.unlocked && milestone.period_elapsed(now, self.config.period_interval),
        })
    }

    /// Current price, or zero when it cannot be read
    pub fn current_price(&self) -> u128 {
        self.read_price().unwrap_or(0)
    }

    pub fn vault_info<L: Ledger + ?Sized>(&self, ledger: &L) -> VaultInfo {
        VaultInfo {
            token: self.token,
            balance: ledger.balance_of(&self.account),
            total_deposited: self.state.total_deposited,
            per_milestone_amount: self.state.per_milestone_amount,
            total_distributed: self.state.total_distributed,
            unlocked_count: self.unlocked_count(),
            initialized: self.state.initialized,
        }
    }

    pub fn unlocked_count(&self) -> u8 {
        self.milestones.iter().filter(|m| m.unlocked).count() as u8
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn targets(&self) -> Vec<u128> {
        target_schedule()
    }

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn token(&self) -> AccountId {
        self.token
    }

    /// Drain queued events
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }
}
