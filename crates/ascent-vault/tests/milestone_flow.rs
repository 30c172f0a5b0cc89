//! End-to-end milestone flows against the in-memory ledger.

use std::sync::Arc;

use ascent_core::oracle::PriceSource;
use ascent_core::AccountId;
use ascent_test_utils::{account, init_tracing, InMemoryLedger, SwitchablePriceSource, SECONDS_PER_DAY as DAY};
use ascent_vault::{
    Ledger, LedgerError, MilestoneVault, ProgressOutcome, RecipientTable, VaultConfig, VaultError, VaultEvent,
    VaultSnapshot, MILESTONE_COUNT,
};
use proptest::prelude::*;

const DEPOSIT: u128 = 1_000_003;

struct Harness {
    owner: AccountId,
    vault_account: AccountId,
    vault: MilestoneVault,
    price: Arc<SwitchablePriceSource>,
    ledger: InMemoryLedger,
}

fn recipients() -> RecipientTable {
    RecipientTable::with_default_ratios(account(10), account(11), account(12), account(13))
}

fn harness(price: u128) -> Harness {
    init_tracing();
    let owner = account(1);
    let vault_account = account(2);
    let mut vault =
        MilestoneVault::new(owner, vault_account, account(3), VaultConfig::new(recipients())).unwrap();

    let source = Arc::new(SwitchablePriceSource::new(price));
    vault.set_price_source(&owner, account(4), source.clone()).unwrap();

    let mut ledger = InMemoryLedger::new();
    ledger.mint(owner, DEPOSIT);
    vault.deposit_and_initialize(&owner, DEPOSIT, &mut ledger).unwrap();

    Harness {
        owner,
        vault_account,
        vault,
        price: source,
        ledger,
    }
}

#[test]
fn test_full_release_schedule() {
    let mut h = harness(10_000);
    let mut now = DAY;

    for id in 1..=MILESTONE_COUNT {
        let mut unlocked = false;
        for _ in 0..30 {
            let outcome = h.vault.try_progress(id, now, &mut h.ledger).unwrap();
            if outcome.unlocked.is_some() {
                unlocked = true;
                break;
            }
            now += DAY;
        }
        assert!(unlocked, "milestone {} never unlocked", id);
    }

    let info = h.vault.vault_info(&h.ledger);
    assert_eq!(info.unlocked_count, MILESTONE_COUNT);
    assert_eq!(info.per_milestone_amount, 55_555);
    assert_eq!(info.total_distributed, DEPOSIT);
    assert_eq!(info.balance, 0);

    let paid: u128 = (10..=13).map(|n| h.ledger.balance_of(&account(n))).sum();
    assert_eq!(paid, DEPOSIT);
    assert_eq!(h.ledger.total_supply(), DEPOSIT);

    // Last unlock sweeps the floor-division remainder
    let last_amount = h
        .vault
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            VaultEvent::MilestoneUnlocked { milestone: 18, amount, .. } => Some(amount),
            _ => None,
        })
        .next();
    assert_eq!(last_amount, Some(55_568));

    assert!(h.vault.milestones().iter().all(|m| m.unlocked));
    assert!(!h.vault.can_finalize(1, now).0);
}

#[test]
fn test_hard_and_soft_paths_diverge() {
    let mut h = harness(5);
    let before = h.vault.snapshot();

    assert_eq!(
        h.vault.finalize(1, DAY, &mut h.ledger),
        Err(VaultError::PriceBelowTarget { price: 5, target: 10 })
    );

    let outcome = h.vault.try_progress(1, DAY, &mut h.ledger).unwrap();
    assert_eq!(outcome.progress, ProgressOutcome::BelowTarget { price: 5, target: 10 });
    assert!(outcome.unlocked.is_none());
    assert_eq!(h.vault.snapshot(), before);

    h.price.set_failing();
    assert!(matches!(
        h.vault.finalize(1, DAY, &mut h.ledger),
        Err(VaultError::PriceUnavailable(_))
    ));
    let outcome = h.vault.try_progress(1, DAY, &mut h.ledger).unwrap();
    assert_eq!(outcome.progress, ProgressOutcome::PriceUnavailable);
    assert_eq!(h.vault.snapshot(), before);
}

#[test]
fn test_repeated_progress_within_a_period_is_idempotent() {
    let mut h = harness(10);

    for offset in [0, 1, 60, DAY - 1] {
        h.vault.record_progress(1, DAY + offset).unwrap();
    }
    assert_eq!(h.vault.milestones()[0].good_periods, 1);

    h.vault.record_progress(1, 2 * DAY).unwrap();
    assert_eq!(h.vault.milestones()[0].good_periods, 2);
}

#[test]
fn test_try_progress_counts_one_period_per_interval() {
    let mut h = harness(25);

    let first = h.vault.try_progress(1, DAY, &mut h.ledger).unwrap();
    assert_eq!(first.progress, ProgressOutcome::Recorded { good_periods: 1 });

    let second = h.vault.try_progress(1, DAY + DAY / 2, &mut h.ledger).unwrap();
    assert_eq!(second.progress, ProgressOutcome::TooSoon { next_at: 2 * DAY });
    assert!(second.unlocked.is_none());
    assert_eq!(h.vault.milestones()[0].good_periods, 1);

    let third = h.vault.try_progress(1, 2 * DAY, &mut h.ledger).unwrap();
    assert_eq!(third.progress, ProgressOutcome::Recorded { good_periods: 2 });
}

#[test]
fn test_frozen_source_cannot_be_replaced() {
    let mut h = harness(10);
    h.vault.freeze_price_source(&h.owner).unwrap();

    let replacement: Arc<dyn PriceSource> = Arc::new(SwitchablePriceSource::new(1));
    assert_eq!(
        h.vault.set_price_source(&h.owner, account(5), replacement),
        Err(VaultError::PriceSourceFrozen)
    );
    assert_eq!(h.vault.state().oracle_reference, Some(account(4)));
    assert!(h.vault.state().oracle_frozen);
    assert_eq!(h.vault.current_price(), 10);
}

#[test]
fn test_blocked_recipient_rolls_back_and_retries() {
    let mut h = harness(10);
    for day in 1..=3 {
        h.vault.record_progress(1, day * DAY).unwrap();
    }
    h.ledger.reject_transfers_to(account(13));
    let before = h.vault.snapshot();

    let err = h.vault.finalize(1, 3 * DAY, &mut h.ledger).unwrap_err();
    assert!(matches!(err, VaultError::DistributionFailed(_)));
    assert_eq!(h.vault.snapshot(), before);
    assert_eq!(h.ledger.balance_of(&h.vault_account), DEPOSIT);
    assert_eq!(h.ledger.balance_of(&account(10)), 0);

    h.ledger.accept_transfers_to(&account(13));
    let plan = h.vault.finalize(1, 3 * DAY, &mut h.ledger).unwrap();
    let amounts: Vec<u128> = plan.shares().iter().map(|s| s.computed_amount).collect();
    // 55_555 * 5000/9000 floors to 30_863, plus 3 dust
    assert_eq!(amounts, vec![30_866, 12_345, 6_172, 6_172]);
    assert_eq!(h.ledger.balance_of(&h.vault_account), DEPOSIT - 55_555);
}

#[test]
fn test_payout_failure_discards_progress_from_the_same_call() {
    let mut h = harness(10);
    for day in 1..=2 {
        h.vault.record_progress(1, day * DAY).unwrap();
    }
    h.vault.take_events();
    h.ledger.reject_transfers_to(account(13));
    let before = h.vault.snapshot();

    let err = h.vault.try_progress(1, 3 * DAY, &mut h.ledger).unwrap_err();
    assert!(matches!(err, VaultError::DistributionFailed(_)));
    assert_eq!(h.vault.snapshot(), before);
    assert!(h.vault.take_events().is_empty());
    assert_eq!(h.ledger.balance_of(&h.vault_account), DEPOSIT);

    h.ledger.accept_transfers_to(&account(13));
    let outcome = h.vault.try_progress(1, 3 * DAY, &mut h.ledger).unwrap();
    assert_eq!(outcome.progress, ProgressOutcome::Recorded { good_periods: 3 });
    assert!(outcome.unlocked.is_some());
}

#[test]
fn test_unreversible_payout_keeps_the_unlock() {
    let mut h = harness(10);
    for day in 1..=3 {
        h.vault.record_progress(1, day * DAY).unwrap();
    }
    h.vault.take_events();
    // Recipient 13 refuses its share and the vault refuses refunds
    h.ledger.reject_transfers_to(account(13));
    h.ledger.reject_transfers_to(h.vault_account);

    let err = h.vault.finalize(1, 3 * DAY, &mut h.ledger).unwrap_err();
    let paid = 30_866 + 12_345 + 6_172;
    assert!(matches!(
        err,
        VaultError::DistributionIncomplete { milestone: 1, paid: p, cause: LedgerError::Rejected(_) } if p == paid
    ));

    assert!(h.vault.milestones()[0].unlocked);
    assert_eq!(h.vault.state().total_distributed, paid);
    assert_eq!(h.ledger.balance_of(&h.vault_account), DEPOSIT - paid);
    assert_eq!(
        h.ledger.balance_of(&h.vault_account) + h.vault.state().total_distributed,
        DEPOSIT
    );

    let events = h.vault.take_events();
    assert!(matches!(events[0], VaultEvent::MilestoneUnlocked { milestone: 1, .. }));
    assert_eq!(events.len(), 4);

    // Nothing is paid twice once the ledger recovers
    h.ledger.accept_transfers_to(&account(13));
    h.ledger.accept_transfers_to(&h.vault_account);
    assert_eq!(
        h.vault.finalize(1, 4 * DAY, &mut h.ledger),
        Err(VaultError::AlreadyUnlocked(1))
    );
    let outcome = h.vault.try_progress(1, 4 * DAY, &mut h.ledger).unwrap();
    assert_eq!(outcome.progress, ProgressOutcome::AlreadyUnlocked);
    assert_eq!(h.ledger.balance_of(&account(10)), 30_866);
    assert_eq!(h.ledger.balance_of(&account(13)), 0);
}

#[test]
fn test_snapshot_persists_and_restores() {
    let mut h = harness(20);
    h.vault.record_progress(1, DAY).unwrap();
    h.vault.record_progress(2, DAY).unwrap();

    let bytes = h.vault.snapshot().to_bytes().unwrap();
    let snapshot = VaultSnapshot::from_bytes(&bytes).unwrap();
    assert_eq!(snapshot, h.vault.snapshot());

    let source: Arc<dyn PriceSource> = h.price.clone();
    let mut restored = MilestoneVault::restore(
        h.owner,
        h.vault_account,
        account(3),
        VaultConfig::new(recipients()),
        snapshot,
        Some(source),
    )
    .unwrap();

    assert_eq!(restored.milestones()[1].good_periods, 1);
    assert_eq!(
        restored.record_progress(2, 2 * DAY).unwrap(),
        ProgressOutcome::Recorded { good_periods: 2 }
    );
    assert_eq!(restored.take_events().len(), 1);
}

#[test]
fn test_config_loads_from_file() {
    let config = VaultConfig {
        unlock_cooldown: 3_600,
        ..VaultConfig::new(recipients())
    };
    let path = std::env::temp_dir().join(format!("ascent-vault-config-{}.toml", std::process::id()));
    config.save(&path).unwrap();

    let loaded = VaultConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);

    assert!(matches!(
        VaultConfig::load(std::env::temp_dir().join("ascent-vault-missing.toml")),
        Err(VaultError::InvalidConfig(_))
    ));
}

#[test]
fn test_events_serialize_for_hosts() {
    let mut h = harness(10);
    let events = h.vault.take_events();
    assert!(matches!(events[0], VaultEvent::PriceSourceSet { .. }));
    assert!(matches!(events[1], VaultEvent::Initialized { total_deposited: DEPOSIT, .. }));

    let json = serde_json::to_string(&events[1]).unwrap();
    assert!(json.contains("initialized"));
    assert!(h.vault.take_events().is_empty());
}

proptest! {
    /// Good periods never decrease and unlocked milestones stay unlocked
    #[test]
    fn prop_progress_is_monotonic(
        steps in prop::collection::vec((1u8..=3, 0u64..3 * DAY, 0u128..40), 1..60)
    ) {
        let mut h = harness(10);
        let mut now = 0u64;
        let mut previous: Vec<(u64, bool)> = h.vault.milestones().iter().map(|m| (m.good_periods, m.unlocked)).collect();

        for (id, advance, price) in steps {
            now += advance;
            h.price.set_price(price);
            let _ = h.vault.try_progress(id, now, &mut h.ledger);

            let current: Vec<(u64, bool)> = h.vault.milestones().iter().map(|m| (m.good_periods, m.unlocked)).collect();
            for (before, after) in previous.iter().zip(&current) {
                prop_assert!(after.0 >= before.0);
                prop_assert!(after.1 || !before.1);
            }
            prop_assert!(h.vault.state().total_distributed <= DEPOSIT);
            previous = current;
        }
    }
}
