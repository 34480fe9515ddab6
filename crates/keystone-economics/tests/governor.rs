use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use keystone_audit::NullEvidenceSink;
use keystone_economics::{
    BudgetLedger, EconomicAction, EconomicGovernor, FixedClock, GovernorConfig, GovernorError,
    JsonFileLedgerStore, LedgerStore,
};
use keystone_types::{ComputeProvider, CostEstimate, UsdAmount};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn file_governor(path: &std::path::Path, clock: Arc<FixedClock>) -> EconomicGovernor {
    EconomicGovernor::load(
        &GovernorConfig::default(),
        Box::new(JsonFileLedgerStore::new(path)),
        clock,
        Arc::new(NullEvidenceSink),
    )
}

#[test]
fn test_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let clock = Arc::new(FixedClock::new(today()));

    {
        let gov = file_governor(&path, clock.clone());
        gov.record_spend(UsdAmount::from_cents(60)).unwrap();
        gov.record_spend(UsdAmount::from_cents(30)).unwrap();
    }

    let gov = file_governor(&path, clock);
    let snapshot = gov.snapshot();
    assert_eq!(snapshot.spent_today, UsdAmount::from_cents(90));
    assert_eq!(snapshot.calls_today, 2);

    let estimate = CostEstimate::cloud(ComputeProvider::PrivateCloud, UsdAmount::from_cents(15));
    assert_eq!(gov.evaluate(&estimate).action, EconomicAction::DowngradeToOnDevice);
}

#[test]
fn test_restart_on_next_day_resets_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    let clock = Arc::new(FixedClock::new(today()));

    file_governor(&path, clock.clone())
        .record_spend(UsdAmount::from_cents(99))
        .unwrap();

    clock.advance_days(1);
    let gov = file_governor(&path, clock);
    assert_eq!(gov.snapshot().spent_today, UsdAmount::ZERO);

    let persisted = JsonFileLedgerStore::new(&path).load().unwrap().unwrap();
    assert_eq!(persisted.spent_today, UsdAmount::ZERO);
    assert_eq!(persisted.last_reset_date, today().succ_opt().unwrap());
}

#[test]
fn test_corrupt_ledger_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, b"\x00\x01garbage").unwrap();

    let gov = file_governor(&path, Arc::new(FixedClock::new(today())));
    let snapshot = gov.snapshot();
    assert_eq!(snapshot.daily_budget, UsdAmount::from_cents(100));
    assert_eq!(snapshot.spent_today, UsdAmount::ZERO);
}

#[test]
fn test_concurrent_spend_is_not_double_counted() {
    let dir = tempfile::tempdir().unwrap();
    let gov = Arc::new(file_governor(
        &dir.path().join("ledger.json"),
        Arc::new(FixedClock::new(today())),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gov = Arc::clone(&gov);
            thread::spawn(move || {
                for _ in 0..25 {
                    gov.record_spend(UsdAmount::from_micros(1_000)).unwrap();
                    gov.evaluate(&CostEstimate::cloud(
                        ComputeProvider::PrivateCloud,
                        UsdAmount::from_micros(1_000),
                    ));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = gov.snapshot();
    assert_eq!(snapshot.calls_today, 200);
    assert_eq!(snapshot.spent_today, UsdAmount::from_micros(200_000));
}

/// Store whose saves fail while `failing` is set
struct FlakyStore {
    failing: Arc<AtomicBool>,
}

impl LedgerStore for FlakyStore {
    fn load(&self) -> keystone_economics::Result<Option<BudgetLedger>> {
        Ok(None)
    }

    fn save(&self, _ledger: &BudgetLedger) -> keystone_economics::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(GovernorError::Persistence("disk full".to_string()))
        } else {
            Ok(())
        }
    }
}

#[test]
fn test_failed_save_leaves_spend_uncounted() {
    let failing = Arc::new(AtomicBool::new(true));
    let gov = EconomicGovernor::load(
        &GovernorConfig::default(),
        Box::new(FlakyStore {
            failing: Arc::clone(&failing),
        }),
        Arc::new(FixedClock::new(today())),
        Arc::new(NullEvidenceSink),
    );

    assert!(gov.record_spend(UsdAmount::from_cents(10)).is_err());
    assert!(gov.record_spend(UsdAmount::from_cents(10)).is_err());
    assert!(gov
        .set_limits(UsdAmount::from_cents(500), UsdAmount::from_cents(50))
        .is_err());
    let snapshot = gov.snapshot();
    assert_eq!(snapshot.spent_today, UsdAmount::ZERO);
    assert_eq!(snapshot.calls_today, 0);
    assert_eq!(snapshot.daily_budget, UsdAmount::from_cents(100));

    // A retry after the store recovers is counted exactly once.
    failing.store(false, Ordering::SeqCst);
    let snapshot = gov.record_spend(UsdAmount::from_cents(10)).unwrap();
    assert_eq!(snapshot.spent_today, UsdAmount::from_cents(10));
    assert_eq!(snapshot.calls_today, 1);
}
