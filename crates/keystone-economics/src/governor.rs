//! The economic governor

use std::sync::Arc;

use keystone_audit::{record_best_effort, EvidenceComponent, EvidenceEvent, EvidenceSink};
use keystone_types::{CostEstimate, UsdAmount};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{BudgetLedger, Clock, GovernorConfig, GovernorError, LedgerStore, Result};

/// What the caller should do with a paid-compute request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomicAction {
    Proceed,
    /// Retry with a cheaper cloud model
    DowngradeModel,
    /// Fall back to on-device computation
    DowngradeToOnDevice,
}

impl EconomicAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EconomicAction::Proceed => "proceed",
            EconomicAction::DowngradeModel => "downgrade_model",
            EconomicAction::DowngradeToOnDevice => "downgrade_to_on_device",
        }
    }
}

/// Outcome of [`EconomicGovernor::evaluate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicDecision {
    pub action: EconomicAction,
    pub reason: String,
    pub estimated_cost: UsdAmount,
    pub remaining_budget: UsdAmount,
}

/// Budget gate for paid (cloud) computation
///
/// Construct one per process and pass it by reference; all ledger access is
/// serialized through the internal mutex, which is held across the whole
/// roll-decide-persist sequence of each operation.
pub struct EconomicGovernor {
    ledger: Mutex<BudgetLedger>,
    store: Box<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    evidence: Arc<dyn EvidenceSink>,
}

impl EconomicGovernor {
    /// Load the persisted ledger, falling back to config defaults when it is
    /// absent or unreadable
    pub fn load(
        config: &GovernorConfig,
        store: Box<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        evidence: Arc<dyn EvidenceSink>,
    ) -> Self {
        let today = clock.today();
        let ledger = match store.load() {
            Ok(Some(ledger)) => ledger,
            Ok(None) => {
                debug!("no persisted budget ledger, starting from defaults");
                BudgetLedger::new(config, today)
            }
            Err(e) => {
                warn!(error = %e, "budget ledger unreadable, starting from defaults");
                BudgetLedger::new(config, today)
            }
        };

        Self {
            ledger: Mutex::new(ledger),
            store,
            clock,
            evidence,
        }
    }

    /// Decide whether a computation may proceed under the budget
    pub fn evaluate(&self, estimate: &CostEstimate) -> EconomicDecision {
        let mut ledger = self.ledger.lock();
        self.roll_locked(&mut ledger);

        let remaining = ledger.remaining();
        let decision = if !estimate.requires_paid_call {
            EconomicDecision {
                action: EconomicAction::Proceed,
                reason: "on-device computation has no cost".to_string(),
                estimated_cost: UsdAmount::ZERO,
                remaining_budget: remaining,
            }
        } else if estimate.estimated_cost > ledger.per_call_ceiling {
            EconomicDecision {
                action: EconomicAction::DowngradeModel,
                reason: format!(
                    "estimate {} exceeds per-call ceiling {}",
                    estimate.estimated_cost, ledger.per_call_ceiling
                ),
                estimated_cost: estimate.estimated_cost,
                remaining_budget: remaining,
            }
        } else if ledger.spent_today + estimate.estimated_cost > ledger.daily_budget {
            EconomicDecision {
                action: EconomicAction::DowngradeToOnDevice,
                reason: format!(
                    "estimate {} exceeds remaining daily budget {}",
                    estimate.estimated_cost, remaining
                ),
                estimated_cost: estimate.estimated_cost,
                remaining_budget: remaining,
            }
        } else {
            EconomicDecision {
                action: EconomicAction::Proceed,
                reason: "within budget".to_string(),
                estimated_cost: estimate.estimated_cost,
                remaining_budget: remaining,
            }
        };
        drop(ledger);

        match decision.action {
            EconomicAction::Proceed => debug!(
                paid = estimate.requires_paid_call,
                estimated_micros = decision.estimated_cost.micros(),
                "compute request within budget"
            ),
            action => info!(
                action = action.as_str(),
                estimated_micros = decision.estimated_cost.micros(),
                remaining_micros = decision.remaining_budget.micros(),
                "compute request downgraded"
            ),
        }

        record_best_effort(
            self.evidence.as_ref(),
            EvidenceComponent::Governor,
            EvidenceEvent::EconomicDecision {
                action: decision.action.as_str().to_string(),
                paid: estimate.requires_paid_call,
                estimated_micros: decision.estimated_cost.micros(),
                remaining_micros: decision.remaining_budget.micros(),
            },
        );

        decision
    }

    /// Record the actual cost of a completed paid call
    pub fn record_spend(&self, actual: UsdAmount) -> Result<BudgetLedger> {
        if actual.is_negative() {
            return Err(GovernorError::InvalidAmount(format!(
                "spend must not be negative ({})",
                actual
            )));
        }

        let mut ledger = self.ledger.lock();
        self.roll_locked(&mut ledger);

        let mut updated = ledger.clone();
        updated.spent_today = updated
            .spent_today
            .checked_add(actual)
            .map_err(|e| GovernorError::InvalidAmount(e.to_string()))?;
        updated.calls_today = updated.calls_today.saturating_add(1);

        // Committed only once persisted.
        if let Err(e) = self.store.save(&updated) {
            warn!(error = %e, amount_micros = actual.micros(), "spend not recorded, ledger save failed");
            return Err(e);
        }
        *ledger = updated.clone();
        drop(ledger);
        let snapshot = updated;

        record_best_effort(
            self.evidence.as_ref(),
            EvidenceComponent::Governor,
            EvidenceEvent::SpendRecorded {
                amount_micros: actual.micros(),
                calls_today: snapshot.calls_today,
            },
        );

        Ok(snapshot)
    }

    /// Copy of the ledger as of now (rolled to today)
    pub fn snapshot(&self) -> BudgetLedger {
        let mut ledger = self.ledger.lock();
        self.roll_locked(&mut ledger);
        ledger.clone()
    }

    /// Replace the daily budget and per-call ceiling
    pub fn set_limits(&self, daily_budget: UsdAmount, per_call_ceiling: UsdAmount) -> Result<()> {
        if daily_budget.is_negative() || per_call_ceiling.is_negative() {
            return Err(GovernorError::InvalidAmount(
                "limits must not be negative".to_string(),
            ));
        }
        let mut ledger = self.ledger.lock();
        let mut updated = ledger.clone();
        updated.daily_budget = daily_budget;
        updated.per_call_ceiling = per_call_ceiling;
        self.store.save(&updated)?;
        *ledger = updated;
        Ok(())
    }

    fn roll_locked(&self, ledger: &mut BudgetLedger) {
        let today = self.clock.today();
        if let Some(days_skipped) = ledger.roll_to(today) {
            info!(days_skipped, date = %today, "budget ledger reset for new day");
            if let Err(e) = self.store.save(ledger) {
                warn!(error = %e, "failed to persist budget ledger reset");
            }
            record_best_effort(
                self.evidence.as_ref(),
                EvidenceComponent::Governor,
                EvidenceEvent::LedgerReset { days_skipped },
            );
        }
    }
}

impl std::fmt::Debug for EconomicGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EconomicGovernor")
            .field("ledger", &*self.ledger.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, MemoryLedgerStore, LEDGER_VERSION};
    use chrono::NaiveDate;
    use keystone_audit::{MemoryEvidenceSink, NullEvidenceSink};
    use keystone_types::ComputeProvider;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn ledger_with_spend(spent_cents: i64, date: NaiveDate) -> BudgetLedger {
        BudgetLedger {
            version: LEDGER_VERSION,
            daily_budget: UsdAmount::from_cents(100),
            per_call_ceiling: UsdAmount::from_cents(25),
            spent_today: UsdAmount::from_cents(spent_cents),
            calls_today: 4,
            last_reset_date: date,
        }
    }

    fn governor(ledger: BudgetLedger, clock: Arc<FixedClock>) -> EconomicGovernor {
        EconomicGovernor::load(
            &GovernorConfig::default(),
            Box::new(MemoryLedgerStore::with_ledger(ledger)),
            clock,
            Arc::new(NullEvidenceSink),
        )
    }

    fn cloud(cents: i64) -> CostEstimate {
        CostEstimate::cloud(ComputeProvider::PrivateCloud, UsdAmount::from_cents(cents))
    }

    #[test]
    fn test_budget_scenario() {
        let gov = governor(ledger_with_spend(90, today()), Arc::new(FixedClock::new(today())));

        assert_eq!(gov.evaluate(&cloud(5)).action, EconomicAction::Proceed);
        assert_eq!(gov.evaluate(&cloud(30)).action, EconomicAction::DowngradeModel);
        assert_eq!(gov.evaluate(&cloud(15)).action, EconomicAction::DowngradeToOnDevice);
    }

    #[test]
    fn test_exact_daily_budget_proceeds() {
        let gov = governor(ledger_with_spend(90, today()), Arc::new(FixedClock::new(today())));
        assert_eq!(gov.evaluate(&cloud(10)).action, EconomicAction::Proceed);
    }

    #[test]
    fn test_on_device_always_proceeds_at_zero() {
        let gov = governor(ledger_with_spend(500, today()), Arc::new(FixedClock::new(today())));
        let decision = gov.evaluate(&CostEstimate::zero());
        assert_eq!(decision.action, EconomicAction::Proceed);
        assert_eq!(decision.estimated_cost, UsdAmount::ZERO);
    }

    #[test]
    fn test_evaluate_does_not_mutate_spend() {
        let gov = governor(ledger_with_spend(90, today()), Arc::new(FixedClock::new(today())));
        gov.evaluate(&cloud(5));
        assert_eq!(gov.snapshot().spent_today, UsdAmount::from_cents(90));
    }

    #[test]
    fn test_daily_reset_before_evaluate() {
        let yesterday = today().pred_opt().unwrap();
        let gov = governor(ledger_with_spend(90, yesterday), Arc::new(FixedClock::new(today())));

        let decision = gov.evaluate(&cloud(15));
        assert_eq!(decision.action, EconomicAction::Proceed);
        assert_eq!(decision.remaining_budget, UsdAmount::from_cents(100));

        let snapshot = gov.snapshot();
        assert_eq!(snapshot.calls_today, 0);
        assert_eq!(snapshot.last_reset_date, today());
    }

    #[test]
    fn test_daily_reset_before_record_spend() {
        let yesterday = today().pred_opt().unwrap();
        let gov = governor(ledger_with_spend(90, yesterday), Arc::new(FixedClock::new(today())));

        let ledger = gov.record_spend(UsdAmount::from_cents(5)).unwrap();
        assert_eq!(ledger.spent_today, UsdAmount::from_cents(5));
        assert_eq!(ledger.calls_today, 1);
        assert_eq!(ledger.last_reset_date, today());
    }

    #[test]
    fn test_clock_advance_triggers_reset() {
        let clock = Arc::new(FixedClock::new(today()));
        let gov = governor(ledger_with_spend(0, today()), clock.clone());

        gov.record_spend(UsdAmount::from_cents(80)).unwrap();
        assert_eq!(gov.evaluate(&cloud(25)).action, EconomicAction::DowngradeToOnDevice);

        clock.advance_days(1);
        assert_eq!(gov.evaluate(&cloud(25)).action, EconomicAction::Proceed);
    }

    #[test]
    fn test_negative_spend_rejected() {
        let gov = governor(ledger_with_spend(0, today()), Arc::new(FixedClock::new(today())));
        assert!(matches!(
            gov.record_spend(UsdAmount::from_cents(-1)),
            Err(GovernorError::InvalidAmount(_))
        ));
        assert_eq!(gov.snapshot().calls_today, 4);
    }

    #[test]
    fn test_missing_ledger_uses_config_defaults() {
        let gov = EconomicGovernor::load(
            &GovernorConfig::default(),
            Box::new(MemoryLedgerStore::new()),
            Arc::new(FixedClock::new(today())),
            Arc::new(NullEvidenceSink),
        );
        let snapshot = gov.snapshot();
        assert_eq!(snapshot.daily_budget, UsdAmount::from_cents(100));
        assert_eq!(snapshot.per_call_ceiling, UsdAmount::from_cents(25));
        assert_eq!(snapshot.spent_today, UsdAmount::ZERO);
    }

    #[test]
    fn test_set_limits() {
        let gov = governor(ledger_with_spend(90, today()), Arc::new(FixedClock::new(today())));
        gov.set_limits(UsdAmount::from_cents(200), UsdAmount::from_cents(50)).unwrap();
        assert_eq!(gov.evaluate(&cloud(30)).action, EconomicAction::Proceed);
    }

    #[test]
    fn test_decisions_are_logged_as_evidence() {
        let sink = MemoryEvidenceSink::new(32);
        let gov = EconomicGovernor::load(
            &GovernorConfig::default(),
            Box::new(MemoryLedgerStore::new()),
            Arc::new(FixedClock::new(today())),
            Arc::new(sink.clone()),
        );

        gov.evaluate(&cloud(5));
        gov.record_spend(UsdAmount::from_cents(5)).unwrap();

        assert_eq!(sink.count("economic_decision"), 1);
        assert_eq!(sink.count("spend_recorded"), 1);
    }
}
