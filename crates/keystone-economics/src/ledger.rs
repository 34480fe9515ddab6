//! Budget ledger, its persistence interface, and the calendar clock

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, Local, NaiveDate};
use keystone_types::UsdAmount;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{GovernorConfig, GovernorError, Result};

/// Current ledger schema version
pub const LEDGER_VERSION: u32 = 1;

/// The five persisted governor values, plus a schema version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLedger {
    pub version: u32,
    pub daily_budget: UsdAmount,
    pub per_call_ceiling: UsdAmount,
    pub spent_today: UsdAmount,
    pub calls_today: u32,
    pub last_reset_date: NaiveDate,
}

impl BudgetLedger {
    /// Fresh ledger seeded from config
    pub fn new(config: &GovernorConfig, today: NaiveDate) -> Self {
        Self {
            version: LEDGER_VERSION,
            daily_budget: config.daily_budget,
            per_call_ceiling: config.per_call_ceiling,
            spent_today: UsdAmount::ZERO,
            calls_today: 0,
            last_reset_date: today,
        }
    }

    /// Budget left today, floored at zero
    pub fn remaining(&self) -> UsdAmount {
        self.daily_budget.saturating_sub(self.spent_today)
    }

    /// Roll to `today` if the stored date differs. Returns the day delta when a
    /// reset happened.
    pub fn roll_to(&mut self, today: NaiveDate) -> Option<i64> {
        if self.last_reset_date == today {
            return None;
        }
        let delta = (today - self.last_reset_date).num_days();
        self.spent_today = UsdAmount::ZERO;
        self.calls_today = 0;
        self.last_reset_date = today;
        Some(delta)
    }
}

/// Load/save of the ledger, decoupled from the storage mechanism
pub trait LedgerStore: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet
    fn load(&self) -> Result<Option<BudgetLedger>>;

    fn save(&self, ledger: &BudgetLedger) -> Result<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    ledger: Mutex<Option<BudgetLedger>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a ledger
    pub fn with_ledger(ledger: BudgetLedger) -> Self {
        Self {
            ledger: Mutex::new(Some(ledger)),
        }
    }

    pub fn current(&self) -> Option<BudgetLedger> {
        self.ledger.lock().clone()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Option<BudgetLedger>> {
        Ok(self.ledger.lock().clone())
    }

    fn save(&self, ledger: &BudgetLedger) -> Result<()> {
        *self.ledger.lock() = Some(ledger.clone());
        Ok(())
    }
}

/// JSON file store with write-then-rename replacement
#[derive(Debug, Clone)]
pub struct JsonFileLedgerStore {
    path: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self) -> Result<Option<BudgetLedger>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let ledger: BudgetLedger = serde_json::from_str(&content)?;
        if ledger.version != LEDGER_VERSION {
            return Err(GovernorError::UnsupportedVersion {
                found: ledger.version,
                expected: LEDGER_VERSION,
            });
        }
        Ok(Some(ledger))
    }

    fn save(&self, ledger: &BudgetLedger) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        let body = serde_json::to_vec_pretty(ledger)
            .map_err(|e| GovernorError::Persistence(e.to_string()))?;
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Source of the current calendar day
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The device's local calendar day
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually advanced clock
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        *self.today.lock() = today;
    }

    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.lock();
        if let Some(next) = today.checked_add_days(Days::new(days)) {
            *today = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }
}
