//! Keystone Economics - Budget gating for paid computation
//!
//! The [`EconomicGovernor`] owns the one piece of shared mutable state in the
//! core: a persisted daily ledger of cloud spend. Every paid call is evaluated
//! against a per-call ceiling and a daily budget; over-budget requests are
//! downgraded (cheaper model, then on-device) rather than blocked outright.
//!
//! # Invariants
//!
//! - On-device computation always proceeds at zero cost
//! - The per-call ceiling is checked before the daily budget
//! - A calendar day boundary is never skipped: the ledger is rolled before
//!   every evaluation and every spend record
//! - All ledger access is serialized through a single mutex

pub mod config;
pub mod error;
pub mod governor;
pub mod ledger;

pub use config::GovernorConfig;
pub use error::{GovernorError, Result};
pub use governor::{EconomicAction, EconomicDecision, EconomicGovernor};
pub use ledger::{
    BudgetLedger, Clock, FixedClock, JsonFileLedgerStore, LedgerStore, MemoryLedgerStore,
    SystemClock, LEDGER_VERSION,
};
