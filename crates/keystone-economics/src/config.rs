//! Governor configuration

use std::path::PathBuf;

use keystone_types::UsdAmount;
use serde::{Deserialize, Serialize};

/// Default daily budget in USD
pub const DEFAULT_DAILY_BUDGET_USD: f64 = 1.00;

/// Default per-call ceiling in USD
pub const DEFAULT_PER_CALL_CEILING_USD: f64 = 0.25;

/// Governor configuration
///
/// Limits here seed a fresh ledger only; a persisted ledger keeps its own limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernorConfig {
    pub daily_budget: UsdAmount,
    pub per_call_ceiling: UsdAmount,
    /// Where the JSON ledger lives; `None` keeps the ledger in memory
    pub ledger_path: Option<PathBuf>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            daily_budget: UsdAmount::from_dollars(DEFAULT_DAILY_BUDGET_USD),
            per_call_ceiling: UsdAmount::from_dollars(DEFAULT_PER_CALL_CEILING_USD),
            ledger_path: None,
        }
    }
}

impl GovernorConfig {
    /// Create config from environment variables
    ///
    /// Reads `KEYSTONE_DAILY_BUDGET_USD`, `KEYSTONE_PER_CALL_CEILING_USD`, and
    /// `KEYSTONE_LEDGER_PATH`. Unparseable values fall back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let dollars = |name: &str, default: f64| {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(UsdAmount::from_dollars)
                .unwrap_or_else(|| UsdAmount::from_dollars(default))
        };

        Self {
            daily_budget: dollars("KEYSTONE_DAILY_BUDGET_USD", DEFAULT_DAILY_BUDGET_USD),
            per_call_ceiling: dollars("KEYSTONE_PER_CALL_CEILING_USD", DEFAULT_PER_CALL_CEILING_USD),
            ledger_path: std::env::var("KEYSTONE_LEDGER_PATH").ok().map(PathBuf::from),
        }
    }
}
