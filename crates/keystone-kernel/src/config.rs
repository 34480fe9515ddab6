//! Kernel configuration

use std::env;

/// Confidence below which execution is refused outright
pub const MIN_CONFIDENCE: f64 = 0.35;
/// Confidence below which the operator must explicitly confirm
pub const CONFIRMATION_THRESHOLD: f64 = 0.65;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct KernelConfig {
    pub min_confidence: f64,
    pub confirmation_threshold: f64,
    pub token_ttl_secs: u64,
    pub critical_cooldown_secs: u64,
    /// Hex Ed25519 seed; a fresh key is generated when absent
    pub signing_key_hex: Option<String>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            min_confidence: MIN_CONFIDENCE,
            confirmation_threshold: CONFIRMATION_THRESHOLD,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            critical_cooldown_secs: keystone_risk::CRITICAL_COOLDOWN_SECS,
            signing_key_hex: None,
        }
    }
}

impl KernelConfig {
    /// Load from the environment (and `.env`), falling back to defaults
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            token_ttl_secs: env::var("KEYSTONE_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.token_ttl_secs),
            critical_cooldown_secs: env::var("KEYSTONE_CRITICAL_COOLDOWN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.critical_cooldown_secs),
            signing_key_hex: env::var("KEYSTONE_KERNEL_SIGNING_KEY").ok(),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.min_confidence, 0.35);
        assert_eq!(config.confirmation_threshold, 0.65);
        assert_eq!(config.token_ttl_secs, 300);
        assert_eq!(config.critical_cooldown_secs, 30);
        assert!(config.signing_key_hex.is_none());
    }
}
