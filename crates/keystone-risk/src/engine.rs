//! Risk scoring
//!
//! The score starts at the Low checkpoint whenever the action has any side
//! effect and climbs with each consequence factor. Weights are chosen so the
//! common actions land on the tier boundaries 10/35/65/90:
//!
//! | Action                                         | Score | Tier     |
//! |------------------------------------------------|-------|----------|
//! | Read-only summary                              | 0     | Low      |
//! | Create a reminder                              | 15    | Low      |
//! | Send to one external recipient                 | 55    | Medium   |
//! | Send to three external recipients              | 75    | High     |
//! | Organization-wide send via third-party service | 90    | Critical |

use keystone_types::{ReversibilityClass, RiskTier};
use serde::{Deserialize, Serialize};

/// Facts about an action that drive its score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskContext {
    pub sends_external_communication: bool,
    pub external_recipient_count: u32,
    pub third_party_network_call: bool,
    pub writes_persistent_storage: bool,
    pub reversibility: ReversibilityClass,
    pub affected_entity_count: u32,
}

impl RiskContext {
    /// Context for an action with no side effects
    pub fn read_only() -> Self {
        Self {
            sends_external_communication: false,
            external_recipient_count: 0,
            third_party_network_call: false,
            writes_persistent_storage: false,
            reversibility: ReversibilityClass::Reversible,
            affected_entity_count: 0,
        }
    }

    fn has_side_effect(&self) -> bool {
        self.sends_external_communication
            || self.third_party_network_call
            || self.writes_persistent_storage
            || self.reversibility != ReversibilityClass::Reversible
    }
}

/// Result of scoring an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub tier: RiskTier,
    pub reasons: Vec<String>,
}

/// Additive weights for each consequence factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub external_communication: u32,
    pub per_additional_recipient: u32,
    pub additional_recipient_cap: u32,
    pub third_party_network: u32,
    pub persistent_write: u32,
    pub irreversible: u32,
    pub partially_reversible: u32,
    pub wide_impact: u32,
    /// Entity count above which `wide_impact` applies
    pub wide_impact_threshold: u32,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            external_communication: 25,
            per_additional_recipient: 10,
            additional_recipient_cap: 20,
            third_party_network: 10,
            persistent_write: 5,
            irreversible: 20,
            partially_reversible: 10,
            wide_impact: 5,
            wide_impact_threshold: 5,
        }
    }
}

/// Pure, deterministic risk scorer
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    weights: RiskWeights,
}

impl RiskEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: RiskWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Score an action
    pub fn assess(&self, ctx: &RiskContext) -> RiskAssessment {
        let w = &self.weights;
        let mut score: u32 = 0;
        let mut reasons = Vec::new();

        if ctx.has_side_effect() {
            score = score.saturating_add(RiskTier::Low.checkpoint() as u32);
        }

        if ctx.sends_external_communication {
            score = score.saturating_add(w.external_communication);
            reasons.push("sends external communication".to_string());

            let additional = ctx.external_recipient_count.saturating_sub(1);
            if additional > 0 {
                score = score.saturating_add(
                    additional
                        .saturating_mul(w.per_additional_recipient)
                        .min(w.additional_recipient_cap),
                );
                reasons.push(format!("{} external recipients", ctx.external_recipient_count));
            }
        }

        if ctx.third_party_network_call {
            score = score.saturating_add(w.third_party_network);
            reasons.push("calls a third-party network service".to_string());
        }

        if ctx.writes_persistent_storage {
            score = score.saturating_add(w.persistent_write);
            reasons.push("writes persistent storage".to_string());
        }

        match ctx.reversibility {
            ReversibilityClass::Irreversible => {
                score = score.saturating_add(w.irreversible);
                reasons.push("cannot be undone".to_string());
            }
            ReversibilityClass::PartiallyReversible => {
                score = score.saturating_add(w.partially_reversible);
                reasons.push("can only be partially undone".to_string());
            }
            ReversibilityClass::Reversible => {}
        }

        if ctx.affected_entity_count > w.wide_impact_threshold {
            score = score.saturating_add(w.wide_impact);
            reasons.push(format!("affects {} entities", ctx.affected_entity_count));
        }

        let score = score.min(100) as u8;
        RiskAssessment {
            score,
            tier: RiskTier::from_score(score),
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_to(recipients: u32) -> RiskContext {
        RiskContext {
            sends_external_communication: true,
            external_recipient_count: recipients,
            third_party_network_call: false,
            writes_persistent_storage: false,
            reversibility: ReversibilityClass::Irreversible,
            affected_entity_count: recipients,
        }
    }

    #[test]
    fn test_read_only_is_zero() {
        let assessment = RiskEngine::new().assess(&RiskContext::read_only());
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.tier, RiskTier::Low);
        assert!(assessment.reasons.is_empty());
    }

    #[test]
    fn test_reminder_is_low() {
        let ctx = RiskContext {
            writes_persistent_storage: true,
            affected_entity_count: 1,
            ..RiskContext::read_only()
        };
        let assessment = RiskEngine::new().assess(&ctx);
        assert_eq!(assessment.score, 15);
        assert_eq!(assessment.tier, RiskTier::Low);
    }

    #[test]
    fn test_single_external_send_is_medium() {
        let assessment = RiskEngine::new().assess(&send_to(1));
        assert_eq!(assessment.score, 55);
        assert_eq!(assessment.tier, RiskTier::Medium);
    }

    #[test]
    fn test_multi_recipient_send_is_high() {
        let assessment = RiskEngine::new().assess(&send_to(3));
        assert_eq!(assessment.score, 75);
        assert_eq!(assessment.tier, RiskTier::High);
    }

    #[test]
    fn test_organization_wide_send_is_critical() {
        let ctx = RiskContext {
            third_party_network_call: true,
            affected_entity_count: 40,
            ..send_to(40)
        };
        let assessment = RiskEngine::new().assess(&ctx);
        assert_eq!(assessment.score, 90);
        assert_eq!(assessment.tier, RiskTier::Critical);
    }

    #[test]
    fn test_recipient_contribution_is_capped() {
        let few = RiskEngine::new().assess(&send_to(3));
        let many = RiskEngine::new().assess(&send_to(300));
        assert_eq!(few.score, many.score);
    }

    #[test]
    fn test_score_clamped_to_100() {
        let weights = RiskWeights {
            external_communication: 90,
            ..RiskWeights::default()
        };
        let assessment = RiskEngine::with_weights(weights).assess(&send_to(3));
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.tier, RiskTier::Critical);
    }

    #[test]
    fn test_extreme_weights_saturate() {
        let weights = RiskWeights {
            external_communication: u32::MAX,
            third_party_network: u32::MAX,
            irreversible: u32::MAX,
            ..RiskWeights::default()
        };
        let mut ctx = send_to(3);
        ctx.third_party_network_call = true;
        let assessment = RiskEngine::with_weights(weights).assess(&ctx);
        assert_eq!(assessment.score, 100);
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let engine = RiskEngine::new();
        let ctx = send_to(2);
        assert_eq!(engine.assess(&ctx), engine.assess(&ctx));
    }

    #[test]
    fn test_score_is_monotonic_in_recipients() {
        let engine = RiskEngine::new();
        let mut last = 0;
        for n in 1..10 {
            let score = engine.assess(&send_to(n)).score;
            assert!(score >= last);
            last = score;
        }
    }
}
