//! Execution eligibility: the kernel's pure evaluation function

use keystone_types::{DraftId, PermissionDomain, PermissionManifest, ProposalId};
use serde::{Deserialize, Serialize};

/// Whether the operator explicitly confirmed a low-confidence draft
///
/// No `Default`: every call site states the choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowConfidenceConfirmation {
    Confirmed,
    NotConfirmed,
}

impl LowConfidenceConfirmation {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, LowConfidenceConfirmation::Confirmed)
    }
}

/// Where a confidence value falls relative to the kernel thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// Below the minimum, or not a finite number
    BelowMinimum,
    /// Needs explicit confirmation
    Low,
    Sufficient,
}

impl ConfidenceLevel {
    pub fn classify(confidence: f64, min_confidence: f64, confirmation_threshold: f64) -> Self {
        if !confidence.is_finite() || confidence < min_confidence {
            ConfidenceLevel::BelowMinimum
        } else if confidence < confirmation_threshold {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Sufficient
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::BelowMinimum => "below_minimum",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Sufficient => "sufficient",
        }
    }
}

/// One failed eligibility check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum KernelViolation {
    ApprovalNotGranted,
    ConfidenceBelowMinimum { confidence: f64 },
    LowConfidenceUnconfirmed { confidence: f64 },
    PermissionsNotGranted { domains: Vec<PermissionDomain> },
    SideEffectsUnacknowledged { ids: Vec<String> },
}

impl KernelViolation {
    pub fn code(&self) -> &'static str {
        match self {
            KernelViolation::ApprovalNotGranted => "approval_not_granted",
            KernelViolation::ConfidenceBelowMinimum { .. } => "confidence_below_minimum",
            KernelViolation::LowConfidenceUnconfirmed { .. } => "low_confidence_unconfirmed",
            KernelViolation::PermissionsNotGranted { .. } => "permissions_not_granted",
            KernelViolation::SideEffectsUnacknowledged { .. } => "side_effects_unacknowledged",
        }
    }
}

/// Outcome of an eligibility evaluation
///
/// Only the kernel constructs decisions, so a token can only ever be issued
/// from one the kernel itself produced. A decision records the proposal,
/// plan hash, and permission manifest it evaluated, and is neither `Clone`
/// nor `Deserialize`: issuing a token consumes it.
#[derive(Debug, PartialEq, Serialize)]
pub struct Decision {
    draft_id: DraftId,
    execution_allowed: bool,
    reason: String,
    violations: Vec<KernelViolation>,
    confidence: f64,
    confidence_level: ConfidenceLevel,
    proposal_id: Option<ProposalId>,
    plan_hash: Option<String>,
    evaluated_permissions: PermissionManifest,
}

impl Decision {
    pub(crate) fn new(
        draft_id: DraftId,
        violations: Vec<KernelViolation>,
        confidence: f64,
        confidence_level: ConfidenceLevel,
    ) -> Self {
        let execution_allowed = violations.is_empty();
        let reason = if execution_allowed {
            "all eligibility checks passed".to_string()
        } else {
            let codes: Vec<&str> = violations.iter().map(KernelViolation::code).collect();
            format!("blocked: {}", codes.join(", "))
        };
        Self {
            draft_id,
            execution_allowed,
            reason,
            violations,
            confidence,
            confidence_level,
            proposal_id: None,
            plan_hash: None,
            evaluated_permissions: PermissionManifest::new(),
        }
    }

    /// Record what the evaluation covered
    pub(crate) fn covering(
        mut self,
        proposal_id: Option<ProposalId>,
        plan_hash: Option<String>,
        evaluated_permissions: PermissionManifest,
    ) -> Self {
        self.proposal_id = proposal_id;
        self.plan_hash = plan_hash;
        self.evaluated_permissions = evaluated_permissions;
        self
    }

    pub fn draft_id(&self) -> &DraftId {
        &self.draft_id
    }

    pub fn execution_allowed(&self) -> bool {
        self.execution_allowed
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn violations(&self) -> &[KernelViolation] {
        &self.violations
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    /// Proposal the evaluated draft was produced for
    pub fn proposal_id(&self) -> Option<&ProposalId> {
        self.proposal_id.as_ref()
    }

    /// Hash of the plan the evaluated draft was produced for
    pub fn plan_hash(&self) -> Option<&str> {
        self.plan_hash.as_deref()
    }

    /// Manifest whose permissions were checked
    pub fn evaluated_permissions(&self) -> &PermissionManifest {
        &self.evaluated_permissions
    }

    pub fn violation_codes(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.code().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::classify(0.2, 0.35, 0.65), ConfidenceLevel::BelowMinimum);
        assert_eq!(ConfidenceLevel::classify(0.35, 0.35, 0.65), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::classify(0.649, 0.35, 0.65), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::classify(0.65, 0.35, 0.65), ConfidenceLevel::Sufficient);
        assert_eq!(ConfidenceLevel::classify(f64::NAN, 0.35, 0.65), ConfidenceLevel::BelowMinimum);
        assert_eq!(
            ConfidenceLevel::classify(f64::INFINITY, 0.35, 0.65),
            ConfidenceLevel::BelowMinimum
        );
    }

    #[test]
    fn test_reason_lists_codes() {
        let decision = Decision::new(
            DraftId::new(),
            vec![KernelViolation::ApprovalNotGranted],
            0.9,
            ConfidenceLevel::Sufficient,
        );
        assert!(!decision.execution_allowed());
        assert_eq!(decision.reason(), "blocked: approval_not_granted");
    }
}
