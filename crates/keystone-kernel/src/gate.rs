//! Approval gate in front of the kernel

use std::sync::Arc;

use keystone_audit::{record_best_effort, EvidenceComponent, EvidenceEvent, EvidenceSink};
use keystone_types::{Draft, PermissionDomain, PermissionState, SideEffect};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::eligibility::{ConfidenceLevel, Decision, KernelViolation, LowConfidenceConfirmation};
use crate::kernel::CapabilityKernel;

/// A reason the interaction layer may not execute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum InvariantViolation {
    NoDraft,
    ApprovalNotGranted,
    ConfidenceBelowMinimum { confidence: f64 },
    LowConfidenceUnconfirmed { confidence: f64 },
    PermissionsNotGranted { domains: Vec<PermissionDomain> },
    SideEffectsUnacknowledged { ids: Vec<String> },
}

impl From<KernelViolation> for InvariantViolation {
    fn from(violation: KernelViolation) -> Self {
        match violation {
            KernelViolation::ApprovalNotGranted => InvariantViolation::ApprovalNotGranted,
            KernelViolation::ConfidenceBelowMinimum { confidence } => {
                InvariantViolation::ConfidenceBelowMinimum { confidence }
            }
            KernelViolation::LowConfidenceUnconfirmed { confidence } => {
                InvariantViolation::LowConfidenceUnconfirmed { confidence }
            }
            KernelViolation::PermissionsNotGranted { domains } => {
                InvariantViolation::PermissionsNotGranted { domains }
            }
            KernelViolation::SideEffectsUnacknowledged { ids } => {
                InvariantViolation::SideEffectsUnacknowledged { ids }
            }
        }
    }
}

impl InvariantViolation {
    pub fn code(&self) -> &'static str {
        match self {
            InvariantViolation::NoDraft => "no_draft",
            InvariantViolation::ApprovalNotGranted => "approval_not_granted",
            InvariantViolation::ConfidenceBelowMinimum { .. } => "confidence_below_minimum",
            InvariantViolation::LowConfidenceUnconfirmed { .. } => "low_confidence_unconfirmed",
            InvariantViolation::PermissionsNotGranted { .. } => "permissions_not_granted",
            InvariantViolation::SideEffectsUnacknowledged { .. } => "side_effects_unacknowledged",
        }
    }
}

/// Confidence as it was when the gate ran
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSnapshot {
    pub value: Option<f64>,
    pub level: Option<ConfidenceLevel>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ApprovalValidation {
    pub can_execute: bool,
    pub violations: Vec<InvariantViolation>,
    pub confidence_snapshot: ConfidenceSnapshot,
    /// Kernel decision, absent when there was no draft to evaluate
    pub decision: Option<Decision>,
}

/// Answers "can this draft execute now?" for the interaction layer
///
/// Holds no rules of its own beyond requiring a draft; everything else is the
/// kernel's decision.
pub struct ApprovalGate {
    kernel: Arc<CapabilityKernel>,
    evidence: Arc<dyn EvidenceSink>,
}

impl ApprovalGate {
    pub fn new(kernel: Arc<CapabilityKernel>, evidence: Arc<dyn EvidenceSink>) -> Self {
        Self { kernel, evidence }
    }

    pub fn kernel(&self) -> &Arc<CapabilityKernel> {
        &self.kernel
    }

    pub fn can_execute(
        &self,
        draft: Option<&Draft>,
        approval_granted: bool,
        side_effects: &[SideEffect],
        permission_state: &PermissionState,
        low_confidence: LowConfidenceConfirmation,
    ) -> ApprovalValidation {
        let Some(draft) = draft else {
            debug!("Gate refused: no draft");
            return ApprovalValidation {
                can_execute: false,
                violations: vec![InvariantViolation::NoDraft],
                confidence_snapshot: ConfidenceSnapshot {
                    value: None,
                    level: None,
                },
                decision: None,
            };
        };

        let decision = self.kernel.evaluate_execution_eligibility(
            draft,
            side_effects,
            permission_state,
            approval_granted,
            low_confidence,
        );

        record_best_effort(
            self.evidence.as_ref(),
            EvidenceComponent::Kernel,
            EvidenceEvent::EligibilityEvaluated {
                allowed: decision.execution_allowed(),
                violation_codes: decision.violation_codes(),
                confidence_band: decision.confidence_level().as_str().to_string(),
            },
        );
        debug!(
            draft_id = %decision.draft_id(),
            allowed = decision.execution_allowed(),
            violations = decision.violations().len(),
            "Gate evaluated draft"
        );

        ApprovalValidation {
            can_execute: decision.execution_allowed(),
            violations: decision
                .violations()
                .iter()
                .cloned()
                .map(InvariantViolation::from)
                .collect(),
            confidence_snapshot: ConfidenceSnapshot {
                value: Some(decision.confidence()),
                level: Some(decision.confidence_level()),
            },
            decision: Some(decision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use keystone_audit::{MemoryEvidenceSink, NullEvidenceSink};
    use keystone_types::{AccessLevel, PermissionManifest, PermissionScope, SideEffectKind};

    fn gate() -> ApprovalGate {
        let kernel = CapabilityKernel::new(KernelConfig::default(), Arc::new(NullEvidenceSink)).unwrap();
        ApprovalGate::new(Arc::new(kernel), Arc::new(NullEvidenceSink))
    }

    fn mail_manifest() -> PermissionManifest {
        PermissionManifest::new().with_scope(PermissionScope::new(
            PermissionDomain::Mail,
            AccessLevel::Compose,
            "reply",
        ))
    }

    #[test]
    fn test_missing_draft_is_only_no_draft() {
        let validation = gate().can_execute(
            None,
            true,
            &[],
            &PermissionState::new(),
            LowConfidenceConfirmation::Confirmed,
        );
        assert!(!validation.can_execute);
        assert_eq!(validation.violations, vec![InvariantViolation::NoDraft]);
        assert!(validation.decision.is_none());
    }

    #[test]
    fn test_violations_map_one_to_one() {
        let draft = Draft::new(0.5, mail_manifest());
        let effects = [SideEffect::new("send", SideEffectKind::SendMessage, "send reply")];
        let validation = gate().can_execute(
            Some(&draft),
            false,
            &effects,
            &PermissionState::new(),
            LowConfidenceConfirmation::NotConfirmed,
        );

        assert_eq!(
            validation.violations,
            vec![
                InvariantViolation::ApprovalNotGranted,
                InvariantViolation::LowConfidenceUnconfirmed { confidence: 0.5 },
                InvariantViolation::PermissionsNotGranted {
                    domains: vec![PermissionDomain::Mail]
                },
                InvariantViolation::SideEffectsUnacknowledged {
                    ids: vec!["send".to_string()]
                },
            ]
        );
        assert_eq!(validation.confidence_snapshot.level, Some(ConfidenceLevel::Low));
    }

    #[test]
    fn test_clean_draft_passes() {
        let draft = Draft::new(0.9, mail_manifest());
        let effects = [SideEffect::new("send", SideEffectKind::SendMessage, "send reply").acknowledged()];
        let validation = gate().can_execute(
            Some(&draft),
            true,
            &effects,
            &PermissionState::granting([PermissionDomain::Mail]),
            LowConfidenceConfirmation::NotConfirmed,
        );
        assert!(validation.can_execute);
        assert!(validation.violations.is_empty());
    }

    #[test]
    fn test_gate_records_evidence() {
        let evidence = MemoryEvidenceSink::default();
        let kernel = CapabilityKernel::new(KernelConfig::default(), Arc::new(NullEvidenceSink)).unwrap();
        let gate = ApprovalGate::new(Arc::new(kernel), Arc::new(evidence.clone()));

        let draft = Draft::new(0.1, PermissionManifest::new());
        gate.can_execute(
            Some(&draft),
            true,
            &[],
            &PermissionState::new(),
            LowConfidenceConfirmation::Confirmed,
        );
        gate.can_execute(
            None,
            true,
            &[],
            &PermissionState::new(),
            LowConfidenceConfirmation::Confirmed,
        );

        assert_eq!(evidence.count("eligibility_evaluated"), 1);
    }
}
