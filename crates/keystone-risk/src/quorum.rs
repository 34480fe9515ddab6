//! Quorum / signer resolution
//!
//! Base signer count comes from the risk tier. Each distinct escalating
//! signal category adds one signer and, where it names a domain owner, one
//! required approver role beyond the device operator.

use std::collections::BTreeSet;

use keystone_types::{ApprovalRequirement, ApproverRole, RiskTier, SignalCategory};
use serde::{Deserialize, Serialize};

/// Reflection window before a critical-tier token may be issued
pub const CRITICAL_COOLDOWN_SECS: u64 = 30;

/// Base signer count per tier: 1, 1, 2, 3
pub fn signer_count(tier: RiskTier) -> u8 {
    match tier {
        RiskTier::Low => 1,
        RiskTier::Medium => 1,
        RiskTier::High => 2,
        RiskTier::Critical => 3,
    }
}

/// Resolved quorum for a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumRequirement {
    pub signers: u8,
    /// Required roles; `DeviceOperator` is always first
    pub roles: Vec<ApproverRole>,
    pub cooldown_secs: u64,
}

impl QuorumRequirement {
    /// Approval requirement carried on a tool plan
    pub fn to_approval_requirement(&self, tier: RiskTier) -> ApprovalRequirement {
        ApprovalRequirement {
            approvals_needed: self.signers,
            biometric_required: tier >= RiskTier::High,
            cooldown_secs: self.cooldown_secs,
            multi_signer_count: (self.signers > 1).then_some(self.signers),
            preview_required: true,
            required_roles: self.roles.clone(),
        }
    }
}

/// Derives quorum from tier and detected signal categories
#[derive(Debug, Clone)]
pub struct QuorumResolver {
    critical_cooldown_secs: u64,
}

impl Default for QuorumResolver {
    fn default() -> Self {
        Self {
            critical_cooldown_secs: CRITICAL_COOLDOWN_SECS,
        }
    }
}

impl QuorumResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_critical_cooldown(critical_cooldown_secs: u64) -> Self {
        Self {
            critical_cooldown_secs,
        }
    }

    pub fn resolve(&self, tier: RiskTier, categories: &[SignalCategory]) -> QuorumRequirement {
        let escalating: BTreeSet<SignalCategory> = categories
            .iter()
            .copied()
            .filter(SignalCategory::escalates_quorum)
            .collect();

        let mut roles = vec![ApproverRole::DeviceOperator];
        for category in &escalating {
            let role = match category {
                SignalCategory::Financial => Some(ApproverRole::Finance),
                SignalCategory::Legal => Some(ApproverRole::Legal),
                SignalCategory::MultiParty => Some(ApproverRole::OrganizationalAuthority),
                _ => None,
            };
            if let Some(role) = role {
                if !roles.contains(&role) {
                    roles.push(role);
                }
            }
        }

        let signers = signer_count(tier).saturating_add(escalating.len() as u8);
        let cooldown_secs = if tier == RiskTier::Critical {
            self.critical_cooldown_secs
        } else {
            0
        };

        QuorumRequirement {
            signers,
            roles,
            cooldown_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_count_per_tier() {
        let counts: Vec<u8> = RiskTier::ALL.iter().map(|t| signer_count(*t)).collect();
        assert_eq!(counts, vec![1, 1, 2, 3]);
    }

    #[test]
    fn test_signer_count_is_monotonic() {
        for pair in RiskTier::ALL.windows(2) {
            assert!(signer_count(pair[0]) <= signer_count(pair[1]));
        }
    }

    #[test]
    fn test_no_escalation_for_plain_signals() {
        let q = QuorumResolver::new().resolve(
            RiskTier::Medium,
            &[SignalCategory::Commitment, SignalCategory::Deadline],
        );
        assert_eq!(q.signers, 1);
        assert_eq!(q.roles, vec![ApproverRole::DeviceOperator]);
        assert_eq!(q.cooldown_secs, 0);
    }

    #[test]
    fn test_financial_and_legal_escalate() {
        let q = QuorumResolver::new().resolve(
            RiskTier::High,
            &[SignalCategory::Financial, SignalCategory::Legal, SignalCategory::Financial],
        );
        assert_eq!(q.signers, 4);
        assert_eq!(
            q.roles,
            vec![ApproverRole::DeviceOperator, ApproverRole::Finance, ApproverRole::Legal]
        );
    }

    #[test]
    fn test_irreversible_adds_signer_without_role() {
        let q = QuorumResolver::new().resolve(RiskTier::Low, &[SignalCategory::Irreversible]);
        assert_eq!(q.signers, 2);
        assert_eq!(q.roles, vec![ApproverRole::DeviceOperator]);
    }

    #[test]
    fn test_multi_party_requires_org_authority() {
        let q = QuorumResolver::new().resolve(RiskTier::Low, &[SignalCategory::MultiParty]);
        assert!(q.roles.contains(&ApproverRole::OrganizationalAuthority));
    }

    #[test]
    fn test_critical_carries_cooldown() {
        let q = QuorumResolver::new().resolve(RiskTier::Critical, &[]);
        assert_eq!(q.signers, 3);
        assert_eq!(q.cooldown_secs, CRITICAL_COOLDOWN_SECS);

        let req = q.to_approval_requirement(RiskTier::Critical);
        assert!(req.biometric_required);
        assert_eq!(req.multi_signer_count, Some(3));
        assert_eq!(req.cooldown_secs, 30);
    }
}
