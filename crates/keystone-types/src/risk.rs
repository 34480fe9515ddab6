//! Risk, reversibility, and blast-radius classifications
//!
//! These enums are shared by the risk engine, the skill pipeline, the quorum
//! resolver, and the kernel. Tier boundaries live here so every subsystem
//! compares scores against the same checkpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    /// All tiers in ascending order
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Low,
        RiskTier::Medium,
        RiskTier::High,
        RiskTier::Critical,
    ];

    /// Canonical score checkpoint for this tier
    pub fn checkpoint(&self) -> u8 {
        match self {
            RiskTier::Low => 10,
            RiskTier::Medium => 35,
            RiskTier::High => 65,
            RiskTier::Critical => 90,
        }
    }

    /// Map a 0-100 score onto a tier using the checkpoints as lower bounds
    /// (Low covers everything below the Medium checkpoint).
    pub fn from_score(score: u8) -> Self {
        if score >= RiskTier::Critical.checkpoint() {
            RiskTier::Critical
        } else if score >= RiskTier::High.checkpoint() {
            RiskTier::High
        } else if score >= RiskTier::Medium.checkpoint() {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an action's effects can be undone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversibilityClass {
    Reversible,
    PartiallyReversible,
    Irreversible,
}

impl ReversibilityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReversibilityClass::Reversible => "reversible",
            ReversibilityClass::PartiallyReversible => "partially_reversible",
            ReversibilityClass::Irreversible => "irreversible",
        }
    }
}

/// Scope of who or what is affected by an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastRadius {
    SelfOnly,
    SingleRecipient,
    MultiRecipient,
    Organizational,
}

impl BlastRadius {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlastRadius::SelfOnly => "self_only",
            BlastRadius::SingleRecipient => "single_recipient",
            BlastRadius::MultiRecipient => "multi_recipient",
            BlastRadius::Organizational => "organizational",
        }
    }
}

/// Category of a signal detected while observing input
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Commitment,
    Deadline,
    Financial,
    Legal,
    MultiParty,
    Irreversible,
    Informational,
}

impl SignalCategory {
    /// Categories that escalate the approver quorum
    pub fn escalates_quorum(&self) -> bool {
        matches!(
            self,
            SignalCategory::Financial
                | SignalCategory::Legal
                | SignalCategory::MultiParty
                | SignalCategory::Irreversible
        )
    }
}

/// Role an approver must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    DeviceOperator,
    Finance,
    Legal,
    OrganizationalAuthority,
}

impl ApproverRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApproverRole::DeviceOperator => "device_operator",
            ApproverRole::Finance => "finance",
            ApproverRole::Legal => "legal",
            ApproverRole::OrganizationalAuthority => "organizational_authority",
        }
    }
}
