//! Proposal packs: the immutable artifact between producers and the kernel
//!
//! A pack describes an intended action and its risk, cost, and permission
//! profile. It carries no execution authority of any kind; tokens are minted
//! only by the kernel from a fully evaluated decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    BlastRadius, PermissionManifest, ProposalId, ReversibilityClass, RiskTier, ToolPlan, UsdAmount,
};

/// Where a proposal originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalSource {
    User,
    VoiceAssistant,
    EnterpriseChannel,
    AutonomyProposal,
}

/// Risk and consequence profile of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskConsequenceAnalysis {
    pub risk_score: u8,
    pub consequence_tier: RiskTier,
    pub reversibility: ReversibilityClass,
    pub blast_radius: BlastRadius,
    pub reasons: Vec<String>,
}

/// Which compute backend would serve the call
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ComputeProvider {
    OnDevice,
    PrivateCloud,
    ThirdParty(String),
}

/// Bounds on an estimated cost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub low: UsdAmount,
    pub high: UsdAmount,
}

/// Predicted cost of the computation behind a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub estimated_cost: UsdAmount,
    pub band: ConfidenceBand,
    pub provider: ComputeProvider,
    pub requires_paid_call: bool,
}

impl CostEstimate {
    /// Canonical fully-local computation
    pub fn zero() -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            estimated_cost: UsdAmount::ZERO,
            band: ConfidenceBand::default(),
            provider: ComputeProvider::OnDevice,
            requires_paid_call: false,
        }
    }

    /// A paid cloud call with an exact estimate
    pub fn cloud(provider: ComputeProvider, estimated_cost: UsdAmount) -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            estimated_cost,
            band: ConfidenceBand {
                low: estimated_cost,
                high: estimated_cost,
            },
            provider,
            requires_paid_call: true,
        }
    }

    pub fn with_tokens(mut self, input_tokens: u32, output_tokens: u32) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    pub fn with_band(mut self, low: UsdAmount, high: UsdAmount) -> Self {
        self.band = ConfidenceBand { low, high };
        self
    }

    pub fn is_local(&self) -> bool {
        !self.requires_paid_call
    }
}

impl Default for CostEstimate {
    fn default() -> Self {
        Self::zero()
    }
}

/// Reference to a context source plus a redacted summary, never raw content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceCitation {
    pub source: String,
    pub redacted_summary: String,
}

impl EvidenceCitation {
    pub fn new(source: impl Into<String>, redacted_summary: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            redacted_summary: redacted_summary.into(),
        }
    }
}

/// Everything a producer supplies to build a [`ProposalPack`]
#[derive(Debug, Clone)]
pub struct ProposalParts {
    pub source: ProposalSource,
    pub plan: ToolPlan,
    pub permissions: PermissionManifest,
    pub analysis: RiskConsequenceAnalysis,
    pub cost: CostEstimate,
    pub citations: Vec<EvidenceCitation>,
    pub summary: String,
}

/// Immutable description of an intended action
///
/// Fields are only readable; a pack cannot be altered after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPack {
    id: ProposalId,
    created_at: DateTime<Utc>,
    source: ProposalSource,
    plan: ToolPlan,
    permissions: PermissionManifest,
    analysis: RiskConsequenceAnalysis,
    cost: CostEstimate,
    citations: Vec<EvidenceCitation>,
    summary: String,
}

impl ProposalPack {
    /// Seal the parts into a new pack with a fresh id
    pub fn new(parts: ProposalParts) -> Self {
        Self {
            id: ProposalId::new(),
            created_at: Utc::now(),
            source: parts.source,
            plan: parts.plan,
            permissions: parts.permissions,
            analysis: parts.analysis,
            cost: parts.cost,
            citations: parts.citations,
            summary: parts.summary,
        }
    }

    pub fn id(&self) -> &ProposalId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn source(&self) -> ProposalSource {
        self.source
    }

    pub fn plan(&self) -> &ToolPlan {
        &self.plan
    }

    pub fn permissions(&self) -> &PermissionManifest {
        &self.permissions
    }

    pub fn analysis(&self) -> &RiskConsequenceAnalysis {
        &self.analysis
    }

    pub fn cost(&self) -> &CostEstimate {
        &self.cost
    }

    pub fn citations(&self) -> &[EvidenceCitation] {
        &self.citations
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.plan.risk_tier
    }
}
