//! The Skill interface and the artifacts passed between its stages

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keystone_types::{
    EvidenceCitation, IntentType, PermissionDomain, ProposalPack, ProposalSource, RiskTier,
    SignalCategory,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Skill {skill_id} is already registered")]
    AlreadyRegistered { skill_id: String },

    #[error("Skill {skill_id} does not declare that it always produces a proposal")]
    MissingProposalGuarantee { skill_id: String },

    #[error("Unknown skill: {skill_id}")]
    UnknownSkill { skill_id: String },

    #[error("Observation failed: {0}")]
    Observe(String),

    #[error("Analysis failed: {0}")]
    Analyze(String),

    #[error("Proposal generation failed: {0}")]
    Propose(String),
}

pub type Result<T> = std::result::Result<T, SkillError>;

/// Latency class of a skill's observe stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    /// User is waiting on the result
    Interactive,
    Background,
    Bulk,
}

impl TaskCategory {
    pub fn default_budget(&self) -> Duration {
        match self {
            TaskCategory::Interactive => Duration::from_secs(2),
            TaskCategory::Background => Duration::from_secs(10),
            TaskCategory::Bulk => Duration::from_secs(30),
        }
    }
}

/// Raw input handed to a skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInput {
    pub text: String,
    pub source: ProposalSource,
    /// Already-redacted context from read-only connectors
    pub context: Vec<EvidenceCitation>,
    /// Other parties in the conversation or event
    pub participant_count: u32,
    pub organization_wide: bool,
    pub received_at: DateTime<Utc>,
}

impl SkillInput {
    pub fn text(source: ProposalSource, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source,
            context: Vec::new(),
            participant_count: 0,
            organization_wide: false,
            received_at: Utc::now(),
        }
    }

    pub fn with_participants(mut self, participant_count: u32) -> Self {
        self.participant_count = participant_count;
        self
    }

    pub fn with_context(mut self, citation: EvidenceCitation) -> Self {
        self.context.push(citation);
        self
    }

    pub fn organization_wide(mut self) -> Self {
        self.organization_wide = true;
        self
    }
}

/// A weighted, labeled signal extracted from input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub label: String,
    pub category: SignalCategory,
    pub weight: f64,
    pub confidence: f64,
}

/// Output of the observe stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub skill_id: String,
    pub input: SkillInput,
    pub signals: Vec<Signal>,
    pub confidence: f64,
    /// Set when the stage timed out and produced nothing
    pub degraded: bool,
}

impl Observation {
    /// Partial, zero-confidence observation used when observe exceeds its budget
    pub fn degraded(skill_id: impl Into<String>, input: SkillInput) -> Self {
        Self {
            skill_id: skill_id.into(),
            input,
            signals: Vec::new(),
            confidence: 0.0,
            degraded: true,
        }
    }

    /// Distinct signal categories in stable order
    pub fn categories(&self) -> Vec<SignalCategory> {
        let mut categories: Vec<SignalCategory> = self.signals.iter().map(|s| s.category).collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// Next action an analysis item suggests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub intent: IntentType,
    pub summary: String,
}

/// One risk-tiered, evidence-backed finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub label: String,
    pub category: SignalCategory,
    pub tier: RiskTier,
    pub evidence: Vec<EvidenceCitation>,
    pub suggested_action: Option<SuggestedAction>,
}

/// Output of the analyze stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub observation: Observation,
    pub items: Vec<AnalysisItem>,
}

impl Analysis {
    pub fn categories(&self) -> Vec<SignalCategory> {
        self.observation.categories()
    }
}

/// A pluggable proposal producer
///
/// Skills observe, analyze, and package; they never execute anything. The
/// trait exposes no handle to authorization or execution, and this crate has
/// no dependency path to the kernel.
#[async_trait]
pub trait Skill: Send + Sync {
    /// Stable identifier
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn default_risk_tier(&self) -> RiskTier;

    /// Read-only permission domains the skill may request
    fn read_permissions(&self) -> &[PermissionDomain];

    fn required_signers(&self) -> u8;

    /// Must return `true` for the registry to accept the skill
    fn always_produces_proposal(&self) -> bool;

    fn task_category(&self) -> TaskCategory {
        TaskCategory::Interactive
    }

    /// Extract signals from raw input. May do I/O.
    async fn observe(&self, input: &SkillInput) -> Result<Observation>;

    fn analyze(&self, observation: &Observation) -> Result<Analysis>;

    fn generate_proposal(&self, analysis: &Analysis) -> Result<ProposalPack>;
}
