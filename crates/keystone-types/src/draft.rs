//! Inputs the kernel consumes from its surroundings: finished drafts and
//! side-effect descriptors.

use serde::{Deserialize, Serialize};

use crate::{DraftId, EvidenceCitation, PermissionManifest, ProposalId, ProposalPack, ToolPlan};

/// Model metadata attached to a draft by the routing layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model: String,
    pub provider: String,
    pub on_device: bool,
}

/// The proposal and exact plan a draft was produced for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTarget {
    pub proposal_id: ProposalId,
    pub plan: ToolPlan,
}

/// A finished draft with a confidence score
///
/// The kernel never computes confidence itself; it only gates on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub confidence: f64,
    pub citations: Vec<EvidenceCitation>,
    pub safety_notes: Vec<String>,
    pub model: ModelMetadata,
    /// Permissions the drafted action needs at execution time
    pub required_permissions: PermissionManifest,
    /// Absent for drafts not tied to a proposal; those never authorize execution
    pub target: Option<DraftTarget>,
}

impl Draft {
    pub fn new(confidence: f64, required_permissions: PermissionManifest) -> Self {
        Self {
            id: DraftId::new(),
            confidence,
            citations: Vec::new(),
            safety_notes: Vec::new(),
            model: ModelMetadata::default(),
            required_permissions,
            target: None,
        }
    }

    /// Draft for a proposal, carrying the proposal's permission manifest and citations
    pub fn for_proposal(proposal: &ProposalPack, confidence: f64) -> Self {
        Self {
            id: DraftId::new(),
            confidence,
            citations: proposal.citations().to_vec(),
            safety_notes: Vec::new(),
            model: ModelMetadata::default(),
            required_permissions: proposal.permissions().clone(),
            target: Some(DraftTarget {
                proposal_id: proposal.id().clone(),
                plan: proposal.plan().clone(),
            }),
        }
    }

    pub fn with_model(mut self, model: ModelMetadata) -> Self {
        self.model = model;
        self
    }

    pub fn with_safety_note(mut self, note: impl Into<String>) -> Self {
        self.safety_notes.push(note.into());
        self
    }
}

/// Kind of side effect an interaction layer can surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectKind {
    SendMessage,
    WriteCalendar,
    WriteReminder,
    WriteFile,
    NetworkRequest,
    StoreMemory,
}

/// A side effect descriptor with the user's enable/acknowledge choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffect {
    pub id: String,
    pub kind: SideEffectKind,
    pub description: String,
    pub enabled: bool,
    pub acknowledged: bool,
}

impl SideEffect {
    pub fn new(id: impl Into<String>, kind: SideEffectKind, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            description: description.into(),
            enabled: true,
            acknowledged: false,
        }
    }

    pub fn acknowledged(mut self) -> Self {
        self.acknowledged = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Enabled but not acknowledged by the user
    pub fn needs_acknowledgement(&self) -> bool {
        self.enabled && !self.acknowledged
    }
}
