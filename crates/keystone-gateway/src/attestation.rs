//! Signed execution attestations and their export format

use chrono::{DateTime, Utc};
use keystone_crypto::{encode_fields, PublicKey, Signable, Signature};
use keystone_types::{
    ApprovalSessionId, AttestationId, ExecutionId, PermissionScope, ProposalId, RiskTier, TokenId,
};
use serde::{Deserialize, Serialize};

/// Export schema version
pub const EXPORT_VERSION: u32 = 1;

/// What the execution engine reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded,
    Failed { reason: String },
    RolledBack,
}

impl ExecutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionOutcome::Succeeded => "succeeded",
            ExecutionOutcome::Failed { .. } => "failed",
            ExecutionOutcome::RolledBack => "rolled_back",
        }
    }
}

/// Signed record binding one authorized execution to its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub id: AttestationId,
    pub execution_id: ExecutionId,
    pub proposal_id: ProposalId,
    pub approval_session_id: ApprovalSessionId,
    pub token_id: TokenId,
    pub plan_hash: String,
    pub risk_tier: RiskTier,
    pub approved_scopes: Vec<PermissionScope>,
    pub outcome: ExecutionOutcome,
    pub attested_at: DateTime<Utc>,
    pub signature: Signature,
}

impl Attestation {
    /// Whether the signature covers the current content
    pub fn verify(&self) -> bool {
        matches!(self.signature.verify(&self.signable_bytes()), Ok(true))
    }
}

impl Signable for Attestation {
    fn signable_bytes(&self) -> Vec<u8> {
        let mut fields = vec![
            "keystone.attestation.v1".to_string(),
            self.id.to_string(),
            self.execution_id.to_string(),
            self.proposal_id.to_string(),
            self.approval_session_id.to_string(),
            self.token_id.to_string(),
            self.plan_hash.clone(),
            self.risk_tier.as_str().to_string(),
            self.approved_scopes.len().to_string(),
        ];
        for scope in &self.approved_scopes {
            fields.push(scope.domain.as_str().to_string());
            fields.push(scope.access.as_str().to_string());
            fields.push(scope.detail.clone());
        }
        fields.push(self.outcome.as_str().to_string());
        if let ExecutionOutcome::Failed { reason } = &self.outcome {
            fields.push(reason.clone());
        }
        fields.push(self.attested_at.timestamp_millis().to_string());
        encode_fields(&fields)
    }
}

/// Compliance export of the retained attestations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationExport {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub signer_public_key: PublicKey,
    pub attestations: Vec<Attestation>,
}

impl AttestationExport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
