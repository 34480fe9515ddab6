//! Approval sessions, authorization tokens, and consumption receipts

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use keystone_crypto::{encode_fields, Signable, Signature};
use keystone_types::{
    ApprovalSessionId, ApproverRole, ExecutionId, PermissionScope, ProposalId, ProposalPack,
    RiskTier, TokenId,
};
use serde::{Deserialize, Serialize};

/// One signer's approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub signer_id: String,
    pub role: ApproverRole,
    pub biometric: bool,
    pub approved_at: DateTime<Utc>,
}

impl Approval {
    pub fn new(signer_id: impl Into<String>, role: ApproverRole, approved_at: DateTime<Utc>) -> Self {
        Self {
            signer_id: signer_id.into(),
            role,
            biometric: false,
            approved_at,
        }
    }

    pub fn with_biometric(mut self) -> Self {
        self.biometric = true;
        self
    }
}

/// Approvals collected for one proposal
///
/// The session's opening time starts any cooldown the plan carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSession {
    pub id: ApprovalSessionId,
    pub proposal_id: ProposalId,
    pub opened_at: DateTime<Utc>,
    /// Scopes the operator agreed to; copied from the proposal's manifest
    pub approved_scopes: Vec<PermissionScope>,
    approvals: Vec<Approval>,
}

impl ApprovalSession {
    /// Open a session over a proposal
    pub fn open(proposal: &ProposalPack, opened_at: DateTime<Utc>) -> Self {
        Self {
            id: ApprovalSessionId::new(),
            proposal_id: proposal.id().clone(),
            opened_at,
            approved_scopes: proposal.permissions().scopes().cloned().collect(),
            approvals: Vec::new(),
        }
    }

    /// Record an approval. Returns `false` if the signer already approved.
    pub fn approve(&mut self, approval: Approval) -> bool {
        if self.approvals.iter().any(|a| a.signer_id == approval.signer_id) {
            return false;
        }
        self.approvals.push(approval);
        true
    }

    pub fn approvals(&self) -> &[Approval] {
        &self.approvals
    }

    pub fn distinct_signers(&self) -> usize {
        self.approvals.len()
    }

    pub fn roles(&self) -> BTreeSet<ApproverRole> {
        self.approvals.iter().map(|a| a.role).collect()
    }

    pub fn has_biometric(&self) -> bool {
        self.approvals.iter().any(|a| a.biometric)
    }
}

/// Single-use proof that the kernel authorized one exact plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationToken {
    pub token_id: TokenId,
    pub proposal_id: ProposalId,
    pub approval_session_id: ApprovalSessionId,
    /// SHA-256 of the plan's canonical JSON
    pub plan_hash: String,
    pub scopes: Vec<PermissionScope>,
    pub risk_tier: RiskTier,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub signature: Signature,
}

impl AuthorizationToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl Signable for AuthorizationToken {
    fn signable_bytes(&self) -> Vec<u8> {
        let mut fields = vec![
            "keystone.token.v1".to_string(),
            self.token_id.to_string(),
            self.proposal_id.to_string(),
            self.approval_session_id.to_string(),
            self.plan_hash.clone(),
            self.scopes.len().to_string(),
        ];
        for scope in &self.scopes {
            fields.push(scope.domain.as_str().to_string());
            fields.push(scope.access.as_str().to_string());
            fields.push(scope.detail.clone());
        }
        fields.push(self.risk_tier.as_str().to_string());
        fields.push(self.issued_at.timestamp_millis().to_string());
        fields.push(self.expires_at.timestamp_millis().to_string());
        encode_fields(&fields)
    }
}

/// Result of a successful consumption
///
/// Only the kernel creates receipts; downstream components (the gateway)
/// accept nothing else as proof that an execution was authorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsumptionReceipt {
    execution_id: ExecutionId,
    token_id: TokenId,
    proposal_id: ProposalId,
    approval_session_id: ApprovalSessionId,
    plan_hash: String,
    scopes: Vec<PermissionScope>,
    risk_tier: RiskTier,
    consumed_at: DateTime<Utc>,
    kernel_signature: Signature,
}

impl ConsumptionReceipt {
    pub(crate) fn from_token(token: &AuthorizationToken, consumed_at: DateTime<Utc>) -> Self {
        Self {
            execution_id: ExecutionId::new(),
            token_id: token.token_id.clone(),
            proposal_id: token.proposal_id.clone(),
            approval_session_id: token.approval_session_id.clone(),
            plan_hash: token.plan_hash.clone(),
            scopes: token.scopes.clone(),
            risk_tier: token.risk_tier,
            consumed_at,
            kernel_signature: token.signature.clone(),
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    pub fn token_id(&self) -> &TokenId {
        &self.token_id
    }

    pub fn proposal_id(&self) -> &ProposalId {
        &self.proposal_id
    }

    pub fn approval_session_id(&self) -> &ApprovalSessionId {
        &self.approval_session_id
    }

    pub fn plan_hash(&self) -> &str {
        &self.plan_hash
    }

    pub fn scopes(&self) -> &[PermissionScope] {
        &self.scopes
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.risk_tier
    }

    pub fn consumed_at(&self) -> DateTime<Utc> {
        self.consumed_at
    }

    /// Signature of the token this receipt consumed
    pub fn kernel_signature(&self) -> &Signature {
        &self.kernel_signature
    }
}
