//! CapabilityKernel: the sole authorization authority

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use keystone_audit::{record_best_effort, EvidenceComponent, EvidenceEvent, EvidenceSink};
use keystone_crypto::{hash_json, KeyPair, PublicKey, Signable, Signature};
use keystone_risk::QuorumResolver;
use keystone_types::{Draft, PermissionScope, PermissionState, SideEffect, TokenId, ToolPlan};
use tracing::{debug, info, warn};

use crate::config::KernelConfig;
use crate::eligibility::{ConfidenceLevel, Decision, KernelViolation, LowConfidenceConfirmation};
use crate::error::{KernelError, Result, TokenRejection};
use crate::token::{ApprovalSession, AuthorizationToken, ConsumptionReceipt};

/// Evaluates eligibility and mints single-use tokens
///
/// Evaluation is a pure function of its arguments. The only interior state is
/// the set of outstanding token ids, which consumption checks and clears in
/// one atomic step.
pub struct CapabilityKernel {
    config: KernelConfig,
    keypair: KeyPair,
    quorum: QuorumResolver,
    outstanding: DashMap<TokenId, DateTime<Utc>>,
    evidence: Arc<dyn EvidenceSink>,
}

impl CapabilityKernel {
    /// Build a kernel, loading the signing key from config or generating one
    pub fn new(config: KernelConfig, evidence: Arc<dyn EvidenceSink>) -> Result<Self> {
        let keypair = match &config.signing_key_hex {
            Some(seed) => KeyPair::from_hex(seed)
                .map_err(|e| KernelError::InvalidConfig(format!("signing key: {}", e)))?,
            None => KeyPair::generate(),
        };
        Ok(Self::with_keypair(config, keypair, evidence))
    }

    pub fn with_keypair(config: KernelConfig, keypair: KeyPair, evidence: Arc<dyn EvidenceSink>) -> Self {
        let quorum = QuorumResolver::with_critical_cooldown(config.critical_cooldown_secs);
        Self {
            config,
            keypair,
            quorum,
            outstanding: DashMap::new(),
            evidence,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Key execution engines and the gateway use to check token signatures
    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    /// Decide whether a draft may execute
    ///
    /// Every check runs independently; the decision allows execution only
    /// when none of them fails.
    pub fn evaluate_execution_eligibility(
        &self,
        draft: &Draft,
        side_effects: &[SideEffect],
        permission_state: &PermissionState,
        approval_granted: bool,
        low_confidence: LowConfidenceConfirmation,
    ) -> Decision {
        let mut violations = Vec::new();

        if !approval_granted {
            violations.push(KernelViolation::ApprovalNotGranted);
        }

        let confidence = draft.confidence;
        let level = ConfidenceLevel::classify(
            confidence,
            self.config.min_confidence,
            self.config.confirmation_threshold,
        );
        match level {
            ConfidenceLevel::BelowMinimum => {
                violations.push(KernelViolation::ConfidenceBelowMinimum { confidence });
            }
            ConfidenceLevel::Low if !low_confidence.is_confirmed() => {
                violations.push(KernelViolation::LowConfidenceUnconfirmed { confidence });
            }
            _ => {}
        }

        let missing = permission_state.missing_for(&draft.required_permissions);
        if !missing.is_empty() {
            violations.push(KernelViolation::PermissionsNotGranted { domains: missing });
        }

        let unacknowledged: Vec<String> = side_effects
            .iter()
            .filter(|e| e.needs_acknowledgement())
            .map(|e| e.id.clone())
            .collect();
        if !unacknowledged.is_empty() {
            violations.push(KernelViolation::SideEffectsUnacknowledged { ids: unacknowledged });
        }

        let (proposal_id, plan_hash) = match &draft.target {
            Some(target) => {
                let plan_hash = match hash_json(&target.plan) {
                    Ok(hash) => Some(hash),
                    Err(e) => {
                        debug!(error = %e, "Draft plan could not be hashed");
                        None
                    }
                };
                (Some(target.proposal_id.clone()), plan_hash)
            }
            None => (None, None),
        };

        Decision::new(draft.id.clone(), violations, confidence, level).covering(
            proposal_id,
            plan_hash,
            draft.required_permissions.clone(),
        )
    }

    /// Mint a token for an approved plan
    ///
    /// The decision must allow execution and must have been evaluated for the
    /// session's proposal and for exactly `plan`; every approved scope must be
    /// one whose permission the evaluation checked. The decision is consumed
    /// whether or not a token is issued.
    pub fn issue_token(
        &self,
        decision: Decision,
        plan: &ToolPlan,
        session: &ApprovalSession,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationToken> {
        match self.check_issuance(&decision, plan, session, now) {
            Ok(token) => {
                self.outstanding.insert(token.token_id.clone(), token.expires_at);
                record_best_effort(
                    self.evidence.as_ref(),
                    EvidenceComponent::Kernel,
                    EvidenceEvent::TokenIssued {
                        risk_tier: token.risk_tier.as_str().to_string(),
                        scope_count: token.scopes.len(),
                    },
                );
                info!(
                    token_id = %token.token_id,
                    proposal_id = %token.proposal_id,
                    risk_tier = %token.risk_tier,
                    "Authorization token issued"
                );
                Ok(token)
            }
            Err(e) => {
                record_best_effort(
                    self.evidence.as_ref(),
                    EvidenceComponent::Kernel,
                    EvidenceEvent::TokenRefused {
                        code: e.code().to_string(),
                    },
                );
                warn!(code = e.code(), risk_tier = %plan.risk_tier, "Token issuance refused");
                Err(e)
            }
        }
    }

    fn check_issuance(
        &self,
        decision: &Decision,
        plan: &ToolPlan,
        session: &ApprovalSession,
        now: DateTime<Utc>,
    ) -> Result<AuthorizationToken> {
        if !decision.execution_allowed() {
            return Err(KernelError::DecisionNotAllowing);
        }
        if decision.proposal_id() != Some(&session.proposal_id) {
            return Err(KernelError::DecisionProposalMismatch);
        }
        let plan_hash = hash_json(plan)?;
        if decision.plan_hash() != Some(plan_hash.as_str()) {
            return Err(KernelError::DecisionPlanMismatch);
        }
        let evaluated: Vec<&PermissionScope> = decision.evaluated_permissions().scopes().collect();
        if let Some(scope) = session
            .approved_scopes
            .iter()
            .find(|scope| !evaluated.contains(scope))
        {
            return Err(KernelError::ScopeNotEvaluated { scope: scope.label() });
        }

        let quorum = self.quorum.resolve(plan.risk_tier, &[]);
        let required = plan.approval.effective_signers().max(quorum.signers);
        let present = session.distinct_signers();
        if present < required as usize {
            return Err(KernelError::QuorumNotMet { required, present });
        }

        let roles = session.roles();
        for role in quorum.roles.iter().chain(plan.approval.required_roles.iter()) {
            if !roles.contains(role) {
                return Err(KernelError::MissingRole { role: *role });
            }
        }

        if plan.approval.biometric_required && !session.has_biometric() {
            return Err(KernelError::BiometricRequired);
        }

        let cooldown = plan.approval.cooldown_secs.max(quorum.cooldown_secs);
        if cooldown > 0 {
            let elapsed = (now - session.opened_at).num_seconds();
            let remaining = cooldown as i64 - elapsed;
            if remaining > 0 {
                return Err(KernelError::CooldownActive { remaining_secs: remaining });
            }
        }

        let ttl = Duration::seconds(self.config.token_ttl_secs as i64);
        let mut token = AuthorizationToken {
            token_id: TokenId::new(),
            proposal_id: session.proposal_id.clone(),
            approval_session_id: session.id.clone(),
            plan_hash,
            scopes: session.approved_scopes.clone(),
            risk_tier: plan.risk_tier,
            issued_at: now,
            expires_at: now + ttl,
            signature: Signature {
                signature: String::new(),
                public_key: self.keypair.public_key(),
            },
        };
        token.signature = Signature::sign(&self.keypair, &token.signable_bytes())?;
        Ok(token)
    }

    /// Consume a token against the plan about to execute
    ///
    /// The outstanding entry is removed atomically, so of two concurrent
    /// consumptions at most one succeeds. A token that was already consumed
    /// is indistinguishable from one that was never issued.
    pub fn consume_token(
        &self,
        token: &AuthorizationToken,
        plan: &ToolPlan,
        now: DateTime<Utc>,
    ) -> std::result::Result<ConsumptionReceipt, TokenRejection> {
        let result = self.check_consumption(token, plan, now);
        match &result {
            Ok(receipt) => {
                record_best_effort(
                    self.evidence.as_ref(),
                    EvidenceComponent::Kernel,
                    EvidenceEvent::TokenConsumed {
                        risk_tier: receipt.risk_tier().as_str().to_string(),
                    },
                );
                info!(
                    token_id = %receipt.token_id(),
                    execution_id = %receipt.execution_id(),
                    "Authorization token consumed"
                );
            }
            Err(rejection) => {
                record_best_effort(
                    self.evidence.as_ref(),
                    EvidenceComponent::Kernel,
                    EvidenceEvent::TokenRejected {
                        classification: rejection.code().to_string(),
                    },
                );
                warn!(classification = rejection.code(), "Authorization token rejected");
            }
        }
        result
    }

    fn check_consumption(
        &self,
        token: &AuthorizationToken,
        plan: &ToolPlan,
        now: DateTime<Utc>,
    ) -> std::result::Result<ConsumptionReceipt, TokenRejection> {
        if !token.signature.is_from(&self.keypair.public_key()) {
            return Err(TokenRejection::Invalid);
        }
        match token.signature.verify(&token.signable_bytes()) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Err(TokenRejection::Invalid),
        }

        if !self.verify_plan_hash(token, plan) {
            // A token presented against a different plan is burned.
            self.outstanding.remove(&token.token_id);
            return Err(TokenRejection::PlanHashMismatch);
        }

        if self.outstanding.remove(&token.token_id).is_none() {
            return Err(TokenRejection::Unauthorized);
        }

        if token.is_expired_at(now) {
            return Err(TokenRejection::Expired);
        }

        Ok(ConsumptionReceipt::from_token(token, now))
    }

    /// Whether `plan` hashes to the value the token was issued for
    pub fn verify_plan_hash(&self, token: &AuthorizationToken, plan: &ToolPlan) -> bool {
        match hash_json(plan) {
            Ok(hash) => hash == token.plan_hash,
            Err(e) => {
                debug!(error = %e, "Plan could not be hashed");
                false
            }
        }
    }

    /// Whether a token id is still outstanding
    pub fn is_outstanding(&self, token_id: &TokenId) -> bool {
        self.outstanding.contains_key(token_id)
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Drop outstanding entries that expired before `now`
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.outstanding.len();
        self.outstanding.retain(|_, expires_at| now < *expires_at);
        before.saturating_sub(self.outstanding.len())
    }
}
