//! The Gateway: policy fan-out and attestation log

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use keystone_audit::{record_best_effort, EvidenceComponent, EvidenceEvent, EvidenceSink, NullEvidenceSink};
use keystone_crypto::{hash_json, KeyPair, PublicKey, Signable, Signature};
use keystone_kernel::ConsumptionReceipt;
use keystone_types::{ApprovalSessionId, AttestationId, ExecutionId, ProposalPack};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::attestation::{Attestation, AttestationExport, ExecutionOutcome, EXPORT_VERSION};
use crate::connector::{PolicyConnector, PolicyVerdict};
use crate::{GatewayError, Result};

/// Attestations retained before the oldest is evicted
pub const DEFAULT_ATTESTATION_CAPACITY: usize = 100;

/// Execution ids remembered for duplicate detection
pub const DEFAULT_ATTESTED_ID_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub attestation_capacity: usize,
    /// Never below `attestation_capacity`
    pub attested_id_capacity: usize,
    /// Hex Ed25519 seed for attestation signing; generated when absent
    pub signing_key_hex: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            attestation_capacity: DEFAULT_ATTESTATION_CAPACITY,
            attested_id_capacity: DEFAULT_ATTESTED_ID_CAPACITY,
            signing_key_hex: None,
        }
    }
}

impl GatewayConfig {
    /// Reads `KEYSTONE_ATTESTATION_CAPACITY`, `KEYSTONE_ATTESTED_ID_CAPACITY`
    /// and `KEYSTONE_GATEWAY_SIGNING_KEY`
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();
        Self {
            attestation_capacity: std::env::var("KEYSTONE_ATTESTATION_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.attestation_capacity),
            attested_id_capacity: std::env::var("KEYSTONE_ATTESTED_ID_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.attested_id_capacity),
            signing_key_hex: std::env::var("KEYSTONE_GATEWAY_SIGNING_KEY").ok(),
        }
    }
}

/// Wraps kernel decisions for enterprise deployments
///
/// The gateway never authorizes anything itself. Connectors may only deny,
/// and attestations can only be produced from a kernel-issued
/// [`ConsumptionReceipt`].
pub struct Gateway {
    config: GatewayConfig,
    keypair: KeyPair,
    connectors: Vec<Arc<dyn PolicyConnector>>,
    attestations: Mutex<AttestationLog>,
    evidence: Arc<dyn EvidenceSink>,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let keypair = match &config.signing_key_hex {
            Some(seed) => KeyPair::from_hex(seed)?,
            None => KeyPair::generate(),
        };
        Ok(Self {
            config,
            keypair,
            connectors: Vec::new(),
            attestations: Mutex::new(AttestationLog::default()),
            evidence: Arc::new(NullEvidenceSink),
        })
    }

    pub fn with_evidence(mut self, evidence: Arc<dyn EvidenceSink>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn register_connector(&mut self, connector: Arc<dyn PolicyConnector>) {
        info!(connector = connector.id(), "Policy connector registered");
        self.connectors.push(connector);
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Run every connector; the first denial wins, no connectors means allow
    pub fn validate_enterprise_policies(&self, proposal: &ProposalPack) -> PolicyVerdict {
        let mut first_denial: Option<(String, PolicyVerdict)> = None;
        let mut denials = 0usize;
        let mut enforced = Vec::new();

        for connector in &self.connectors {
            let verdict = connector.validate_policy(proposal);
            if verdict.allowed {
                enforced.extend(verdict.enforced_scopes);
                continue;
            }
            denials += 1;
            if first_denial.is_none() {
                first_denial = Some((connector.id().to_string(), verdict));
            }
        }

        match first_denial {
            Some((connector_id, verdict)) => {
                record_best_effort(
                    self.evidence.as_ref(),
                    EvidenceComponent::Gateway,
                    EvidenceEvent::PolicyDenied {
                        connector_count: denials,
                    },
                );
                warn!(
                    connector = %connector_id,
                    proposal_id = %proposal.id(),
                    denials,
                    "Enterprise policy denied proposal"
                );
                let reason = verdict.reason.unwrap_or_else(|| "denied".to_string());
                PolicyVerdict::deny(format!("{}: {}", connector_id, reason))
            }
            None => {
                enforced.sort();
                enforced.dedup();
                PolicyVerdict::allow_with_scopes(enforced)
            }
        }
    }

    /// Sign and retain an attestation for a completed execution
    ///
    /// A receipt is attested at most once while its execution id is among the
    /// last `attested_id_capacity` attested, which always covers the retained
    /// attestations.
    pub fn generate_attestation(
        &self,
        receipt: &ConsumptionReceipt,
        proposal: &ProposalPack,
        approval_session_id: ApprovalSessionId,
        outcome: ExecutionOutcome,
    ) -> Result<Attestation> {
        if receipt.proposal_id() != proposal.id() {
            return Err(GatewayError::ProposalMismatch);
        }
        if receipt.approval_session_id() != &approval_session_id {
            return Err(GatewayError::SessionMismatch);
        }
        if hash_json(proposal.plan())? != receipt.plan_hash() {
            return Err(GatewayError::PlanHashMismatch);
        }

        let mut log = self.attestations.lock();
        if log.attested.contains(receipt.execution_id()) {
            return Err(GatewayError::AlreadyAttested);
        }

        let mut attestation = Attestation {
            id: AttestationId::new(),
            execution_id: receipt.execution_id().clone(),
            proposal_id: receipt.proposal_id().clone(),
            approval_session_id,
            token_id: receipt.token_id().clone(),
            plan_hash: receipt.plan_hash().to_string(),
            risk_tier: receipt.risk_tier(),
            approved_scopes: receipt.scopes().to_vec(),
            outcome,
            attested_at: Utc::now(),
            signature: Signature {
                signature: String::new(),
                public_key: self.keypair.public_key(),
            },
        };
        attestation.signature = Signature::sign(&self.keypair, &attestation.signable_bytes())?;

        log.record(
            attestation.clone(),
            self.config.attestation_capacity,
            self.config.attested_id_capacity,
        );
        drop(log);

        record_best_effort(
            self.evidence.as_ref(),
            EvidenceComponent::Gateway,
            EvidenceEvent::AttestationRecorded {
                outcome: attestation.outcome.as_str().to_string(),
                risk_tier: attestation.risk_tier.as_str().to_string(),
            },
        );
        info!(
            attestation_id = %attestation.id,
            execution_id = %attestation.execution_id,
            outcome = attestation.outcome.as_str(),
            "Attestation recorded"
        );

        Ok(attestation)
    }

    /// Retained attestations, oldest first
    pub fn attestations(&self) -> Vec<Attestation> {
        self.attestations.lock().retained.iter().cloned().collect()
    }

    pub fn export(&self) -> AttestationExport {
        AttestationExport {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            signer_public_key: self.keypair.public_key(),
            attestations: self.attestations(),
        }
    }
}

/// Retained attestations plus the wider window of attested execution ids
#[derive(Default)]
struct AttestationLog {
    retained: VecDeque<Attestation>,
    attested: HashSet<ExecutionId>,
    attested_order: VecDeque<ExecutionId>,
}

impl AttestationLog {
    fn record(&mut self, attestation: Attestation, capacity: usize, id_capacity: usize) {
        let id_capacity = id_capacity.max(capacity);
        self.attested.insert(attestation.execution_id.clone());
        self.attested_order.push_back(attestation.execution_id.clone());
        while self.attested_order.len() > id_capacity {
            if let Some(oldest) = self.attested_order.pop_front() {
                self.attested.remove(&oldest);
            }
        }

        self.retained.push_back(attestation);
        while self.retained.len() > capacity {
            self.retained.pop_front();
        }
    }
}
