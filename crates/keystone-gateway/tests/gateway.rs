//! Gateway integration tests

use std::sync::Arc;

use chrono::Utc;
use keystone_audit::{MemoryEvidenceSink, NullEvidenceSink};
use keystone_gateway::{
    inspect_export_json, verify_export_file, verify_export_json, DomainAllowlistConnector,
    ExecutionOutcome, Gateway, GatewayConfig, GatewayError, MaxRiskTierConnector,
    PolicyConnector, PolicyVerdict,
};
use keystone_kernel::{
    Approval, ApprovalSession, CapabilityKernel, ConsumptionReceipt, KernelConfig,
    LowConfidenceConfirmation,
};
use keystone_types::{
    AccessLevel, ApprovalRequirement, ApproverRole, BlastRadius, CostEstimate, Draft,
    ExecutionStep, Intent, IntentType, PermissionDomain, PermissionManifest, PermissionScope,
    PermissionState, ProposalPack, ProposalParts, ProposalSource, ReversibilityClass,
    RiskConsequenceAnalysis, RiskTier, ToolPlan,
};

fn reminder_pack() -> ProposalPack {
    ProposalPack::new(ProposalParts {
        source: ProposalSource::VoiceAssistant,
        plan: ToolPlan {
            intent: Intent {
                intent_type: IntentType::CreateReminder,
                summary: "Remind me to renew the lease".to_string(),
                target: "operator".to_string(),
            },
            risk_score: 15,
            risk_tier: RiskTier::Low,
            risk_reasons: vec![],
            reversibility: ReversibilityClass::Reversible,
            reversibility_reason: "reminders can be edited or deleted".to_string(),
            approval: ApprovalRequirement::single_operator(),
            steps: vec![ExecutionStep::mutate(
                "Create reminder",
                Some("Delete the reminder".to_string()),
            )],
        },
        permissions: PermissionManifest::new().with_scope(PermissionScope::new(
            PermissionDomain::Reminders,
            AccessLevel::Write,
            "lease reminder",
        )),
        analysis: RiskConsequenceAnalysis {
            risk_score: 15,
            consequence_tier: RiskTier::Low,
            reversibility: ReversibilityClass::Reversible,
            blast_radius: BlastRadius::SelfOnly,
            reasons: vec![],
        },
        cost: CostEstimate::zero(),
        citations: vec![],
        summary: "Remind me to renew the lease".to_string(),
    })
}

/// Run a proposal through the kernel and return its receipt and session
fn authorize(kernel: &CapabilityKernel, proposal: &ProposalPack) -> (ConsumptionReceipt, ApprovalSession) {
    let now = Utc::now();
    let draft = Draft::for_proposal(proposal, 0.9);
    let decision = kernel.evaluate_execution_eligibility(
        &draft,
        &[],
        &PermissionState::granting([PermissionDomain::Reminders]),
        true,
        LowConfidenceConfirmation::NotConfirmed,
    );
    let mut session = ApprovalSession::open(proposal, now);
    session.approve(Approval::new("operator", ApproverRole::DeviceOperator, now));
    let token = kernel.issue_token(decision, proposal.plan(), &session, now).unwrap();
    let receipt = kernel.consume_token(&token, proposal.plan(), now).unwrap();
    (receipt, session)
}

fn kernel() -> CapabilityKernel {
    CapabilityKernel::new(KernelConfig::default(), Arc::new(NullEvidenceSink)).unwrap()
}

struct AlwaysDeny;

impl PolicyConnector for AlwaysDeny {
    fn id(&self) -> &str {
        "mdm"
    }

    fn validate_policy(&self, _proposal: &ProposalPack) -> PolicyVerdict {
        PolicyVerdict::deny("device not enrolled")
    }
}

#[test]
fn test_no_connectors_allows() {
    let gateway = Gateway::new(GatewayConfig::default()).unwrap();
    assert!(gateway.validate_enterprise_policies(&reminder_pack()).allowed);
}

#[test]
fn test_any_denial_denies() {
    let evidence = MemoryEvidenceSink::default();
    let mut gateway = Gateway::new(GatewayConfig::default())
        .unwrap()
        .with_evidence(Arc::new(evidence.clone()));
    gateway.register_connector(Arc::new(MaxRiskTierConnector::new("risk-cap", RiskTier::High)));
    gateway.register_connector(Arc::new(AlwaysDeny));
    gateway.register_connector(Arc::new(DomainAllowlistConnector::new(
        "domains",
        [PermissionDomain::Reminders],
    )));

    let verdict = gateway.validate_enterprise_policies(&reminder_pack());
    assert!(!verdict.allowed);
    assert_eq!(verdict.reason.as_deref(), Some("mdm: device not enrolled"));
    assert_eq!(evidence.count("policy_denied"), 1);
}

#[test]
fn test_first_denial_is_reported() {
    let mut gateway = Gateway::new(GatewayConfig::default()).unwrap();
    gateway.register_connector(Arc::new(DomainAllowlistConnector::new("domains", [PermissionDomain::Mail])));
    gateway.register_connector(Arc::new(AlwaysDeny));

    let verdict = gateway.validate_enterprise_policies(&reminder_pack());
    assert_eq!(verdict.reason.as_deref(), Some("domains: domains not allowed: reminders"));
}

#[test]
fn test_allow_collects_enforced_scopes() {
    let mut gateway = Gateway::new(GatewayConfig::default()).unwrap();
    gateway.register_connector(Arc::new(MaxRiskTierConnector::new("risk-cap", RiskTier::Medium)));
    gateway.register_connector(Arc::new(DomainAllowlistConnector::new(
        "domains",
        [PermissionDomain::Reminders, PermissionDomain::Calendar],
    )));

    let verdict = gateway.validate_enterprise_policies(&reminder_pack());
    assert!(verdict.allowed);
    assert_eq!(verdict.enforced_scopes.len(), 1);
}

#[test]
fn test_attestation_binds_receipt() {
    let kernel = kernel();
    let gateway = Gateway::new(GatewayConfig::default()).unwrap();
    let proposal = reminder_pack();
    let (receipt, session) = authorize(&kernel, &proposal);

    let attestation = gateway
        .generate_attestation(&receipt, &proposal, session.id.clone(), ExecutionOutcome::Succeeded)
        .unwrap();

    assert!(attestation.verify());
    assert_eq!(&attestation.execution_id, receipt.execution_id());
    assert_eq!(&attestation.token_id, receipt.token_id());
    assert_eq!(attestation.plan_hash, receipt.plan_hash());
    assert_eq!(attestation.approval_session_id, session.id);
    assert_eq!(attestation.approved_scopes.len(), 1);

    let mut tampered = attestation.clone();
    tampered.outcome = ExecutionOutcome::Failed {
        reason: "nope".to_string(),
    };
    assert!(!tampered.verify());
}

#[test]
fn test_attestation_free_text_cannot_be_reframed() {
    let kernel = kernel();
    let gateway = Gateway::new(GatewayConfig::default()).unwrap();
    let proposal = reminder_pack();
    let (receipt, session) = authorize(&kernel, &proposal);

    let failed = gateway
        .generate_attestation(
            &receipt,
            &proposal,
            session.id,
            ExecutionOutcome::Failed {
                reason: "timeout".to_string(),
            },
        )
        .unwrap();
    assert!(failed.verify());

    let mut split = failed.clone();
    let scope = split.approved_scopes[0].clone();
    split.approved_scopes = vec![
        PermissionScope::new(scope.domain, scope.access, "lease"),
        PermissionScope::new(PermissionDomain::Reminders, AccessLevel::Delete, "reminder"),
    ];
    assert!(!split.verify());

    let mut reworded = failed.clone();
    reworded.outcome = ExecutionOutcome::Failed {
        reason: "timeout ".to_string(),
    };
    assert!(!reworded.verify());
}

#[test]
fn test_attestation_rejects_mismatches() {
    let kernel = kernel();
    let gateway = Gateway::new(GatewayConfig::default()).unwrap();
    let proposal = reminder_pack();
    let (receipt, session) = authorize(&kernel, &proposal);

    let other = reminder_pack();
    let err = gateway
        .generate_attestation(&receipt, &other, session.id.clone(), ExecutionOutcome::Succeeded)
        .unwrap_err();
    assert!(matches!(err, GatewayError::ProposalMismatch));

    let err = gateway
        .generate_attestation(
            &receipt,
            &proposal,
            keystone_types::ApprovalSessionId::new(),
            ExecutionOutcome::Succeeded,
        )
        .unwrap_err();
    assert!(matches!(err, GatewayError::SessionMismatch));

    gateway
        .generate_attestation(&receipt, &proposal, session.id.clone(), ExecutionOutcome::RolledBack)
        .unwrap();
    let err = gateway
        .generate_attestation(&receipt, &proposal, session.id.clone(), ExecutionOutcome::Succeeded)
        .unwrap_err();
    assert!(matches!(err, GatewayError::AlreadyAttested));
}

#[test]
fn test_attestations_capped_oldest_evicted() {
    let kernel = kernel();
    let gateway = Gateway::new(GatewayConfig {
        attestation_capacity: 3,
        ..GatewayConfig::default()
    })
    .unwrap();

    let mut executions = Vec::new();
    for _ in 0..5 {
        let proposal = reminder_pack();
        let (receipt, session) = authorize(&kernel, &proposal);
        let attestation = gateway
            .generate_attestation(&receipt, &proposal, session.id, ExecutionOutcome::Succeeded)
            .unwrap();
        executions.push(attestation.execution_id);
    }

    let kept: Vec<_> = gateway.attestations().into_iter().map(|a| a.execution_id).collect();
    assert_eq!(kept, executions[2..].to_vec());
}

#[test]
fn test_evicted_receipt_cannot_be_attested_again() {
    let kernel = kernel();
    let gateway = Gateway::new(GatewayConfig {
        attestation_capacity: 2,
        ..GatewayConfig::default()
    })
    .unwrap();

    let first = reminder_pack();
    let (first_receipt, first_session) = authorize(&kernel, &first);
    gateway
        .generate_attestation(&first_receipt, &first, first_session.id.clone(), ExecutionOutcome::Succeeded)
        .unwrap();

    for _ in 0..3 {
        let proposal = reminder_pack();
        let (receipt, session) = authorize(&kernel, &proposal);
        gateway
            .generate_attestation(&receipt, &proposal, session.id, ExecutionOutcome::Succeeded)
            .unwrap();
    }
    assert!(gateway
        .attestations()
        .iter()
        .all(|a| &a.execution_id != first_receipt.execution_id()));

    let err = gateway
        .generate_attestation(&first_receipt, &first, first_session.id, ExecutionOutcome::Succeeded)
        .unwrap_err();
    assert!(matches!(err, GatewayError::AlreadyAttested));
}

#[test]
fn test_default_capacity_is_one_hundred() {
    assert_eq!(GatewayConfig::default().attestation_capacity, 100);
}

#[test]
fn test_export_verifies_and_detects_tampering() {
    let kernel = kernel();
    let evidence = MemoryEvidenceSink::default();
    let gateway = Gateway::new(GatewayConfig::default())
        .unwrap()
        .with_evidence(Arc::new(evidence.clone()));
    let proposal = reminder_pack();
    let (receipt, session) = authorize(&kernel, &proposal);
    gateway
        .generate_attestation(&receipt, &proposal, session.id, ExecutionOutcome::Succeeded)
        .unwrap();
    assert_eq!(evidence.count("attestation_recorded"), 1);

    let export = gateway.export();
    assert_eq!(export.signer_public_key, gateway.public_key());
    let json = export.to_json().unwrap();

    let result = verify_export_json(&json);
    assert!(result.valid, "{:?}", result.errors);
    assert_eq!(result.attestation_count, 1);

    let inspection = inspect_export_json(&json).unwrap();
    assert!(inspection.attestations[0].signature_valid);
    assert_eq!(inspection.attestations[0].outcome, "succeeded");

    let mut tampered = export.clone();
    tampered.attestations[0].risk_tier = RiskTier::Low;
    tampered.attestations[0].plan_hash = "0".repeat(64);
    let result = verify_export_json(&tampered.to_json().unwrap());
    assert!(!result.valid);
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn test_verify_export_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.json");

    let gateway = Gateway::new(GatewayConfig::default()).unwrap();
    std::fs::write(&path, gateway.export().to_json().unwrap()).unwrap();
    assert!(verify_export_file(&path).unwrap().valid);

    std::fs::write(&path, "{ not json").unwrap();
    let result = verify_export_file(&path).unwrap();
    assert!(!result.valid);

    assert!(matches!(
        verify_export_file(dir.path().join("missing.json")),
        Err(GatewayError::Io(_))
    ));
}
