//! Kernel error types

use keystone_crypto::CryptoError;
use keystone_types::ApproverRole;
use thiserror::Error;

/// Why the kernel refused to issue a token
#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Decision does not allow execution")]
    DecisionNotAllowing,

    #[error("Decision was not evaluated for this proposal")]
    DecisionProposalMismatch,

    #[error("Decision was not evaluated for this plan")]
    DecisionPlanMismatch,

    #[error("Approved scope was not covered by the evaluated permissions: {scope}")]
    ScopeNotEvaluated { scope: String },

    #[error("Approval quorum not met: {present} of {required} signers")]
    QuorumNotMet { required: u8, present: usize },

    #[error("Required approver role missing: {}", role.as_str())]
    MissingRole { role: ApproverRole },

    #[error("Biometric confirmation required")]
    BiometricRequired,

    #[error("Cooldown active: {remaining_secs}s remaining")]
    CooldownActive { remaining_secs: i64 },

    #[error("Invalid kernel configuration: {0}")]
    InvalidConfig(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl KernelError {
    pub fn code(&self) -> &'static str {
        match self {
            KernelError::DecisionNotAllowing => "decision_not_allowing",
            KernelError::DecisionProposalMismatch => "decision_proposal_mismatch",
            KernelError::DecisionPlanMismatch => "decision_plan_mismatch",
            KernelError::ScopeNotEvaluated { .. } => "scope_not_evaluated",
            KernelError::QuorumNotMet { .. } => "quorum_not_met",
            KernelError::MissingRole { .. } => "missing_role",
            KernelError::BiometricRequired => "biometric_required",
            KernelError::CooldownActive { .. } => "cooldown_active",
            KernelError::InvalidConfig(_) => "invalid_config",
            KernelError::Crypto(_) => "crypto",
        }
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;

/// Why a token was refused at consumption
///
/// A replayed token and a token the kernel never issued both classify as
/// [`TokenRejection::Unauthorized`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("Token signature invalid or malformed")]
    Invalid,

    #[error("Plan hash does not match the authorized plan")]
    PlanHashMismatch,

    #[error("Token expired")]
    Expired,

    #[error("Token not authorized")]
    Unauthorized,
}

impl TokenRejection {
    pub fn code(&self) -> &'static str {
        match self {
            TokenRejection::Invalid => "invalid",
            TokenRejection::PlanHashMismatch => "plan_hash_mismatch",
            TokenRejection::Expired => "expired",
            TokenRejection::Unauthorized => "unauthorized",
        }
    }
}
