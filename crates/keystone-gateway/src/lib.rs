//! Keystone Gateway - Enterprise wrapper around kernel decisions
//!
//! - [`PolicyConnector`]s give an organization a veto over proposals. Any
//!   connector may deny; none can override another's denial.
//! - [`Gateway::generate_attestation`] turns a kernel [`ConsumptionReceipt`]
//!   plus the execution outcome into a signed [`Attestation`], retained in a
//!   capped log and exportable for compliance review.
//! - [`verify_export_json`] checks an export offline; the `keystone-attest`
//!   binary wraps it.
//!
//! [`ConsumptionReceipt`]: keystone_kernel::ConsumptionReceipt

pub mod attestation;
pub mod connector;
pub mod gateway;
pub mod verify;

pub use attestation::{Attestation, AttestationExport, ExecutionOutcome, EXPORT_VERSION};
pub use connector::{DomainAllowlistConnector, MaxRiskTierConnector, PolicyConnector, PolicyVerdict};
pub use gateway::{Gateway, GatewayConfig, DEFAULT_ATTESTATION_CAPACITY};
pub use verify::{
    inspect_export_file, inspect_export_json, verify_export_file, verify_export_json,
    AttestationSummary, ExportInspection, ExportVerification,
};

use keystone_crypto::CryptoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Receipt does not belong to this proposal")]
    ProposalMismatch,

    #[error("Receipt was issued under a different approval session")]
    SessionMismatch,

    #[error("Proposal plan does not match the consumed token's plan hash")]
    PlanHashMismatch,

    #[error("Execution already attested")]
    AlreadyAttested,

    #[error("Invalid export: {0}")]
    InvalidExport(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
