//! Keystone Kernel - The sole authorization authority
//!
//! The kernel answers one question, "may this draft execute?", and is the
//! only component that can mint an [`AuthorizationToken`].
//!
//! # Key Types
//!
//! - [`CapabilityKernel`]: pure eligibility evaluation, token issuance, and
//!   atomic single-use consumption
//! - [`ApprovalGate`]: interaction-layer entry point that delegates to the kernel
//! - [`ApprovalSession`]: approvals collected for one proposal
//! - [`AuthorizationToken`]: Ed25519-signed, bound to a plan hash, single use
//! - [`ConsumptionReceipt`]: kernel-only proof that a token was consumed
//!
//! # Flow
//!
//! ```text
//! Draft ─▶ ApprovalGate ─▶ Decision ─▶ issue_token ─▶ AuthorizationToken
//!                                                        │
//!                        execution engine ◀─ consume_token ─▶ ConsumptionReceipt
//! ```

pub mod config;
pub mod eligibility;
pub mod error;
pub mod gate;
pub mod kernel;
pub mod token;

pub use config::{KernelConfig, CONFIRMATION_THRESHOLD, DEFAULT_TOKEN_TTL_SECS, MIN_CONFIDENCE};
pub use eligibility::{ConfidenceLevel, Decision, KernelViolation, LowConfidenceConfirmation};
pub use error::{KernelError, Result, TokenRejection};
pub use gate::{ApprovalGate, ApprovalValidation, ConfidenceSnapshot, InvariantViolation};
pub use kernel::CapabilityKernel;
pub use token::{Approval, ApprovalSession, AuthorizationToken, ConsumptionReceipt};
