//! Keystone Types - Canonical domain types for action authorization
//!
//! This crate contains the data model shared by every Keystone crate, with zero
//! dependencies on other keystone crates:
//!
//! - Identity types (ProposalId, TokenId, AttestationId, ...)
//! - Fixed-point USD amounts for budget accounting
//! - Risk tiers, reversibility classes, and blast radius
//! - Permission scopes, manifests, and OS permission snapshots
//! - Tool plans and approval requirements
//! - Proposal packs, cost estimates, and evidence citations
//! - Drafts and side-effect descriptors consumed by the kernel
//!
//! # Architectural Invariants
//!
//! 1. A proposal pack never carries execution authority
//! 2. Only the kernel mints authorization tokens (tokens are not defined here)
//! 3. Citations carry redacted summaries, never raw user content
//!
//! # Flow
//!
//! ```text
//! Skill → ProposalPack → ApprovalGate → CapabilityKernel → AuthorizationToken → Execution → Attestation
//! ```

pub mod identity;
pub mod amount;
pub mod risk;
pub mod permission;
pub mod plan;
pub mod proposal;
pub mod draft;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use risk::*;
pub use permission::*;
pub use plan::*;
pub use proposal::*;
pub use draft::*;
pub use error::*;

/// Version of the Keystone types schema
pub const TYPES_VERSION: &str = "0.1.0";
