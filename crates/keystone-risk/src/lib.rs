//! Keystone Risk - Deterministic scoring for proposed actions
//!
//! Three pure components consulted by proposal generation and by the kernel:
//!
//! - [`RiskEngine`]: scores an action 0-100 and maps it onto a [`RiskTier`]
//! - [`ReversibilityClassifier`]: static policy table from intent type to
//!   reversibility class and blast radius
//! - [`QuorumResolver`]: required signers, approver roles, and cooldown
//!
//! None of them holds execution authority. Same input, same output, always;
//! two independent evaluations of one proposal agree and audit snapshots are
//! reproducible.
//!
//! [`RiskTier`]: keystone_types::RiskTier

pub mod engine;
pub mod quorum;
pub mod reversibility;

pub use engine::{RiskAssessment, RiskContext, RiskEngine, RiskWeights};
pub use quorum::{signer_count, QuorumRequirement, QuorumResolver, CRITICAL_COOLDOWN_SECS};
pub use reversibility::{Classification, ClassificationContext, ReversibilityClassifier};
