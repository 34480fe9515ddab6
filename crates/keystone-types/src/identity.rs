//! Identity types for Keystone
//!
//! Every artifact the kernel reasons about gets its own strongly typed id so a
//! token id can never be passed where a proposal id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Macro to generate ID types with common implementations
macro_rules! define_id_type {
    ($name:ident, $prefix:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from a string (with or without prefix)
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                let s = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }

            /// Get the inner UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

// Proposal pipeline
define_id_type!(ProposalId, "proposal", "Unique identifier for a proposal pack");
define_id_type!(DraftId, "draft", "Unique identifier for a finished model draft");

// Authorization
define_id_type!(TokenId, "token", "Unique identifier for an authorization token");
define_id_type!(ApprovalSessionId, "approval", "Unique identifier for an approval session");

// Execution & attestation
define_id_type!(ExecutionId, "exec", "Unique identifier for an execution reported by the engine");
define_id_type!(AttestationId, "attest", "Unique identifier for a signed attestation");

// Evidence
define_id_type!(EvidenceId, "evidence", "Unique identifier for an evidence log entry");
