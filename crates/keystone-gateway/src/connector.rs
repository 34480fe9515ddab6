//! Enterprise policy connectors

use std::collections::BTreeSet;

use keystone_types::{PermissionDomain, PermissionScope, ProposalPack, RiskTier};
use serde::{Deserialize, Serialize};

/// A connector's answer for one proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
    /// Scopes the connector enforces on an allowed proposal
    pub enforced_scopes: Vec<PermissionScope>,
}

impl PolicyVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            enforced_scopes: Vec::new(),
        }
    }

    pub fn allow_with_scopes(enforced_scopes: Vec<PermissionScope>) -> Self {
        Self {
            allowed: true,
            reason: None,
            enforced_scopes,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            enforced_scopes: Vec::new(),
        }
    }
}

/// External policy source (MDM profile, compliance service, ...)
pub trait PolicyConnector: Send + Sync {
    fn id(&self) -> &str;

    fn validate_policy(&self, proposal: &ProposalPack) -> PolicyVerdict;
}

/// Denies proposals above a risk tier
#[derive(Debug, Clone)]
pub struct MaxRiskTierConnector {
    id: String,
    max_tier: RiskTier,
}

impl MaxRiskTierConnector {
    pub fn new(id: impl Into<String>, max_tier: RiskTier) -> Self {
        Self {
            id: id.into(),
            max_tier,
        }
    }
}

impl PolicyConnector for MaxRiskTierConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate_policy(&self, proposal: &ProposalPack) -> PolicyVerdict {
        if proposal.risk_tier() > self.max_tier {
            PolicyVerdict::deny(format!(
                "risk tier {} exceeds organization maximum {}",
                proposal.risk_tier(),
                self.max_tier
            ))
        } else {
            PolicyVerdict::allow()
        }
    }
}

/// Allows only proposals whose manifest stays inside a set of domains
#[derive(Debug, Clone)]
pub struct DomainAllowlistConnector {
    id: String,
    allowed: BTreeSet<PermissionDomain>,
}

impl DomainAllowlistConnector {
    pub fn new(id: impl Into<String>, allowed: impl IntoIterator<Item = PermissionDomain>) -> Self {
        Self {
            id: id.into(),
            allowed: allowed.into_iter().collect(),
        }
    }
}

impl PolicyConnector for DomainAllowlistConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate_policy(&self, proposal: &ProposalPack) -> PolicyVerdict {
        let outside: Vec<&str> = proposal
            .permissions()
            .domains()
            .into_iter()
            .filter(|d| !self.allowed.contains(d))
            .map(|d| d.as_str())
            .collect();

        if outside.is_empty() {
            PolicyVerdict::allow_with_scopes(proposal.permissions().scopes().cloned().collect())
        } else {
            PolicyVerdict::deny(format!("domains not allowed: {}", outside.join(", ")))
        }
    }
}
