//! Permission scopes, manifests, and OS permission snapshots

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Capability domain a plan may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDomain {
    Calendar,
    Mail,
    Reminders,
    Files,
    Network,
    Memory,
}

impl PermissionDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionDomain::Calendar => "calendar",
            PermissionDomain::Mail => "mail",
            PermissionDomain::Reminders => "reminders",
            PermissionDomain::Files => "files",
            PermissionDomain::Network => "network",
            PermissionDomain::Memory => "memory",
        }
    }
}

impl fmt::Display for PermissionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level of access requested within a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Read,
    Write,
    Compose,
    Delete,
}

impl AccessLevel {
    /// Whether this access level can change state outside the device
    pub fn is_mutating(&self) -> bool {
        !matches!(self, AccessLevel::Read)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Compose => "compose",
            AccessLevel::Delete => "delete",
        }
    }
}

/// One (domain, access, detail) capability tuple
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionScope {
    pub domain: PermissionDomain,
    pub access: AccessLevel,
    pub detail: String,
}

impl PermissionScope {
    pub fn new(domain: PermissionDomain, access: AccessLevel, detail: impl Into<String>) -> Self {
        Self {
            domain,
            access,
            detail: detail.into(),
        }
    }

    /// Compact `domain:access` label used in tokens and evidence
    pub fn label(&self) -> String {
        format!("{}:{}", self.domain.as_str(), self.access.as_str())
    }
}

/// Exactly what capability a plan needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionManifest {
    scopes: BTreeSet<PermissionScope>,
}

impl PermissionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scopes(scopes: impl IntoIterator<Item = PermissionScope>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
        }
    }

    pub fn with_scope(mut self, scope: PermissionScope) -> Self {
        self.scopes.insert(scope);
        self
    }

    pub fn scopes(&self) -> impl Iterator<Item = &PermissionScope> {
        self.scopes.iter()
    }

    /// Distinct domains named by the manifest, in stable order
    pub fn domains(&self) -> BTreeSet<PermissionDomain> {
        self.scopes.iter().map(|s| s.domain).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether any scope asks for more than read access
    pub fn has_mutating_scope(&self) -> bool {
        self.scopes.iter().any(|s| s.access.is_mutating())
    }
}

/// OS-reported authorization status for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    NotDetermined,
    Restricted,
}

/// Read-only snapshot of OS permission adapters
///
/// Domains absent from the snapshot are treated as not determined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionState {
    statuses: BTreeMap<PermissionDomain, PermissionStatus>,
}

impl PermissionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot with every listed domain granted
    pub fn granting(domains: impl IntoIterator<Item = PermissionDomain>) -> Self {
        Self {
            statuses: domains
                .into_iter()
                .map(|d| (d, PermissionStatus::Granted))
                .collect(),
        }
    }

    pub fn with_status(mut self, domain: PermissionDomain, status: PermissionStatus) -> Self {
        self.statuses.insert(domain, status);
        self
    }

    pub fn status(&self, domain: PermissionDomain) -> PermissionStatus {
        self.statuses
            .get(&domain)
            .copied()
            .unwrap_or(PermissionStatus::NotDetermined)
    }

    pub fn is_granted(&self, domain: PermissionDomain) -> bool {
        self.status(domain) == PermissionStatus::Granted
    }

    /// Domains of the manifest that are not granted, in stable order
    pub fn missing_for(&self, manifest: &PermissionManifest) -> Vec<PermissionDomain> {
        manifest
            .domains()
            .into_iter()
            .filter(|d| !self.is_granted(*d))
            .collect()
    }
}
