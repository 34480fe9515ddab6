//! Keystone Audit - Best-effort evidence log
//!
//! Consequential decisions produce evidence entries. Entries carry enumerated
//! fields and counts only, never free text or user content. Recording is
//! best-effort: a failing sink must never block or alter the decision that
//! produced the entry, so callers go through [`record_best_effort`].
//!
//! Durable append-only storage lives outside the core; this crate defines the
//! sink interface plus in-memory and `tracing` sinks.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use keystone_types::EvidenceId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors a sink may report
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Evidence serialization failed: {0}")]
    Serialization(String),

    #[error("Evidence sink unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, EvidenceError>;

/// Component that produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceComponent {
    Governor,
    Kernel,
    SkillRegistry,
    Gateway,
}

/// What happened, as enumerated fields and counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EvidenceEvent {
    /// Governor evaluated a cost estimate
    EconomicDecision {
        action: String,
        paid: bool,
        estimated_micros: i64,
        remaining_micros: i64,
    },
    /// Governor recorded actual spend
    SpendRecorded { amount_micros: i64, calls_today: u32 },
    /// Governor rolled its ledger to a new day
    LedgerReset { days_skipped: i64 },
    /// Kernel evaluated execution eligibility
    EligibilityEvaluated {
        allowed: bool,
        violation_codes: Vec<String>,
        confidence_band: String,
    },
    /// Kernel minted a token
    TokenIssued { risk_tier: String, scope_count: usize },
    /// Kernel refused to mint a token
    TokenRefused { code: String },
    /// Kernel consumed a token
    TokenConsumed { risk_tier: String },
    /// Kernel rejected a token presentation
    TokenRejected { classification: String },
    /// Skill registry produced a proposal
    ProposalGenerated {
        risk_tier: String,
        signal_count: usize,
        degraded: bool,
    },
    /// Gateway connector denied a proposal
    PolicyDenied { connector_count: usize },
    /// Gateway recorded an attestation
    AttestationRecorded { outcome: String, risk_tier: String },
}

impl EvidenceEvent {
    /// Short event code
    pub fn code(&self) -> &'static str {
        match self {
            Self::EconomicDecision { .. } => "economic_decision",
            Self::SpendRecorded { .. } => "spend_recorded",
            Self::LedgerReset { .. } => "ledger_reset",
            Self::EligibilityEvaluated { .. } => "eligibility_evaluated",
            Self::TokenIssued { .. } => "token_issued",
            Self::TokenRefused { .. } => "token_refused",
            Self::TokenConsumed { .. } => "token_consumed",
            Self::TokenRejected { .. } => "token_rejected",
            Self::ProposalGenerated { .. } => "proposal_generated",
            Self::PolicyDenied { .. } => "policy_denied",
            Self::AttestationRecorded { .. } => "attestation_recorded",
        }
    }
}

/// An evidence log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub id: EvidenceId,
    pub timestamp: DateTime<Utc>,
    pub component: EvidenceComponent,
    pub event: EvidenceEvent,
}

impl EvidenceEntry {
    pub fn new(component: EvidenceComponent, event: EvidenceEvent) -> Self {
        Self {
            id: EvidenceId::new(),
            timestamp: Utc::now(),
            component,
            event,
        }
    }

    /// Chain hash of this entry on top of `previous_hash`
    pub fn chain_hash(&self, previous_hash: &str) -> Result<String> {
        let body =
            serde_json::to_vec(self).map_err(|e| EvidenceError::Serialization(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(previous_hash.as_bytes());
        hasher.update(&body);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Destination for evidence entries
///
/// Implementations must not block for long; the kernel calls this inline.
pub trait EvidenceSink: Send + Sync {
    fn record(&self, entry: EvidenceEntry) -> Result<()>;
}

/// Record an entry, swallowing any sink failure
pub fn record_best_effort(sink: &dyn EvidenceSink, component: EvidenceComponent, event: EvidenceEvent) {
    let code = event.code();
    if let Err(e) = sink.record(EvidenceEntry::new(component, event)) {
        tracing::debug!(event = code, error = %e, "evidence entry dropped");
    }
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvidenceSink;

impl EvidenceSink for NullEvidenceSink {
    fn record(&self, _entry: EvidenceEntry) -> Result<()> {
        Ok(())
    }
}

/// Sink that forwards entries to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEvidenceSink;

impl EvidenceSink for TracingEvidenceSink {
    fn record(&self, entry: EvidenceEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry.event)
            .map_err(|e| EvidenceError::Serialization(e.to_string()))?;
        tracing::info!(
            target: "keystone::evidence",
            id = %entry.id,
            component = ?entry.component,
            event = entry.event.code(),
            payload = %payload,
            "evidence"
        );
        Ok(())
    }
}

/// A chained entry held by [`MemoryEvidenceSink`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedEntry {
    pub entry: EvidenceEntry,
    pub previous_hash: String,
    pub hash: String,
}

#[derive(Debug, Default)]
struct MemoryLog {
    entries: VecDeque<ChainedEntry>,
    head: String,
}

/// Bounded in-memory sink with a hash chain, for tests and local inspection
#[derive(Debug, Clone)]
pub struct MemoryEvidenceSink {
    log: Arc<Mutex<MemoryLog>>,
    capacity: usize,
}

impl MemoryEvidenceSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: Arc::new(Mutex::new(MemoryLog::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<EvidenceEntry> {
        self.log.lock().entries.iter().map(|c| c.entry.clone()).collect()
    }

    pub fn chained(&self) -> Vec<ChainedEntry> {
        self.log.lock().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().entries.is_empty()
    }

    /// Count of entries with the given event code
    pub fn count(&self, code: &str) -> usize {
        self.log
            .lock()
            .entries
            .iter()
            .filter(|c| c.entry.event.code() == code)
            .count()
    }

    /// Verify that every retained entry links to its predecessor
    pub fn verify_chain(&self) -> bool {
        let log = self.log.lock();
        let mut previous: Option<&str> = None;
        for chained in &log.entries {
            if let Some(prev) = previous {
                if chained.previous_hash != prev {
                    return false;
                }
            }
            match chained.entry.chain_hash(&chained.previous_hash) {
                Ok(hash) if hash == chained.hash => {}
                _ => return false,
            }
            previous = Some(&chained.hash);
        }
        true
    }
}

impl Default for MemoryEvidenceSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EvidenceSink for MemoryEvidenceSink {
    fn record(&self, entry: EvidenceEntry) -> Result<()> {
        let mut log = self.log.lock();
        let previous_hash = log.head.clone();
        let hash = entry.chain_hash(&previous_hash)?;
        log.head = hash.clone();
        log.entries.push_back(ChainedEntry {
            entry,
            previous_hash,
            hash,
        });
        while log.entries.len() > self.capacity {
            log.entries.pop_front();
        }
        Ok(())
    }
}
