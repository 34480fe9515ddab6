//! Skill registry: admission, staged execution, bounded proposal history

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use keystone_audit::{record_best_effort, EvidenceComponent, EvidenceEvent, EvidenceSink, NullEvidenceSink};
use keystone_types::ProposalPack;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::skill::{Observation, Skill, SkillError, SkillInput, TaskCategory};
use crate::Result;

/// Packs kept in history by default
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub interactive_budget: Duration,
    pub background_budget: Duration,
    pub bulk_budget: Duration,
    pub history_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            interactive_budget: TaskCategory::Interactive.default_budget(),
            background_budget: TaskCategory::Background.default_budget(),
            bulk_budget: TaskCategory::Bulk.default_budget(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl RegistryConfig {
    /// Defaults overridden by `KEYSTONE_INTERACTIVE_BUDGET_MS`,
    /// `KEYSTONE_BACKGROUND_BUDGET_MS`, `KEYSTONE_BULK_BUDGET_MS` and
    /// `KEYSTONE_SKILL_HISTORY`
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let millis = |key: &str, fallback: Duration| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            interactive_budget: millis("KEYSTONE_INTERACTIVE_BUDGET_MS", defaults.interactive_budget),
            background_budget: millis("KEYSTONE_BACKGROUND_BUDGET_MS", defaults.background_budget),
            bulk_budget: millis("KEYSTONE_BULK_BUDGET_MS", defaults.bulk_budget),
            history_capacity: std::env::var("KEYSTONE_SKILL_HISTORY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_capacity),
        }
    }

    pub fn budget_for(&self, category: TaskCategory) -> Duration {
        match category {
            TaskCategory::Interactive => self.interactive_budget,
            TaskCategory::Background => self.background_budget,
            TaskCategory::Bulk => self.bulk_budget,
        }
    }
}

/// One completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub skill_id: String,
    pub proposal: ProposalPack,
    pub degraded: bool,
    pub completed_at: DateTime<Utc>,
}

/// Holds registered skills and runs them
///
/// There is deliberately no approve or execute method: a run ends with a
/// [`ProposalPack`], which carries no authority.
pub struct SkillRegistry {
    config: RegistryConfig,
    skills: HashMap<String, Arc<dyn Skill>>,
    history: Mutex<VecDeque<HistoryEntry>>,
    evidence: Arc<dyn EvidenceSink>,
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl SkillRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            skills: HashMap::new(),
            history: Mutex::new(VecDeque::new()),
            evidence: Arc::new(NullEvidenceSink),
        }
    }

    pub fn with_evidence(mut self, evidence: Arc<dyn EvidenceSink>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Admit a skill
    pub fn register(&mut self, skill: Arc<dyn Skill>) -> Result<()> {
        let skill_id = skill.id().to_string();

        if !skill.always_produces_proposal() {
            warn!(skill_id = %skill_id, "Rejected skill without proposal guarantee");
            return Err(SkillError::MissingProposalGuarantee { skill_id });
        }
        if self.skills.contains_key(&skill_id) {
            return Err(SkillError::AlreadyRegistered { skill_id });
        }

        info!(
            skill_id = %skill_id,
            name = skill.display_name(),
            category = ?skill.task_category(),
            "Skill registered"
        );
        self.skills.insert(skill_id, skill);
        Ok(())
    }

    pub fn get(&self, skill_id: &str) -> Option<Arc<dyn Skill>> {
        self.skills.get(skill_id).cloned()
    }

    /// Registered ids in sorted order
    pub fn skill_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.skills.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Observe, analyze, and package one input
    ///
    /// The observe stage runs under the skill's latency budget. When it
    /// overruns, the in-flight future is dropped and the run continues from a
    /// degraded observation. The pack joins history only once all three
    /// stages succeed.
    pub async fn run(&self, skill_id: &str, input: SkillInput) -> Result<ProposalPack> {
        let skill = self.get(skill_id).ok_or_else(|| SkillError::UnknownSkill {
            skill_id: skill_id.to_string(),
        })?;

        let budget = self.config.budget_for(skill.task_category());
        let observation = match tokio::time::timeout(budget, skill.observe(&input)).await {
            Ok(observation) => observation?,
            Err(_) => {
                warn!(
                    skill_id = %skill_id,
                    budget_ms = budget.as_millis() as u64,
                    "Observe exceeded latency budget; continuing degraded"
                );
                Observation::degraded(skill_id, input)
            }
        };
        debug!(
            skill_id = %skill_id,
            signals = observation.signals.len(),
            confidence = observation.confidence,
            "Observation complete"
        );

        let analysis = skill.analyze(&observation)?;
        let proposal = skill.generate_proposal(&analysis)?;

        record_best_effort(
            self.evidence.as_ref(),
            EvidenceComponent::SkillRegistry,
            EvidenceEvent::ProposalGenerated {
                risk_tier: proposal.risk_tier().as_str().to_string(),
                signal_count: observation.signals.len(),
                degraded: observation.degraded,
            },
        );
        info!(
            skill_id = %skill_id,
            proposal_id = %proposal.id(),
            risk_tier = %proposal.risk_tier(),
            degraded = observation.degraded,
            "Proposal generated"
        );

        self.push_history(HistoryEntry {
            skill_id: skill_id.to_string(),
            proposal: proposal.clone(),
            degraded: observation.degraded,
            completed_at: Utc::now(),
        });

        Ok(proposal)
    }

    fn push_history(&self, entry: HistoryEntry) {
        let mut history = self.history.lock();
        history.push_back(entry);
        while history.len() > self.config.history_capacity {
            history.pop_front();
        }
    }

    /// Recent runs, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<ProposalPack> {
        self.history.lock().back().map(|e| e.proposal.clone())
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = RegistryConfig::default();
        assert_eq!(config.budget_for(TaskCategory::Interactive), Duration::from_secs(2));
        assert_eq!(config.budget_for(TaskCategory::Background), Duration::from_secs(10));
        assert_eq!(config.budget_for(TaskCategory::Bulk), Duration::from_secs(30));
        assert_eq!(config.history_capacity, 50);
    }

    #[tokio::test]
    async fn test_run_unknown_skill() {
        let registry = SkillRegistry::default();
        let err = registry
            .run("missing", SkillInput::text(keystone_types::ProposalSource::User, "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, SkillError::UnknownSkill { .. }));
        assert_eq!(registry.history_len(), 0);
    }
}
