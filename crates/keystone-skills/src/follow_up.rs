//! Reference skill: detects follow-up commitments and proposes the follow-up

use async_trait::async_trait;
use keystone_risk::{ClassificationContext, QuorumResolver, ReversibilityClassifier, RiskContext, RiskEngine};
use keystone_types::{
    AccessLevel, CostEstimate, EvidenceCitation, ExecutionStep, Intent, IntentType,
    PermissionDomain, PermissionManifest, PermissionScope, ProposalPack, ProposalParts,
    RiskConsequenceAnalysis, RiskTier, SignalCategory, ToolPlan,
};

use crate::skill::{
    Analysis, AnalysisItem, Observation, Signal, Skill, SkillInput, SuggestedAction, TaskCategory,
};
use crate::Result;

/// (phrase, label, category, weight, confidence)
const LEXICON: &[(&str, &str, SignalCategory, f64, f64)] = &[
    ("follow up", "follow_up", SignalCategory::Commitment, 0.6, 0.9),
    ("get back to", "get_back_to", SignalCategory::Commitment, 0.6, 0.85),
    ("i'll send", "promised_send", SignalCategory::Commitment, 0.5, 0.8),
    ("remind me", "remind_me", SignalCategory::Commitment, 0.4, 0.9),
    ("by friday", "by_weekday", SignalCategory::Deadline, 0.5, 0.8),
    ("tomorrow", "tomorrow", SignalCategory::Deadline, 0.4, 0.7),
    ("end of day", "end_of_day", SignalCategory::Deadline, 0.5, 0.8),
    ("deadline", "deadline", SignalCategory::Deadline, 0.5, 0.75),
    ("invoice", "invoice", SignalCategory::Financial, 0.8, 0.85),
    ("payment", "payment", SignalCategory::Financial, 0.8, 0.8),
    ("wire transfer", "wire_transfer", SignalCategory::Financial, 0.9, 0.9),
    ("contract", "contract", SignalCategory::Legal, 0.8, 0.8),
    ("nda", "nda", SignalCategory::Legal, 0.8, 0.75),
    ("everyone", "everyone", SignalCategory::MultiParty, 0.5, 0.7),
    ("all-hands", "all_hands", SignalCategory::MultiParty, 0.6, 0.85),
    ("cannot be undone", "cannot_be_undone", SignalCategory::Irreversible, 0.7, 0.85),
    ("fyi", "fyi", SignalCategory::Informational, 0.1, 0.6),
];

const READ_PERMISSIONS: &[PermissionDomain] = &[PermissionDomain::Mail];

/// Lexicon-based follow-up detector
///
/// Finds commitments in a thread and proposes either a follow-up message (when
/// other parties are present) or a reminder for the operator. Runs entirely
/// on device.
#[derive(Debug, Clone, Default)]
pub struct FollowUpSkill {
    engine: RiskEngine,
    classifier: ReversibilityClassifier,
    quorum: QuorumResolver,
}

impl FollowUpSkill {
    pub const ID: &'static str = "follow_up";

    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercased words separated by single spaces, padded at both ends so
    /// phrases only match on word boundaries
    fn normalize(text: &str) -> String {
        let words: Vec<String> = text
            .to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        format!(" {} ", words.join(" "))
    }

    fn extract_signals(text: &str) -> Vec<Signal> {
        let haystack = Self::normalize(text);
        LEXICON
            .iter()
            .filter(|(phrase, ..)| haystack.contains(&format!(" {} ", phrase)))
            .map(|(_, label, category, weight, confidence)| Signal {
                label: (*label).to_string(),
                category: *category,
                weight: *weight,
                confidence: *confidence,
            })
            .collect()
    }

    fn item_tier(&self, category: SignalCategory) -> RiskTier {
        match category {
            SignalCategory::Financial | SignalCategory::Legal | SignalCategory::Irreversible => {
                RiskTier::High
            }
            SignalCategory::MultiParty => RiskTier::Medium,
            SignalCategory::Commitment | SignalCategory::Deadline => self.default_risk_tier(),
            SignalCategory::Informational => RiskTier::Low,
        }
    }

    fn choose_intent(analysis: &Analysis) -> IntentType {
        let suggested: Vec<IntentType> = analysis
            .items
            .iter()
            .filter_map(|i| i.suggested_action.as_ref().map(|a| a.intent))
            .collect();

        if suggested.contains(&IntentType::SendMessage) {
            IntentType::SendMessage
        } else if suggested.contains(&IntentType::CreateReminder) {
            IntentType::CreateReminder
        } else {
            IntentType::ReadOnlySummary
        }
    }

    fn plan_shape(
        intent: IntentType,
        recipients: u32,
    ) -> (String, PermissionManifest, Vec<ExecutionStep>) {
        match intent {
            IntentType::SendMessage => (
                format!("Send follow-up to {} recipient(s)", recipients),
                PermissionManifest::from_scopes([
                    PermissionScope::new(PermissionDomain::Mail, AccessLevel::Read, "thread context"),
                    PermissionScope::new(PermissionDomain::Mail, AccessLevel::Compose, "follow-up message"),
                ]),
                vec![
                    ExecutionStep::read("Load thread context"),
                    ExecutionStep::mutate("Send follow-up message", None),
                ],
            ),
            IntentType::CreateReminder => (
                "Create follow-up reminder".to_string(),
                PermissionManifest::new().with_scope(PermissionScope::new(
                    PermissionDomain::Reminders,
                    AccessLevel::Write,
                    "follow-up reminder",
                )),
                vec![ExecutionStep::mutate(
                    "Create reminder",
                    Some("Delete the reminder".to_string()),
                )],
            ),
            _ => (
                "No follow-up detected".to_string(),
                PermissionManifest::new().with_scope(PermissionScope::new(
                    PermissionDomain::Mail,
                    AccessLevel::Read,
                    "thread context",
                )),
                vec![ExecutionStep::read("Summarize thread")],
            ),
        }
    }
}

#[async_trait]
impl Skill for FollowUpSkill {
    fn id(&self) -> &str {
        Self::ID
    }

    fn display_name(&self) -> &str {
        "Follow-up detector"
    }

    fn default_risk_tier(&self) -> RiskTier {
        RiskTier::Medium
    }

    fn read_permissions(&self) -> &[PermissionDomain] {
        READ_PERMISSIONS
    }

    fn required_signers(&self) -> u8 {
        1
    }

    fn always_produces_proposal(&self) -> bool {
        true
    }

    fn task_category(&self) -> TaskCategory {
        TaskCategory::Interactive
    }

    async fn observe(&self, input: &SkillInput) -> Result<Observation> {
        let signals = Self::extract_signals(&input.text);
        let confidence = signals.iter().map(|s| s.confidence).fold(0.0, f64::max);
        Ok(Observation {
            skill_id: Self::ID.to_string(),
            input: input.clone(),
            signals,
            confidence,
            degraded: false,
        })
    }

    fn analyze(&self, observation: &Observation) -> Result<Analysis> {
        let has_others = observation.input.participant_count > 0;

        let items = observation
            .signals
            .iter()
            .map(|signal| {
                let suggested_action = match signal.category {
                    SignalCategory::Commitment if has_others && signal.label != "remind_me" => {
                        Some(SuggestedAction {
                            intent: IntentType::SendMessage,
                            summary: "Send the promised follow-up".to_string(),
                        })
                    }
                    SignalCategory::Commitment | SignalCategory::Deadline => Some(SuggestedAction {
                        intent: IntentType::CreateReminder,
                        summary: "Remind the operator before the deadline".to_string(),
                    }),
                    _ => None,
                };
                AnalysisItem {
                    label: signal.label.clone(),
                    category: signal.category,
                    tier: self.item_tier(signal.category),
                    evidence: vec![EvidenceCitation::new(
                        format!("{}:signal", Self::ID),
                        format!("{:?} phrase matched ({})", signal.category, signal.label),
                    )],
                    suggested_action,
                }
            })
            .collect();

        Ok(Analysis {
            observation: observation.clone(),
            items,
        })
    }

    fn generate_proposal(&self, analysis: &Analysis) -> Result<ProposalPack> {
        let input = &analysis.observation.input;
        let intent_type = Self::choose_intent(analysis);
        let recipients = if intent_type.is_outbound_message() {
            input.participant_count.max(1)
        } else {
            0
        };

        let classification = self.classifier.classify(
            intent_type,
            &ClassificationContext {
                recipient_count: recipients,
                organization_wide: input.organization_wide,
            },
        );
        let assessment = self.engine.assess(&RiskContext {
            sends_external_communication: intent_type.is_outbound_message(),
            external_recipient_count: recipients,
            third_party_network_call: false,
            writes_persistent_storage: intent_type == IntentType::CreateReminder,
            reversibility: classification.reversibility,
            affected_entity_count: recipients,
        });

        let mut quorum = self.quorum.resolve(assessment.tier, &analysis.categories());
        quorum.signers = quorum.signers.max(self.required_signers());

        let (summary, permissions, steps) = Self::plan_shape(intent_type, recipients);
        let plan = ToolPlan {
            intent: Intent {
                intent_type,
                summary: summary.clone(),
                target: if recipients > 0 {
                    "thread participants".to_string()
                } else {
                    "operator".to_string()
                },
            },
            risk_score: assessment.score,
            risk_tier: assessment.tier,
            risk_reasons: assessment.reasons.clone(),
            reversibility: classification.reversibility,
            reversibility_reason: classification.reason.clone(),
            approval: quorum.to_approval_requirement(assessment.tier),
            steps,
        };

        let mut citations = input.context.clone();
        citations.extend(analysis.items.iter().flat_map(|i| i.evidence.iter().cloned()));

        Ok(ProposalPack::new(ProposalParts {
            source: input.source,
            plan,
            permissions,
            analysis: RiskConsequenceAnalysis {
                risk_score: assessment.score,
                consequence_tier: assessment.tier,
                reversibility: classification.reversibility,
                blast_radius: classification.blast_radius,
                reasons: assessment.reasons,
            },
            cost: CostEstimate::zero(),
            citations,
            summary,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_types::{ApproverRole, ProposalSource};

    async fn propose(input: SkillInput) -> ProposalPack {
        let skill = FollowUpSkill::new();
        let observation = skill.observe(&input).await.unwrap();
        let analysis = skill.analyze(&observation).unwrap();
        skill.generate_proposal(&analysis).unwrap()
    }

    #[tokio::test]
    async fn test_commitment_with_participant_proposes_send() {
        let input = SkillInput::text(ProposalSource::User, "I'll follow up with the notes tomorrow")
            .with_participants(1);
        let pack = propose(input).await;

        assert_eq!(pack.plan().intent.intent_type, IntentType::SendMessage);
        assert_eq!(pack.plan().risk_score, 55);
        assert_eq!(pack.risk_tier(), RiskTier::Medium);
        assert!(pack.cost().is_local());
        assert!(pack.permissions().has_mutating_scope());
    }

    #[tokio::test]
    async fn test_solo_commitment_proposes_reminder() {
        let pack = propose(SkillInput::text(ProposalSource::VoiceAssistant, "Remind me to call the dentist")).await;

        assert_eq!(pack.plan().intent.intent_type, IntentType::CreateReminder);
        assert_eq!(pack.plan().risk_score, 15);
        assert_eq!(pack.risk_tier(), RiskTier::Low);
        assert_eq!(pack.plan().unrecoverable_steps(), 0);
    }

    #[tokio::test]
    async fn test_financial_signal_escalates_quorum() {
        let input = SkillInput::text(ProposalSource::User, "I'll follow up on the invoice payment")
            .with_participants(3);
        let pack = propose(input).await;

        assert_eq!(pack.risk_tier(), RiskTier::High);
        assert_eq!(pack.plan().approval.approvals_needed, 3);
        assert!(pack.plan().approval.required_roles.contains(&ApproverRole::Finance));
    }

    #[tokio::test]
    async fn test_nothing_detected_is_read_only() {
        let pack = propose(SkillInput::text(ProposalSource::User, "Thanks, looks good")).await;

        assert_eq!(pack.plan().intent.intent_type, IntentType::ReadOnlySummary);
        assert_eq!(pack.plan().risk_score, 0);
        assert!(!pack.permissions().has_mutating_scope());
    }

    #[test]
    fn test_phrases_match_whole_words_only() {
        let labels: Vec<String> = FollowUpSkill::extract_signals("See you Monday. Follow-up: sign the NDA!")
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["nda".to_string()]);
    }

    #[tokio::test]
    async fn test_citations_never_carry_raw_text() {
        let secret = "follow up about the acquisition of Contoso";
        let input = SkillInput::text(ProposalSource::User, secret).with_participants(1);
        let pack = propose(input).await;

        assert!(!pack.citations().is_empty());
        for citation in pack.citations() {
            assert!(!citation.redacted_summary.contains("Contoso"));
        }
    }
}
