//! Tool plans: what a proposal intends to do, step by step

use serde::{Deserialize, Serialize};

use crate::{ApproverRole, ReversibilityClass, RiskTier};

/// Kind of side-effecting action a plan describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    SendMessage,
    ReplyMessage,
    ForwardMessage,
    CreateReminder,
    UpdateReminder,
    DeleteReminder,
    CreateCalendarEvent,
    UpdateCalendarEvent,
    CancelCalendarEvent,
    CreateNote,
    ReadOnlySummary,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::SendMessage => "send_message",
            IntentType::ReplyMessage => "reply_message",
            IntentType::ForwardMessage => "forward_message",
            IntentType::CreateReminder => "create_reminder",
            IntentType::UpdateReminder => "update_reminder",
            IntentType::DeleteReminder => "delete_reminder",
            IntentType::CreateCalendarEvent => "create_calendar_event",
            IntentType::UpdateCalendarEvent => "update_calendar_event",
            IntentType::CancelCalendarEvent => "cancel_calendar_event",
            IntentType::CreateNote => "create_note",
            IntentType::ReadOnlySummary => "read_only_summary",
        }
    }

    /// Whether the intent sends something to another party
    pub fn is_outbound_message(&self) -> bool {
        matches!(
            self,
            IntentType::SendMessage | IntentType::ReplyMessage | IntentType::ForwardMessage
        )
    }

    /// Whether the intent changes any state at all
    pub fn has_side_effect(&self) -> bool {
        !matches!(self, IntentType::ReadOnlySummary)
    }
}

/// What the plan intends to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub intent_type: IntentType,
    pub summary: String,
    pub target: String,
}

/// One ordered step of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub description: String,
    pub mutating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<String>,
}

impl ExecutionStep {
    pub fn read(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            mutating: false,
            rollback: None,
        }
    }

    pub fn mutate(description: impl Into<String>, rollback: Option<String>) -> Self {
        Self {
            description: description.into(),
            mutating: true,
            rollback,
        }
    }
}

/// What approval a plan needs before a token may be issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequirement {
    /// Number of distinct signers
    pub approvals_needed: u8,
    pub biometric_required: bool,
    pub cooldown_secs: u64,
    /// Explicit multi-signer count when more than the operator must sign
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_signer_count: Option<u8>,
    pub preview_required: bool,
    #[serde(default)]
    pub required_roles: Vec<ApproverRole>,
}

impl ApprovalRequirement {
    /// Single operator approval, no cooldown
    pub fn single_operator() -> Self {
        Self {
            approvals_needed: 1,
            biometric_required: false,
            cooldown_secs: 0,
            multi_signer_count: None,
            preview_required: true,
            required_roles: vec![ApproverRole::DeviceOperator],
        }
    }

    /// Effective signer count, taking the explicit multi-signer count into account
    pub fn effective_signers(&self) -> u8 {
        self.multi_signer_count
            .map_or(self.approvals_needed, |m| m.max(self.approvals_needed))
    }
}

/// Step-by-step description of what a proposal intends to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPlan {
    pub intent: Intent,
    pub risk_score: u8,
    pub risk_tier: RiskTier,
    pub risk_reasons: Vec<String>,
    pub reversibility: ReversibilityClass,
    pub reversibility_reason: String,
    pub approval: ApprovalRequirement,
    pub steps: Vec<ExecutionStep>,
}

impl ToolPlan {
    pub fn mutating_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.mutating).count()
    }

    /// Mutating steps that have no rollback description
    pub fn unrecoverable_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.mutating && s.rollback.is_none())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_signers_prefers_larger() {
        let mut req = ApprovalRequirement::single_operator();
        assert_eq!(req.effective_signers(), 1);

        req.multi_signer_count = Some(3);
        assert_eq!(req.effective_signers(), 3);

        req.approvals_needed = 4;
        assert_eq!(req.effective_signers(), 4);
    }

    #[test]
    fn test_step_counts() {
        let plan = ToolPlan {
            intent: Intent {
                intent_type: IntentType::SendMessage,
                summary: "Reply to thread".to_string(),
                target: "one external contact".to_string(),
            },
            risk_score: 55,
            risk_tier: RiskTier::Medium,
            risk_reasons: vec![],
            reversibility: ReversibilityClass::Irreversible,
            reversibility_reason: "sent messages cannot be recalled".to_string(),
            approval: ApprovalRequirement::single_operator(),
            steps: vec![
                ExecutionStep::read("Load thread"),
                ExecutionStep::mutate("Send reply", None),
                ExecutionStep::mutate("Label thread", Some("Remove label".to_string())),
            ],
        };

        assert_eq!(plan.mutating_steps(), 2);
        assert_eq!(plan.unrecoverable_steps(), 1);
    }
}
