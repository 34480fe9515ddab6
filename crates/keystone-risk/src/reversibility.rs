//! Reversibility and blast-radius policy table
//!
//! Proposal generation and the consequence analysis both classify through
//! this table, so an intent is never reversible in one place and
//! irreversible in another.

use keystone_types::{BlastRadius, IntentType, ReversibilityClass};
use serde::{Deserialize, Serialize};

/// Facts that widen or narrow the table's default blast radius
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationContext {
    /// Parties other than the operator who receive or see the effect
    pub recipient_count: u32,
    /// Addressed to a whole organization (distribution list, all-hands)
    pub organization_wide: bool,
}

impl ClassificationContext {
    pub fn recipients(recipient_count: u32) -> Self {
        Self {
            recipient_count,
            organization_wide: false,
        }
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub reversibility: ReversibilityClass,
    pub blast_radius: BlastRadius,
    pub reason: String,
}

/// Static intent → (reversibility, blast radius) policy
#[derive(Debug, Clone, Copy, Default)]
pub struct ReversibilityClassifier;

impl ReversibilityClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, intent: IntentType, ctx: &ClassificationContext) -> Classification {
        let (reversibility, reason) = Self::reversibility_of(intent);
        Classification {
            reversibility,
            blast_radius: Self::blast_radius_of(intent, ctx),
            reason: reason.to_string(),
        }
    }

    fn reversibility_of(intent: IntentType) -> (ReversibilityClass, &'static str) {
        use IntentType::*;
        use ReversibilityClass::*;

        match intent {
            SendMessage | ReplyMessage => (Irreversible, "delivered messages cannot be recalled"),
            ForwardMessage => (Irreversible, "forwarded content cannot be recalled"),
            CreateReminder | UpdateReminder => (Reversible, "reminders can be edited or deleted"),
            DeleteReminder => (PartiallyReversible, "deleted reminders must be recreated by hand"),
            CreateCalendarEvent => (Reversible, "created events can be deleted"),
            UpdateCalendarEvent => (PartiallyReversible, "attendees may already have seen the change"),
            CancelCalendarEvent => (PartiallyReversible, "cancellation notices are sent to attendees"),
            CreateNote => (Reversible, "notes can be deleted"),
            ReadOnlySummary => (Reversible, "read-only, nothing to undo"),
        }
    }

    fn blast_radius_of(intent: IntentType, ctx: &ClassificationContext) -> BlastRadius {
        use IntentType::*;

        let fans_out = matches!(
            intent,
            SendMessage | ReplyMessage | ForwardMessage | CreateCalendarEvent
                | UpdateCalendarEvent | CancelCalendarEvent
        );
        if !fans_out {
            return BlastRadius::SelfOnly;
        }

        if ctx.organization_wide {
            BlastRadius::Organizational
        } else {
            match ctx.recipient_count {
                0 if intent.is_outbound_message() => BlastRadius::SingleRecipient,
                0 => BlastRadius::SelfOnly,
                1 => BlastRadius::SingleRecipient,
                _ => BlastRadius::MultiRecipient,
            }
        }
    }
}
