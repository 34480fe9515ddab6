//! Keystone Skills - Pluggable proposal producers
//!
//! A skill turns raw input into a [`ProposalPack`] in three stages:
//!
//! ```text
//! SkillInput → observe → Observation → analyze → Analysis → generate_proposal → ProposalPack
//! ```
//!
//! The [`SkillRegistry`] admits only skills that guarantee a proposal, runs
//! the stages under a latency budget, and keeps a bounded history. Nothing in
//! this crate can approve or execute; authorization lives in
//! `keystone-kernel`, which this crate does not depend on.
//!
//! [`ProposalPack`]: keystone_types::ProposalPack

pub mod follow_up;
pub mod registry;
pub mod skill;

pub use follow_up::FollowUpSkill;
pub use registry::{HistoryEntry, RegistryConfig, SkillRegistry, DEFAULT_HISTORY_CAPACITY};
pub use skill::{
    Analysis, AnalysisItem, Observation, Result, Signal, Skill, SkillError, SkillInput,
    SuggestedAction, TaskCategory,
};
