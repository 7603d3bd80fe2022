//! Shared publication and conflict registry (§3 Blackboard, C1).
//!
//! Mutated exclusively by the Reviewer; the Triage node starts it empty and
//! the Summarizer only reads it (§5 shared-resource policy).

use crate::types::GroupId;
use std::collections::BTreeMap;

/// Process-local, monotonically-growing publication board.
#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    /// `group_id -> report_text`, write-once per group until explicitly
    /// refreshed by the Reviewer (§9 open question: first-occurrence-only
    /// publish is preserved as specified).
    pub published_reports: BTreeMap<GroupId, String>,
    /// `group_id -> reinvestigation reason`, reset at the start of every
    /// review pass.
    pub conflicts: BTreeMap<GroupId, String>,
    /// Reserved for forward compatibility; never populated by this core.
    pub common_understandings: BTreeMap<String, String>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a report for `group_id` only if it has not already been
    /// published (§4.4 step 1, §9 open question).
    pub fn publish_if_absent(&mut self, group_id: &GroupId, report: &str) {
        self.published_reports
            .entry(group_id.clone())
            .or_insert_with(|| report.to_string());
    }

    /// Clear the conflict set; called at the start of every review pass
    /// (§4.4 step 4).
    pub fn reset_conflicts(&mut self) {
        self.conflicts.clear();
    }

    pub fn record_conflict(&mut self, group_id: GroupId, reason: String) {
        self.conflicts.insert(group_id, reason);
    }
}
