//! Expert group state and the black-box Expert Runner contract (§3, §4.2, C2).
//!
//! The inner "deep research" agent loop that actually produces a report is
//! explicitly out of scope (§1): the core only sees it through the
//! [`ExpertRunner`] trait, one opaque async call per group per round.

use crate::conversation::{Conversation, Message};
use crate::error::TransientAgentError;
use crate::types::GroupId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One expert group's private, round-surviving state (§3 ExpertGroupState).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertGroupState {
    pub group_id: GroupId,
    #[serde(skip)]
    pub messages: Conversation,
    pub report: String,
    pub evidences: Vec<String>,
    pub is_satisfied: bool,
    pub reinvestigate_reason: Option<String>,
    pub has_error: bool,
    pub round_count: u32,
}

impl ExpertGroupState {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            messages: Conversation::new(),
            report: "waiting".to_string(),
            evidences: Vec::new(),
            is_satisfied: false,
            reinvestigate_reason: None,
            has_error: false,
            round_count: 0,
        }
    }

    /// True if this slot should be excluded from further fan-out/review
    /// activity (§4.3 terminal predicate).
    pub fn is_terminal(&self) -> bool {
        self.has_error || self.is_satisfied
    }

    /// True if this slot counts toward the active set for consensus
    /// purposes (§4.4 termination update, §8 P6).
    pub fn is_active(&self) -> bool {
        !self.has_error
    }
}

/// The result of one successful Expert Runner invocation (§4.2 contract).
#[derive(Debug, Clone)]
pub struct ExpertRunOutput {
    pub report: String,
    pub new_assistant_message: Message,
    pub evidences: Vec<String>,
}

/// Black-box executor for one expert group. Implementations wrap whatever
/// inner agent loop (tool-calling LLM, sub-researcher delegation, ...)
/// actually produces a report; the orchestration core never inspects it.
#[async_trait]
pub trait ExpertRunner: Send + Sync {
    async fn run(
        &self,
        group_id: &GroupId,
        slot: &ExpertGroupState,
    ) -> Result<ExpertRunOutput, TransientAgentError>;
}

/// Apply one Expert Runner invocation to a slot, honoring the skip rules
/// and error-isolation contract of §4.2.
///
/// Returns the updated slot. This function never panics and never returns
/// `Err` — runner failures are folded into `has_error` per the
/// error-taxonomy propagation policy (§7).
pub async fn invoke_runner(
    runner: &dyn ExpertRunner,
    mut slot: ExpertGroupState,
) -> ExpertGroupState {
    if slot.is_terminal() {
        return slot;
    }

    match runner.run(&slot.group_id, &slot).await {
        Ok(output) => {
            slot.report = output.report;
            slot.messages.push(output.new_assistant_message);
            slot.evidences = output.evidences;
            slot.round_count += 1;
            slot.has_error = false;
        }
        Err(err) => {
            slot.has_error = true;
            slot.report = format!("execution error: {err}");
            slot.round_count += 1;
        }
    }
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysSucceeds {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExpertRunner for AlwaysSucceeds {
        async fn run(
            &self,
            _group_id: &GroupId,
            slot: &ExpertGroupState,
        ) -> Result<ExpertRunOutput, TransientAgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExpertRunOutput {
                report: format!("report round {}", slot.round_count + 1),
                new_assistant_message: Message::assistant("ok"),
                evidences: vec!["finding A".into()],
            })
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl ExpertRunner for AlwaysFails {
        async fn run(
            &self,
            _group_id: &GroupId,
            _slot: &ExpertGroupState,
        ) -> Result<ExpertRunOutput, TransientAgentError> {
            Err(TransientAgentError::Timeout(std::time::Duration::from_secs(30)))
        }
    }

    #[tokio::test]
    async fn satisfied_slot_is_skipped_with_no_changes() {
        let runner = AlwaysSucceeds {
            calls: AtomicUsize::new(0),
        };
        let mut slot = ExpertGroupState::new(GroupId::from("group_1"));
        slot.is_satisfied = true;
        let before_round_count = slot.round_count;
        let after = invoke_runner(&runner, slot).await;
        assert_eq!(after.round_count, before_round_count);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn errored_slot_is_skipped() {
        let runner = AlwaysSucceeds {
            calls: AtomicUsize::new(0),
        };
        let mut slot = ExpertGroupState::new(GroupId::from("group_1"));
        slot.has_error = true;
        let after = invoke_runner(&runner, slot).await;
        assert!(after.has_error);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_run_appends_exactly_one_assistant_message() {
        let runner = AlwaysSucceeds {
            calls: AtomicUsize::new(0),
        };
        let mut slot = ExpertGroupState::new(GroupId::from("group_1"));
        slot.messages.push(Message::assistant("seed"));
        let before_len = slot.messages.len();
        let after = invoke_runner(&runner, slot).await;
        assert_eq!(after.messages.len(), before_len + 1);
        assert_eq!(after.round_count, 1);
        assert_eq!(after.evidences, vec!["finding A".to_string()]);
    }

    #[tokio::test]
    async fn failure_marks_has_error_and_leaves_history_untouched() {
        let runner = AlwaysFails;
        let mut slot = ExpertGroupState::new(GroupId::from("group_2"));
        slot.messages.push(Message::assistant("seed"));
        let before_len = slot.messages.len();
        let after = invoke_runner(&runner, slot).await;
        assert!(after.has_error);
        assert!(after.report.starts_with("execution error:"));
        assert_eq!(after.messages.len(), before_len);
        assert_eq!(after.round_count, 1);
    }
}
