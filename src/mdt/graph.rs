//! Main Graph (§4.7, C8): the single entry point, `PrepareSummary`, and the
//! fan-out/review/router loop.

use crate::conversation::{Conversation, Message, MessageRole};
use crate::error::OrchestratorError;
use crate::expert::ExpertRunner;
use crate::inference::InferenceError;
use crate::mdt::reviewer::{review_pass, VerdictElicitor};
use crate::mdt::router::{mark_round_start, route, RouteDecision};
use crate::mdt::scheduler::fan_out;
use crate::mdt::state::MainState;
use crate::mdt::summarizer::{summarize, SummarizerLlm};
use crate::mdt::triage::triage;
use crate::types::GroupId;
use async_trait::async_trait;

const DIALOGUE_SUMMARY_INSTRUCTION: &str =
    "Summarize the preceding patient-clinician dialogue as a structured case brief, under 500 characters.";

/// One-shot LLM call used by `PrepareSummary` to condense prior dialogue.
#[async_trait]
pub trait DialogueSummarizer: Send + Sync {
    async fn complete(&self, instruction: &str, dialogue: &Conversation) -> Result<String, InferenceError>;
}

/// Bundles every external collaborator the Main Graph needs to run
/// end to end (§6 "Outbound dependencies"). Constructed once per run.
pub struct Engine<'a> {
    pub expert_runner: &'a dyn ExpertRunner,
    pub reviewer: &'a dyn VerdictElicitor,
    pub dialogue_summarizer: &'a dyn DialogueSummarizer,
    pub summarizer_llm: &'a dyn SummarizerLlm,
    pub reviewer_prompt_template: &'a str,
    pub summarizer_system_prompt: &'a str,
    pub group_ids: &'a [GroupId],
    pub max_rounds: u32,
}

impl<'a> Engine<'a> {
    /// The single entry point (§6 "Inbound call surface"): `invoke(MainState) -> MainState`.
    pub async fn invoke(&self, mut state: MainState) -> Result<MainState, OrchestratorError> {
        if !state.start_diagnosis {
            return Ok(state);
        }

        self.prepare_summary(&mut state).await;

        let patient_record = std::mem::take(&mut state.mdt.patient_record);
        let dialogue_summary = state.summary_with_dialogue.clone().unwrap_or_default();
        state.mdt = triage(patient_record, dialogue_summary, self.group_ids, self.max_rounds);

        loop {
            fan_out(&mut state.mdt, self.expert_runner).await;
            review_pass(&mut state.mdt, self.reviewer, self.reviewer_prompt_template).await;

            match route(&state.mdt) {
                RouteDecision::Terminal => break,
                RouteDecision::BackToFanOut => mark_round_start(&mut state.mdt),
            }
        }

        let report = summarize(
            &state.mdt,
            self.summarizer_llm,
            self.summarizer_system_prompt,
            state.summary_style.as_deref(),
        )
        .await?;

        for text in state.mdt.journal.clone().into_texts() {
            state.messages.push(Message::assistant(text));
        }
        state.messages.push(Message::assistant(report.clone()));
        state.final_report = Some(report);

        Ok(state)
    }

    /// `PrepareSummary`: ensure `summary_with_dialogue` is non-empty before
    /// entering the MDT sub-graph (§4.7).
    async fn prepare_summary(&self, state: &mut MainState) {
        if state
            .summary_with_dialogue
            .as_ref()
            .is_some_and(|s| !s.is_empty())
        {
            return;
        }

        match self
            .dialogue_summarizer
            .complete(DIALOGUE_SUMMARY_INSTRUCTION, &state.messages)
            .await
        {
            Ok(summary) => state.summary_with_dialogue = Some(summary),
            Err(_) => {
                state.summary_with_dialogue = Some(fallback_dialogue_summary(&state.messages));
            }
        }
    }
}

/// Deterministic concatenation fallback when dialogue summarization fails
/// (§4.7 "On LLM failure, it falls back to a deterministic concatenation of
/// each user/assistant turn, labelled by role, with non-text content
/// placeholders.").
fn fallback_dialogue_summary(dialogue: &Conversation) -> String {
    dialogue
        .messages()
        .iter()
        .map(|m| {
            let role = match m.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            if m.content.trim().is_empty() {
                format!("{role}: [non-text content]")
            } else {
                format!("{role}: {}", m.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expert::ExpertRunOutput;
    use crate::inference::InferenceError;
    use crate::mdt::summarizer::SummarizerLlm;
    use std::sync::Mutex;

    struct ScriptedRunner {
        verdicts: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl ExpertRunner for ScriptedRunner {
        async fn run(
            &self,
            _group_id: &GroupId,
            slot: &crate::expert::ExpertGroupState,
        ) -> Result<ExpertRunOutput, crate::error::TransientAgentError> {
            Ok(ExpertRunOutput {
                report: format!("report for {} round {}", slot.group_id, slot.round_count + 1),
                new_assistant_message: Message::assistant("draft report"),
                evidences: vec!["finding A".into()],
            })
        }
    }

    #[async_trait]
    impl VerdictElicitor for ScriptedRunner {
        async fn elicit(
            &self,
            _group_id: &GroupId,
            _messages: &Conversation,
        ) -> Result<String, InferenceError> {
            let mut verdicts = self.verdicts.lock().unwrap();
            let next = if verdicts.len() > 1 {
                verdicts.remove(0)
            } else {
                verdicts[0]
            };
            Ok(next.to_string())
        }
    }

    struct EchoDialogueSummarizer;

    #[async_trait]
    impl DialogueSummarizer for EchoDialogueSummarizer {
        async fn complete(&self, _instruction: &str, _dialogue: &Conversation) -> Result<String, InferenceError> {
            Ok("brief case summary".to_string())
        }
    }

    struct EchoSummarizerLlm;

    #[async_trait]
    impl SummarizerLlm for EchoSummarizerLlm {
        async fn complete(&self, _system_prompt: &str, human_prompt: &str) -> Result<String, InferenceError> {
            Ok(format!("Final report.\n{human_prompt}"))
        }
    }

    #[tokio::test]
    async fn two_expert_immediate_consensus_reaches_summary_in_one_round() {
        let runner = ScriptedRunner {
            verdicts: Mutex::new(vec![r#"{"is_satisfied": true, "reinvestigate_reason": ""}"#]),
        };
        let group_ids = vec![GroupId::from("group_1"), GroupId::from("group_2")];
        let engine = Engine {
            expert_runner: &runner,
            reviewer: &runner,
            dialogue_summarizer: &EchoDialogueSummarizer,
            summarizer_llm: &EchoSummarizerLlm,
            reviewer_prompt_template: "round {round_count}",
            summarizer_system_prompt: "be terse",
            group_ids: &group_ids,
            max_rounds: 3,
        };

        let mut state = MainState::new(3);
        state.start_diagnosis = true;

        let result = engine.invoke(state).await.unwrap();

        assert!(result.mdt.consensus_reached);
        assert_eq!(result.mdt.round_count, 2);
        assert!(result.final_report.is_some());
    }

    #[tokio::test]
    async fn non_diagnosis_turn_returns_state_unchanged() {
        let runner = ScriptedRunner {
            verdicts: Mutex::new(vec![]),
        };
        let group_ids = vec![GroupId::from("group_1")];
        let engine = Engine {
            expert_runner: &runner,
            reviewer: &runner,
            dialogue_summarizer: &EchoDialogueSummarizer,
            summarizer_llm: &EchoSummarizerLlm,
            reviewer_prompt_template: "round {round_count}",
            summarizer_system_prompt: "be terse",
            group_ids: &group_ids,
            max_rounds: 3,
        };

        let mut state = MainState::new(3);
        state.messages.push(Message::user("hello"));
        state.start_diagnosis = false;

        let result = engine.invoke(state).await.unwrap();
        assert!(result.final_report.is_none());
        assert_eq!(result.messages.len(), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_still_produces_a_summary() {
        let runner = ScriptedRunner {
            verdicts: Mutex::new(vec![r#"{"is_satisfied": false, "reinvestigate_reason": "keep digging"}"#]),
        };
        let group_ids = vec![GroupId::from("group_1")];
        let engine = Engine {
            expert_runner: &runner,
            reviewer: &runner,
            dialogue_summarizer: &EchoDialogueSummarizer,
            summarizer_llm: &EchoSummarizerLlm,
            reviewer_prompt_template: "round {round_count}",
            summarizer_system_prompt: "be terse",
            group_ids: &group_ids,
            max_rounds: 2,
        };

        let mut state = MainState::new(2);
        state.start_diagnosis = true;

        let result = engine.invoke(state).await.unwrap();
        assert!(!result.mdt.consensus_reached);
        assert_eq!(result.mdt.round_count, 2);
        assert!(result.final_report.is_some());
    }

    /// Scenario 3 (§8): three expert groups, none ever satisfied, the
    /// round budget is exhausted. Every slot must still have been run on
    /// every round (P1 slot monotonicity: round_count only increases),
    /// and the loop must not exceed `max_rounds` iterations (P3).
    #[tokio::test]
    async fn three_experts_never_satisfied_exhausts_budget_without_overrun() {
        let runner = ScriptedRunner {
            verdicts: Mutex::new(vec![r#"{"is_satisfied": false, "reinvestigate_reason": "needs more evidence"}"#]),
        };
        let group_ids = vec![
            GroupId::from("group_1"),
            GroupId::from("group_2"),
            GroupId::from("group_3"),
        ];
        let engine = Engine {
            expert_runner: &runner,
            reviewer: &runner,
            dialogue_summarizer: &EchoDialogueSummarizer,
            summarizer_llm: &EchoSummarizerLlm,
            reviewer_prompt_template: "round {round_count}",
            summarizer_system_prompt: "be terse",
            group_ids: &group_ids,
            max_rounds: 3,
        };

        let mut state = MainState::new(3);
        state.start_diagnosis = true;

        let result = engine.invoke(state).await.unwrap();

        assert!(!result.mdt.consensus_reached);
        assert_eq!(result.mdt.round_count, 3);
        for slot in result.mdt.expert_pool.values() {
            // triage() seeds round_count=1; route() terminates once
            // round_count reaches max_rounds (3), which happens after the
            // second fan_out/review_pass iteration, so each slot has run
            // fan_out exactly twice, not three times.
            assert_eq!(slot.round_count, 2, "every slot must have run every fan-out round");
            assert!(!slot.is_satisfied);
            assert!(!slot.has_error);
        }
        assert!(result.final_report.is_some());
    }

    /// Scenario 4 (§8): one expert group errors on its very first run; the
    /// other proceeds normally and reaches consensus. Consensus must be
    /// computed only over the surviving (non-errored) expert, and the
    /// errored group's evidence must never leak into the citation map.
    struct PartialFailureRunner {
        failing_group: GroupId,
    }

    #[async_trait]
    impl ExpertRunner for PartialFailureRunner {
        async fn run(
            &self,
            group_id: &GroupId,
            slot: &crate::expert::ExpertGroupState,
        ) -> Result<ExpertRunOutput, crate::error::TransientAgentError> {
            if *group_id == self.failing_group {
                return Err(crate::error::TransientAgentError::Timeout(
                    std::time::Duration::from_secs(30),
                ));
            }
            Ok(ExpertRunOutput {
                report: format!("report for {} round {}", slot.group_id, slot.round_count + 1),
                new_assistant_message: Message::assistant("draft report"),
                evidences: vec!["surviving finding".into()],
            })
        }
    }

    #[async_trait]
    impl VerdictElicitor for PartialFailureRunner {
        async fn elicit(
            &self,
            _group_id: &GroupId,
            _messages: &Conversation,
        ) -> Result<String, InferenceError> {
            Ok(r#"{"is_satisfied": true, "reinvestigate_reason": ""}"#.to_string())
        }
    }

    #[tokio::test]
    async fn one_expert_failure_does_not_block_consensus_among_survivors() {
        let failing_group = GroupId::from("group_bad");
        let runner = PartialFailureRunner {
            failing_group: failing_group.clone(),
        };
        let group_ids = vec![failing_group.clone(), GroupId::from("group_good")];
        let engine = Engine {
            expert_runner: &runner,
            reviewer: &runner,
            dialogue_summarizer: &EchoDialogueSummarizer,
            summarizer_llm: &EchoSummarizerLlm,
            reviewer_prompt_template: "round {round_count}",
            summarizer_system_prompt: "be terse",
            group_ids: &group_ids,
            max_rounds: 3,
        };

        let mut state = MainState::new(3);
        state.start_diagnosis = true;

        let result = engine.invoke(state).await.unwrap();

        let bad_slot = &result.mdt.expert_pool[&failing_group];
        assert!(bad_slot.has_error);
        assert!(bad_slot.evidences.is_empty());

        let good_slot = &result.mdt.expert_pool[&GroupId::from("group_good")];
        assert!(good_slot.is_satisfied);
        assert!(!good_slot.evidences.is_empty());

        assert!(result.mdt.consensus_reached);
        let report = result.final_report.unwrap();
        assert!(report.contains("surviving finding") || report.contains("group_good"));
    }

    /// P3 (§8): the fan-out/review loop never runs more than `max_rounds`
    /// iterations, even when every expert stays unsatisfied forever.
    struct CountingNeverSatisfiedRunner {
        fan_out_calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ExpertRunner for CountingNeverSatisfiedRunner {
        async fn run(
            &self,
            _group_id: &GroupId,
            slot: &crate::expert::ExpertGroupState,
        ) -> Result<ExpertRunOutput, crate::error::TransientAgentError> {
            self.fan_out_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(ExpertRunOutput {
                report: format!("report round {}", slot.round_count + 1),
                new_assistant_message: Message::assistant("draft"),
                evidences: vec![],
            })
        }
    }

    #[async_trait]
    impl VerdictElicitor for CountingNeverSatisfiedRunner {
        async fn elicit(
            &self,
            _group_id: &GroupId,
            _messages: &Conversation,
        ) -> Result<String, InferenceError> {
            Ok(r#"{"is_satisfied": false, "reinvestigate_reason": "still unsure"}"#.to_string())
        }
    }

    #[tokio::test]
    async fn loop_never_exceeds_max_rounds_fan_out_invocations() {
        let runner = CountingNeverSatisfiedRunner {
            fan_out_calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let group_ids = vec![GroupId::from("group_1")];
        let max_rounds = 4;
        let engine = Engine {
            expert_runner: &runner,
            reviewer: &runner,
            dialogue_summarizer: &EchoDialogueSummarizer,
            summarizer_llm: &EchoSummarizerLlm,
            reviewer_prompt_template: "round {round_count}",
            summarizer_system_prompt: "be terse",
            group_ids: &group_ids,
            max_rounds,
        };

        let mut state = MainState::new(max_rounds);
        state.start_diagnosis = true;

        let result = engine.invoke(state).await.unwrap();

        // triage() seeds round_count=1; each fan_out/review_pass iteration
        // advances round_count by one, and route() terminates as soon as
        // round_count reaches max_rounds. So fan_out runs max_rounds - 1
        // times (here: 1->2, 2->3, 3->4, then terminate), never more.
        assert_eq!(
            runner
                .fan_out_calls
                .load(std::sync::atomic::Ordering::SeqCst) as u32,
            max_rounds - 1,
            "fan-out must run exactly max_rounds - 1 times, never more"
        );
        assert_eq!(result.mdt.round_count, max_rounds);
    }
}
