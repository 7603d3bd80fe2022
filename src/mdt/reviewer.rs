//! Reviewer (§4.4, C5): cross-review pass, verdict elicitation, lenient JSON parsing.
//!
//! Grounded in the original `export_reviewer_node.py` (`build_reviewer_messages`,
//! `process_single_expert_review`, `expert_reviewer_node`) and in the teacher's
//! `Critic` trait (`human_critic.rs`) for the LLM-elicitation abstraction.

use crate::conversation::{Conversation, Message};
use crate::error::VerdictParseError;
use crate::inference::InferenceError;
use crate::mdt::state::MDTState;
use crate::types::GroupId;
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use regex::Regex;
use serde::Deserialize;

/// Elicits one verdict call per expert. Implementations wrap an
/// [`crate::inference::InferenceProvider`] bound to that group's configured
/// model; kept as its own trait so the reviewer doesn't need to know about
/// per-group model configuration.
#[async_trait]
pub trait VerdictElicitor: Send + Sync {
    async fn elicit(&self, group_id: &GroupId, messages: &Conversation) -> Result<String, InferenceError>;
}

#[derive(Debug, Clone, Deserialize)]
struct Verdict {
    is_satisfied: bool,
    #[serde(default)]
    reinvestigate_reason: String,
}

/// Lenient 3-tier JSON extraction (§4.4 step 3, §9 "JSON mode under LLM uncertainty"):
/// direct parse, then fenced-code-block extraction, then greedy first-`{`-to-last-`}`.
fn parse_verdict(group_id: &GroupId, text: &str) -> Result<(bool, String), VerdictParseError> {
    if let Ok(v) = serde_json::from_str::<Verdict>(text) {
        return Ok((v.is_satisfied, v.reinvestigate_reason));
    }

    let fenced = Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").expect("valid regex");
    if let Some(caps) = fenced.captures(text) {
        if let Ok(v) = serde_json::from_str::<Verdict>(&caps[1]) {
            return Ok((v.is_satisfied, v.reinvestigate_reason));
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(v) = serde_json::from_str::<Verdict>(&text[start..=end]) {
                return Ok((v.is_satisfied, v.reinvestigate_reason));
            }
        }
    }

    Err(VerdictParseError {
        group_id: group_id.clone(),
        reason: "no valid {is_satisfied, reinvestigate_reason} object found".to_string(),
    })
}

fn review_instruction(template: &str, round_count: u32) -> String {
    template.replace("{round_count}", &round_count.to_string())
}

fn reinvestigation_message(reason: &str) -> String {
    format!(
        "You have reviewed the other experts' reports and raised the following concern:\n\n\
         {reason}\n\n\
         Please re-examine the patient's symptoms, signs, and test results with your team and \
         update your diagnostic report.\n\n\
         Important: the final output must still follow the original report format."
    )
}

fn other_reports_block(state: &MDTState, group_id: &GroupId) -> String {
    let mut block = String::new();
    for (other_id, other) in &state.expert_pool {
        if other_id != group_id {
            block.push_str(&format!(
                "==========={other_id}================\n{}\n",
                other.report
            ));
        }
    }
    block
}

/// Run one full review pass over every non-terminal expert (§4.4).
pub async fn review_pass(
    state: &mut MDTState,
    elicitor: &dyn VerdictElicitor,
    reviewer_prompt_template: &str,
) {
    state.blackboard.reset_conflicts();

    let reviewable: Vec<GroupId> = state
        .expert_pool
        .iter()
        .filter(|(_, e)| !e.has_error && !e.is_satisfied)
        .map(|(id, _)| id.clone())
        .collect();

    // Publish (happens-before barrier, §5): every slot's pre-review report
    // reaches the blackboard before any verdict call begins.
    for group_id in &reviewable {
        let report = state.expert_pool[group_id].report.clone();
        state.blackboard.publish_if_absent(group_id, &report);
    }

    let instruction = review_instruction(reviewer_prompt_template, state.round_count);

    let mut prompts = Vec::new();
    for group_id in &reviewable {
        let other_reports = other_reports_block(state, group_id);
        let slot = state.expert_pool.get_mut(group_id).expect("reviewable key exists");
        slot.messages.insert(1, Message::user(format!("Patient case information:\n\n{}", state.patient_portrait)));
        slot.messages.push(Message::user(format!(
            "You have completed your assessment. Here are the other experts' reports ({} total):\n\n{other_reports}",
            state.expert_pool.len().saturating_sub(1)
        )));
        slot.messages.push(Message::user(instruction.clone()));
        prompts.push((group_id.clone(), slot.messages.clone()));
    }

    let mut calls = FuturesUnordered::new();
    for (group_id, messages) in prompts {
        calls.push(async move {
            let result = elicitor.elicit(&group_id, &messages).await;
            (group_id, result)
        });
    }

    while let Some((group_id, result)) = calls.next().await {
        let slot = state.expert_pool.get_mut(&group_id).expect("reviewed key exists");
        match result {
            Ok(text) => match parse_verdict(&group_id, &text) {
                Ok((is_satisfied, reason)) => {
                    slot.is_satisfied = is_satisfied;
                    slot.messages.push(Message::assistant(text));
                    if is_satisfied {
                        slot.reinvestigate_reason = None;
                    } else {
                        slot.reinvestigate_reason = Some(reason.clone());
                        state.blackboard.record_conflict(group_id.clone(), reason.clone());
                        slot.messages.push(Message::user(reinvestigation_message(&reason)));
                    }
                }
                Err(_) => {
                    slot.has_error = true;
                }
            },
            Err(_) => {
                slot.has_error = true;
            }
        }
    }

    state.round_count += 1;

    let active: Vec<_> = state.active_experts().collect();
    let satisfied_count = active.iter().filter(|e| e.is_satisfied).count();
    let total_count = active.len();
    let consensus_reached = active.is_empty() || active.iter().all(|e| e.is_satisfied);
    state.consensus_reached = consensus_reached;

    let mut message = format!(
        "round {} review done (satisfied {satisfied_count}/{total_count})",
        state.round_count - 1
    );
    if consensus_reached {
        message.push_str(" - consensus reached");
    } else if state.round_count >= state.max_rounds {
        message.push_str(" - max rounds reached");
    }
    state.journal.record(message);
}
