//! Summarizer (§4.6, C7): stable citation namespace, prompt assembly, reference resolution.
//!
//! The citation-namespace construction is the load-bearing algorithm here
//! (§9 "Citation namespace"): keys are `group_id.index`, never flat global
//! numbers, so that concatenating reports in a different order than experts
//! were enumerated can never misattribute evidence.

use crate::error::{NoReportsError, OrchestratorError};
use crate::inference::InferenceError;
use crate::mdt::state::MDTState;
use crate::types::GroupId;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;

/// One-shot LLM call for the summarizer. Kept as its own narrow trait, same
/// reasoning as [`crate::mdt::reviewer::VerdictElicitor`].
#[async_trait]
pub trait SummarizerLlm: Send + Sync {
    async fn complete(&self, system_prompt: &str, human_prompt: &str) -> Result<String, InferenceError>;
}

const DEFAULT_FORMAT_DIRECTIVE: &str = "Produce a structured clinical report with sections for \
Assessment, Differential Diagnosis, and Recommended Next Steps.";

/// Build the `citation_key -> evidence_text` namespace (§4.6 "Evidence namespace
/// construction"), enumerating published reports by ascending `group_id` and
/// each group's current evidences in order, 1-based.
pub fn build_evidence_namespace(state: &MDTState) -> (Vec<(String, String)>, HashMap<String, String>) {
    let mut ordered = Vec::new();
    let mut lookup = HashMap::new();
    for group_id in state.blackboard.published_reports.keys() {
        let Some(slot) = state.expert_pool.get(group_id) else {
            continue;
        };
        for (i, evidence) in slot.evidences.iter().enumerate() {
            let key = format!("{group_id}.{}", i + 1);
            ordered.push((key.clone(), evidence.clone()));
            lookup.insert(key, evidence.clone());
        }
    }
    (ordered, lookup)
}

fn legacy_ref_regex() -> Regex {
    Regex::new(r"<ref>(\d+)</ref>").expect("valid regex")
}

fn citation_ref_regex() -> Regex {
    Regex::new(r"<ref>([A-Za-z0-9_]+\.\d+)</ref>").expect("valid regex")
}

/// Rewrite an individual report's legacy numeric `<ref>N</ref>` tags into the
/// stable `<ref>group_id.N</ref>` form (§4.6 "Per-expert reference pre-processing").
pub fn rewrite_legacy_refs(report: &str, group_id: &GroupId) -> String {
    legacy_ref_regex()
        .replace_all(report, |caps: &regex::Captures| format!("<ref>{group_id}.{}</ref>", &caps[1]))
        .into_owned()
}

/// Concatenate every published report, each preceded by a `group_id`-bearing
/// separator, with legacy refs rewritten to the unified namespace.
fn render_report_block(state: &MDTState) -> String {
    let mut block = String::new();
    for (group_id, report) in &state.blackboard.published_reports {
        let rewritten = rewrite_legacy_refs(report, group_id);
        block.push_str(&format!("=========== {group_id} ===========\n{rewritten}\n\n"));
    }
    block
}

fn render_evidence_guide(namespace: &[(String, String)]) -> String {
    if namespace.is_empty() {
        return String::new();
    }
    let mut guide = String::from("Legal citation keys (use exactly as <ref>key</ref>):\n");
    for (key, text) in namespace {
        guide.push_str(&format!("- {key}: {text}\n"));
    }
    guide
}

/// Assemble the human-role prompt (§4.6 "Prompt assembly").
fn assemble_human_prompt(
    state: &MDTState,
    namespace: &[(String, String)],
    summary_style: Option<&str>,
) -> String {
    let mut prompt = String::new();
    if !state.patient_portrait.is_empty() {
        prompt.push_str(&state.patient_portrait);
        prompt.push_str("\n\n");
    }
    prompt.push_str(&render_report_block(state));
    prompt.push_str(&render_evidence_guide(namespace));
    prompt.push('\n');
    prompt.push_str(summary_style.unwrap_or(DEFAULT_FORMAT_DIRECTIVE));
    prompt
}

/// Scan generated text for `<ref>group_id.index</ref>` tokens and append a
/// trailing `#### Cited Evidence` section (§4.6 "Reference resolution").
/// Idempotent: the appended section uses `[key]` syntax, not `<ref>`, so a
/// second pass finds nothing new to resolve.
pub fn resolve_references(generated: &str, namespace: &HashMap<String, String>) -> String {
    let mut seen = Vec::new();
    let mut seen_set = std::collections::HashSet::new();
    for caps in citation_ref_regex().captures_iter(generated) {
        let key = caps[1].to_string();
        if !namespace.contains_key(&key) {
            tracing::warn!(citation_key = %key, "summarizer referenced an unknown citation key");
            continue;
        }
        if seen_set.insert(key.clone()) {
            seen.push(key);
        }
    }

    if seen.is_empty() {
        return generated.to_string();
    }

    let mut out = generated.to_string();
    out.push_str("\n\n#### Cited Evidence\n");
    for key in seen {
        out.push_str(&format!("[{key}] {}\n", namespace[&key]));
    }
    out
}

/// Run the Summarizer end to end (§4.6 Contract).
///
/// If the LLM call itself fails, falls back to a deterministic concatenation
/// of the published reports rather than failing the whole run — grounded in
/// the original `summary_node`'s degraded-mode fallback (distinct from, and
/// in addition to, the `NoReportsError` fast-fail when there is nothing at
/// all to summarize).
pub async fn summarize(
    state: &MDTState,
    llm: &dyn SummarizerLlm,
    system_prompt: &str,
    summary_style: Option<&str>,
) -> Result<String, OrchestratorError> {
    if state.blackboard.published_reports.is_empty() {
        return Err(OrchestratorError::NoReports(NoReportsError));
    }

    let (namespace, lookup) = build_evidence_namespace(state);
    let human_prompt = assemble_human_prompt(state, &namespace, summary_style);

    match llm.complete(system_prompt, &human_prompt).await {
        Ok(generated) => Ok(resolve_references(&generated, &lookup)),
        Err(err) => {
            tracing::warn!(error = %err, "summarizer LLM call failed, falling back to report concatenation");
            Ok(format!(
                "# Combined Diagnostic Report (degraded mode)\n\n\
                 Note: the AI summarization step failed; the following is a direct \
                 concatenation of each expert group's report.\n\n{}",
                render_report_block(state)
            ))
        }
    }
}
