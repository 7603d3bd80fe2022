//! Triage Node (§4.1, C3): seeds expert_pool and the patient portrait.

use crate::conversation::Message;
use crate::expert::ExpertGroupState;
use crate::mdt::state::MDTState;
use crate::patient::PatientRecord;
use crate::types::GroupId;

/// Build a fresh [`MDTState`] for the given group ids, rendering the patient
/// portrait and seeding every expert's first message (§4.1).
pub fn triage(
    patient_record: PatientRecord,
    dialogue_summary: String,
    group_ids: &[GroupId],
    max_rounds: u32,
) -> MDTState {
    let mut state = MDTState::new(max_rounds);
    state.patient_portrait = patient_record.render_portrait();
    state.patient_record = patient_record;
    state.dialogue_summary = dialogue_summary;
    state.round_count = 1;
    state.consensus_reached = false;

    let seed = seed_message(&state.patient_portrait, &state.dialogue_summary);
    for group_id in group_ids {
        let mut slot = ExpertGroupState::new(group_id.clone());
        slot.messages.push(Message::assistant(seed.clone()));
        state.expert_pool.insert(group_id.clone(), slot);
    }
    state
}

/// Compose the round-1 seed message: portrait, plus a labeled dialogue
/// summary block iff non-empty (§4.1 "Seeding").
fn seed_message(portrait: &str, dialogue_summary: &str) -> String {
    if dialogue_summary.trim().is_empty() {
        portrait.to_string()
    } else {
        format!("{portrait}\n## Dialogue Summary\n{dialogue_summary}\n")
    }
}
