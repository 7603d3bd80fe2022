//! MDTState and MainState (§3 Data Model).

use crate::blackboard::Blackboard;
use crate::conversation::Conversation;
use crate::expert::ExpertGroupState;
use crate::journal::Journal;
use crate::patient::PatientRecord;
use crate::types::GroupId;
use std::collections::BTreeMap;

/// The umbrella state threaded through the MDT sub-graph (Triage → Fan-Out →
/// Review → Router loop).
#[derive(Debug, Clone)]
pub struct MDTState {
    pub patient_record: PatientRecord,
    pub dialogue_summary: String,
    pub patient_portrait: String,
    pub expert_pool: BTreeMap<GroupId, ExpertGroupState>,
    pub blackboard: Blackboard,
    pub round_count: u32,
    pub max_rounds: u32,
    pub consensus_reached: bool,
    pub journal: Journal,
}

impl MDTState {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            patient_record: PatientRecord::new(),
            dialogue_summary: String::new(),
            patient_portrait: String::new(),
            expert_pool: BTreeMap::new(),
            blackboard: Blackboard::new(),
            round_count: 0,
            max_rounds,
            consensus_reached: false,
            journal: Journal::new(),
        }
    }

    /// Active experts: those that have not errored (§4.4 Termination update,
    /// §8 P6). Includes satisfied experts — "active" means "still counted",
    /// not "still running".
    pub fn active_experts(&self) -> impl Iterator<Item = &ExpertGroupState> {
        self.expert_pool.values().filter(|e| e.is_active())
    }

    /// Merge a fan-out/review pass's updated slots back into the pool,
    /// replacing wholesale by key (§4.3, §4.7 "union-overwriting-by-key").
    pub fn merge_slots(&mut self, updated: Vec<ExpertGroupState>) {
        for slot in updated {
            self.expert_pool.insert(slot.group_id.clone(), slot);
        }
    }
}

/// Superset of [`MDTState`] adding the outer graph's own fields (§3).
///
/// `messages` is the single bidirectional stream named in §6: on input (user
/// turn mode) it holds the prior patient-clinician dialogue turns; as the
/// graph runs, progress narration is appended to the same stream, never
/// replacing what was already there (§4.7 "outer messages stream").
#[derive(Debug, Clone)]
pub struct MainState {
    pub mdt: MDTState,
    pub messages: Conversation,
    pub start_diagnosis: bool,
    pub final_report: Option<String>,
    pub summary_style: Option<String>,
    pub summary_with_dialogue: Option<String>,
}

impl MainState {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            mdt: MDTState::new(max_rounds),
            messages: Conversation::new(),
            start_diagnosis: false,
            final_report: None,
            summary_style: None,
            summary_with_dialogue: None,
        }
    }
}
