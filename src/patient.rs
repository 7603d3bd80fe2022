//! Patient record data model: collision-retry identifiers, append-or-upsert
//! semantics, and the deterministic portrait renderer (§3, §4.1).
//!
//! The 4-character identifier alphabet and retry-bounded generation are
//! grounded in the original system's `generate_short_uuid` (a 32-symbol
//! alphabet excluding `0`, `1`, `I`, `O`, up to 1000 retries); this module
//! reimplements the same contract with `rand` instead of `shortuuid`.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

const ID_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const ID_LENGTH: usize = 4;
const MAX_ID_RETRIES: usize = 1000;

#[derive(Error, Debug, Clone)]
pub enum PatientRecordError {
    #[error("could not generate a unique {ID_LENGTH}-character id after {MAX_ID_RETRIES} attempts")]
    IdExhaustion,
}

/// A scalar field value inside a patient-record entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{s}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One element of an ordered sequence (symptoms, vitals, exams, ...).
///
/// `fields` preserves insertion order deliberately — a `HashMap` would
/// reorder them on every portrait render, breaking determinism (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub fields: Vec<(String, Scalar)>,
}

fn generate_id(existing: &HashSet<&str>) -> Result<String, PatientRecordError> {
    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ID_RETRIES {
        let candidate: String = (0..ID_LENGTH)
            .map(|_| *ID_ALPHABET.choose(&mut rng).expect("alphabet is non-empty") as char)
            .collect();
        if !existing.contains(candidate.as_str()) {
            return Ok(candidate);
        }
    }
    Err(PatientRecordError::IdExhaustion)
}

/// One of the seven ordered sequences making up a [`PatientRecord`], plus
/// any caller-supplied additional named sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientRecord {
    pub base_info: Vec<(String, Scalar)>,
    pub symptoms: Vec<SequenceEntry>,
    pub vitals: Vec<SequenceEntry>,
    pub exams: Vec<SequenceEntry>,
    pub medications: Vec<SequenceEntry>,
    pub family_history: Vec<SequenceEntry>,
    pub past_medical_history: Vec<SequenceEntry>,
    pub others: Vec<SequenceEntry>,
    /// Sections beyond the fixed seven, in first-seen insertion order.
    pub additional_sections: Vec<(String, Vec<SequenceEntry>)>,
}

/// One of the seven fixed sequence sections, used to address `upsert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Symptoms,
    Vitals,
    Exams,
    Medications,
    FamilyHistory,
    PastMedicalHistory,
    Others,
}

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    fn sequence_mut(&mut self, section: Section) -> &mut Vec<SequenceEntry> {
        match section {
            Section::Symptoms => &mut self.symptoms,
            Section::Vitals => &mut self.vitals,
            Section::Exams => &mut self.exams,
            Section::Medications => &mut self.medications,
            Section::FamilyHistory => &mut self.family_history,
            Section::PastMedicalHistory => &mut self.past_medical_history,
            Section::Others => &mut self.others,
        }
    }

    /// Append-or-upsert one entry into a fixed section (§3 PatientRecord).
    ///
    /// If `id` names an existing entry, its fields merge field-by-field
    /// (later values win). Otherwise a fresh id is generated and a new
    /// entry appended.
    pub fn upsert(
        &mut self,
        section: Section,
        id: Option<&str>,
        fields: Vec<(String, Scalar)>,
    ) -> Result<String, PatientRecordError> {
        let seq = self.sequence_mut(section);
        if let Some(id) = id {
            if let Some(entry) = seq.iter_mut().find(|e| e.id == id) {
                merge_fields(&mut entry.fields, fields);
                return Ok(entry.id.clone());
            }
        }
        let existing: HashSet<&str> = seq.iter().map(|e| e.id.as_str()).collect();
        let new_id = generate_id(&existing)?;
        seq.push(SequenceEntry {
            id: new_id.clone(),
            created_at: Utc::now(),
            fields,
        });
        Ok(new_id)
    }

    /// Render the canonical portrait text (§4.1 rendering rule).
    pub fn render_portrait(&self) -> String {
        let mut out = String::new();
        render_mapping_section(&mut out, "Base Info", &self.base_info);
        render_sequence_section(&mut out, "Symptoms", &self.symptoms);
        render_sequence_section(&mut out, "Vitals", &self.vitals);
        render_sequence_section(&mut out, "Exams", &self.exams);
        render_sequence_section(&mut out, "Medications", &self.medications);
        render_sequence_section(&mut out, "Family History", &self.family_history);
        render_sequence_section(&mut out, "Past Medical History", &self.past_medical_history);
        render_sequence_section(&mut out, "Others", &self.others);
        for (name, entries) in &self.additional_sections {
            render_sequence_section(&mut out, name, entries);
        }
        out
    }
}

fn merge_fields(existing: &mut Vec<(String, Scalar)>, updates: Vec<(String, Scalar)>) {
    for (key, value) in updates {
        if let Some(slot) = existing.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            existing.push((key, value));
        }
    }
}

fn render_mapping_section(out: &mut String, header: &str, fields: &[(String, Scalar)]) {
    if fields.is_empty() {
        return;
    }
    out.push_str(&format!("## {header}\n"));
    for (key, value) in fields {
        out.push_str(&format!("- {key}: {value}\n"));
    }
    out.push('\n');
}

fn render_sequence_section(out: &mut String, header: &str, entries: &[SequenceEntry]) {
    if entries.is_empty() {
        return;
    }
    out.push_str(&format!("## {header}\n"));
    for entry in entries {
        let kv = entry
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("- [ID: {}] {}\n", entry.id, kv));
    }
    out.push('\n');
}
