//! Progress observability stream (§5 "Progress observability", §6 "Progress output").
//!
//! A minimal, append-only log of human-readable progress lines, generalized
//! from the teacher's `Observation` record (`reasoning::loop_types`) down to
//! exactly what the orchestration core needs to report: one line per
//! meaningful state transition, always also emitted via `tracing`.

use serde::{Deserialize, Serialize};

/// One progress line, e.g. `"round 2 review done (satisfied 1/2)"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub text: String,
}

/// Ordered, append-only record of everything reported during a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Journal {
    messages: Vec<ProgressMessage>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one progress line and mirror it into the tracing span.
    pub fn record(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(target: "mdt_deliberation::progress", "{text}");
        self.messages.push(ProgressMessage { text });
    }

    pub fn messages(&self) -> &[ProgressMessage] {
        &self.messages
    }

    pub fn into_texts(self) -> Vec<String> {
        self.messages.into_iter().map(|m| m.text).collect()
    }
}
