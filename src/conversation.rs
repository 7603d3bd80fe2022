//! Per-expert private message history.
//!
//! Generalizes the teacher's `reasoning::conversation` module: same message
//! roles and token-budget bookkeeping, narrowed to what an expert group's
//! private queue (`ExpertGroupState::messages`) actually needs — there is no
//! tool-call schema here because the core treats tool invocation as the
//! expert's opaque inner loop (§1 out-of-scope).

use serde::{Deserialize, Serialize};

/// Role of one message in an expert's private history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One entry in an expert's message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Rough token estimate (chars / 4), same heuristic the teacher uses for
    /// context-budget bookkeeping absent a real tokenizer dependency.
    pub fn estimate_tokens(&self) -> usize {
        self.content.len() / 4 + 1
    }
}

/// An expert's ordered, append-only private message history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Insert a message at a fixed position, used by the reviewer to place
    /// the patient portrait at position 1 (§4.4 step 2).
    pub fn insert(&mut self, index: usize, message: Message) {
        let index = index.min(self.messages.len());
        self.messages.insert(index, message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
    }

    pub fn estimate_tokens(&self) -> usize {
        self.messages.iter().map(Message::estimate_tokens).sum()
    }
}
