//! Minimal default collaborator implementations wired atop [`InferenceProvider`].
//!
//! The intra-expert "deep research" loop and the reviewer/summarizer LLM
//! calls are all out-of-scope black boxes per the core's contract — these
//! are the simplest possible implementations that actually place one LLM
//! call per invocation, useful for the CLI entry point and for integration
//! tests that want a real (if unsophisticated) wiring instead of a mock.

use crate::conversation::{Conversation, Message};
use crate::error::TransientAgentError;
use crate::expert::{ExpertGroupState, ExpertRunOutput, ExpertRunner};
use crate::inference::{InferenceOptions, InferenceProvider, ResponseFormat};
use crate::mdt::graph::DialogueSummarizer;
use crate::mdt::reviewer::VerdictElicitor;
use crate::mdt::summarizer::SummarizerLlm;
use crate::types::GroupId;
use async_trait::async_trait;

/// One LLM call per round, no tool use. `evidences` is left unchanged from
/// the slot's previous value unless the model emits an `Evidence:` prefixed
/// line, which is treated as one new evidence entry.
pub struct SimpleExpertRunner<'a> {
    pub provider: &'a dyn InferenceProvider,
    pub model: String,
}

#[async_trait]
impl<'a> ExpertRunner for SimpleExpertRunner<'a> {
    async fn run(
        &self,
        _group_id: &GroupId,
        slot: &ExpertGroupState,
    ) -> Result<ExpertRunOutput, TransientAgentError> {
        let options = InferenceOptions {
            model: self.model.clone(),
            ..Default::default()
        };
        let response = self
            .provider
            .complete(slot.messages.messages(), &options)
            .await?;

        let mut evidences = slot.evidences.clone();
        for line in response.content.lines() {
            if let Some(rest) = line.strip_prefix("Evidence:") {
                evidences.push(rest.trim().to_string());
            }
        }

        Ok(ExpertRunOutput {
            report: response.content.clone(),
            new_assistant_message: Message::assistant(response.content),
            evidences,
        })
    }
}

/// One LLM call per expert in JSON mode, as called for by §4.4 step 3.
pub struct SimpleVerdictElicitor<'a> {
    pub provider: &'a dyn InferenceProvider,
    pub model: String,
}

#[async_trait]
impl<'a> VerdictElicitor for SimpleVerdictElicitor<'a> {
    async fn elicit(&self, _group_id: &GroupId, messages: &Conversation) -> Result<String, crate::inference::InferenceError> {
        let options = InferenceOptions {
            model: self.model.clone(),
            response_format: ResponseFormat::JsonObject,
            ..Default::default()
        };
        let response = self.provider.complete(messages.messages(), &options).await?;
        Ok(response.content)
    }
}

pub struct SimpleSummarizerLlm<'a> {
    pub provider: &'a dyn InferenceProvider,
    pub model: String,
}

#[async_trait]
impl<'a> SummarizerLlm for SimpleSummarizerLlm<'a> {
    async fn complete(&self, system_prompt: &str, human_prompt: &str) -> Result<String, crate::inference::InferenceError> {
        let options = InferenceOptions {
            model: self.model.clone(),
            ..Default::default()
        };
        let messages = vec![Message::system(system_prompt), Message::user(human_prompt)];
        let response = self.provider.complete(&messages, &options).await?;
        Ok(response.content)
    }
}

pub struct SimpleDialogueSummarizer<'a> {
    pub provider: &'a dyn InferenceProvider,
    pub model: String,
}

#[async_trait]
impl<'a> DialogueSummarizer for SimpleDialogueSummarizer<'a> {
    async fn complete(&self, instruction: &str, dialogue: &Conversation) -> Result<String, crate::inference::InferenceError> {
        let options = InferenceOptions {
            model: self.model.clone(),
            ..Default::default()
        };
        let mut messages = dialogue.messages().to_vec();
        messages.push(Message::user(instruction));
        let response = self.provider.complete(&messages, &options).await?;
        Ok(response.content)
    }
}
