//! Provider-agnostic inference boundary (§6 provider dispatch).
//!
//! Generalizes the teacher's `reasoning::inference::InferenceProvider` trait:
//! same shape (options in, response out, provider errors folded to one
//! enum), narrowed to the two wire formats the specification names.

pub mod cloud;

use crate::conversation::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Desired shape of a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

#[derive(Debug, Clone)]
pub struct InferenceOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            temperature: 0.2,
            max_tokens: None,
            response_format: ResponseFormat::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub content: String,
}

#[derive(Error, Debug, Clone)]
pub enum InferenceError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned an error: {0}")]
    Provider(String),

    #[error("missing API key for provider '{0}'")]
    MissingApiKey(String),
}

impl From<InferenceError> for crate::error::TransientAgentError {
    fn from(err: InferenceError) -> Self {
        use crate::error::TransientAgentError as E;
        match err {
            InferenceError::Timeout(d) => E::Timeout(d),
            InferenceError::RateLimited(s) => E::RateLimited(s),
            InferenceError::Transport(s) => E::Network(s),
            InferenceError::Provider(s) => E::Provider(s),
            InferenceError::MissingApiKey(s) => E::Provider(format!("missing API key for {s}")),
        }
    }
}

/// A single provider call: messages in, one response out. Streaming and
/// tool-calling are the expert's inner-loop concern (§1 out-of-scope) and
/// are not modeled here.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        options: &InferenceOptions,
    ) -> Result<InferenceResponse, InferenceError>;
}
