//! Error taxonomy for the deliberation engine.
//!
//! Mirrors the teacher's `types::error` composition style: a top-level enum
//! wraps narrower concern-specific enums via `#[from]`. Only the errors the
//! specification marks as caller-visible (`OrchestratorError`'s variants) are
//! allowed to escape the orchestration core; everything else is absorbed at
//! a slot boundary and folded into `ExpertGroupState::has_error`.

use crate::types::GroupId;
use thiserror::Error;

/// Errors that can reach the caller of [`crate::mdt::graph::Engine::invoke`].
#[derive(Error, Debug, Clone)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no expert reports were published: {0}")]
    NoReports(#[from] NoReportsError),

    #[error("run cancelled")]
    Cancelled,
}

/// Fatal at startup: missing prompt files, unknown providers, malformed
/// config documents.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unknown provider '{0}', expected 'openai' or 'anthropic'")]
    UnknownProvider(String),

    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("prompt file not found: {0}")]
    PromptFileNotFound(String),
}

/// Surfaced by the Summarizer when `blackboard.published_reports` is empty.
#[derive(Error, Debug, Clone)]
#[error("every expert group ended in error or produced no report; nothing to summarize")]
pub struct NoReportsError;

/// Caught at the Expert Runner boundary (§7 `TransientAgentError`). Never
/// retried within a round — the round loop itself is the retry mechanism.
#[derive(Error, Debug, Clone)]
pub enum TransientAgentError {
    #[error("LLM call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// A tool call failed inside an expert's inner loop. The inner loop is
/// expected to catch this, synthesize a notification message for the model,
/// and continue — it is never propagated out of the expert.
#[derive(Error, Debug, Clone)]
#[error("tool '{tool_name}' failed: {message}")]
pub struct ToolError {
    pub tool_name: String,
    pub message: String,
}

/// The reviewer's LLM response could not be parsed as a verdict object, even
/// after lenient extraction. Folds into `has_error=true` for that one slot;
/// never aborts the review pass.
#[derive(Error, Debug, Clone)]
#[error("could not parse verdict JSON for group '{group_id}': {reason}")]
pub struct VerdictParseError {
    pub group_id: GroupId,
    pub reason: String,
}
