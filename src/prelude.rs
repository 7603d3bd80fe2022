//! Import everything a caller embedding this engine needs with a single line:
//!
//! ```ignore
//! use mdt_deliberation::prelude::*;
//! ```

pub use crate::config::{AgentConfig, Config, ExpertGroupConfig, MdtConfig, Provider};
pub use crate::conversation::{Conversation, Message, MessageRole};
pub use crate::error::{ConfigError, NoReportsError, OrchestratorError, ToolError, TransientAgentError, VerdictParseError};
pub use crate::expert::{ExpertGroupState, ExpertRunOutput, ExpertRunner};
pub use crate::inference::{InferenceOptions, InferenceProvider, InferenceResponse, ResponseFormat};
pub use crate::inference::cloud::{CloudInferenceProvider, CloudVendor};
pub use crate::journal::Journal;
pub use crate::mdt::graph::{DialogueSummarizer, Engine};
pub use crate::mdt::reviewer::VerdictElicitor;
pub use crate::mdt::router::RouteDecision;
pub use crate::mdt::summarizer::SummarizerLlm;
pub use crate::mdt::{MainState, MDTState};
pub use crate::patient::{PatientRecord, Scalar, Section, SequenceEntry};
pub use crate::runners::{SimpleDialogueSummarizer, SimpleExpertRunner, SimpleSummarizerLlm, SimpleVerdictElicitor};
pub use crate::types::{GroupId, RunId};
