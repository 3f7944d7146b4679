//! Error taxonomy for tool registration and invocation.
//!
//! The split matters: `SignatureUnavailable` is a registration-time failure
//! (the offending tool is dropped with a warning), while everything hit at
//! invocation time is captured by the executor and fed back to the model as
//! an error payload instead of crashing the loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// The callable's parameter structure could not be determined. A tool
    /// with an unknown signature is unsafe to expose to the model.
    #[error("cannot determine signature for `{name}`: {reason}")]
    SignatureUnavailable { name: String, reason: String },

    /// A synthesized method callable was given a handle that is unknown,
    /// stale, or belongs to a different class.
    #[error("invalid instance handle `{handle}` (expected {expected}): {reason}")]
    InvalidInstanceHandle {
        handle: String,
        expected: String,
        reason: String,
    },

    /// The argument payload for a tool call could not be decoded.
    #[error("failed to decode arguments for `{name}`: {reason}")]
    ArgumentDecode { name: String, reason: String },

    /// A registered tool raised during execution.
    #[error("{message}")]
    Invocation { name: String, message: String },

    /// The model asked for a tool name nothing registered.
    #[error("Function '{0}' is not implemented.")]
    UnknownTool(String),
}

impl ToolError {
    pub fn invocation(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ToolError::Invocation {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub fn missing_argument(tool: &str, param: &str) -> Self {
        ToolError::ArgumentDecode {
            name: tool.to_string(),
            reason: format!("missing required parameter `{}`", param),
        }
    }
}
