//! Wire shapes exchanged through the mailbox files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Command name that triggers batched execution of sub-commands.
pub const MACRO_COMMAND: &str = "execute_macro";

/// Placeholder result for handlers that complete without returning a value.
pub const EMPTY_RESULT: &str = "OK";

/// Top-level payload the external controller writes to the command mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: String,
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
}

/// One step of an `execute_macro` batch, in `parameters.commands`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroStep {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Normalized outcome envelope written to the response mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Full fault trace for offline debugging; only present on errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl Response {
    pub fn success(result: JsonValue) -> Self {
        let result = if result.is_null() {
            JsonValue::from(EMPTY_RESULT)
        } else {
            result
        };
        Self {
            status: Status::Success,
            result: Some(result),
            message: None,
            diagnostic: None,
        }
    }

    pub fn error(message: impl Into<String>, diagnostic: Option<String>) -> Self {
        Self {
            status: Status::Error,
            result: None,
            message: Some(message.into()),
            diagnostic,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
